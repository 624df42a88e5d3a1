//! Time-boxed decryption grants
//!
//! An [`Authorization`] is the user's EIP-712 signature over an ephemeral
//! public key, a set of contracts and a validity window. Signing needs a
//! human in the loop, so grants are cached under a [`ScopeKey`] and only
//! renewed when missing, unreadable or expired.
//!
//! ```ignore
//! let runtime = sdk::init(RelayerConfig::sepolia())?;
//! let contracts = ContractSet::parse(&["0xCCC...", "0xBBB..."])?;
//! let auth = load_or_create(runtime, &contracts, &signer, &storage, None).await?;
//! assert!(auth.is_valid_now());
//! ```

mod builder;
mod cache;
mod contracts;
mod error;
mod grant;
mod payload;
mod scope_key;

pub use cache::{load_or_create, AuthorizationCache};
pub use contracts::{parse_address, ContractSet};
pub use error::AuthorizationError;
pub use grant::{timestamp_now, Authorization, DURATION_DAYS, SECONDS_PER_DAY};
pub use payload::{
    Eip712DomainRecord, Eip712Payload, TypedField, UserDecryptMessage, DOMAIN_NAME, DOMAIN_TYPE,
    DOMAIN_VERSION, PRIMARY_TYPE,
};
pub use scope_key::ScopeKey;
