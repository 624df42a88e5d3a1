/**
 * Time-boxed decryption grants.
 *  - EIP-712 payload and scope key derivation
 *  - Signing, validity and the load-or-create cache
 */
pub mod authorization;
/**
 * Ephemeral key pairs the relayer
 *  re-encrypts decrypted values under.
 */
pub mod crypto;
/**
 * User-decrypt request assembly on top
 *  of a cached grant.
 */
pub mod decrypt;
/**
 * Relayer network configuration and the
 *  process-wide SDK handle.
 */
pub mod runtime;
/**
 * The user's signing identity.
 */
pub mod signer;
/**
 * String key/value backends the grant
 *  cache persists records in.
 */
pub mod storage;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::authorization::{
        load_or_create, Authorization, AuthorizationCache, AuthorizationError, ContractSet,
        ScopeKey,
    };
    pub use crate::crypto::KeyPair;
    pub use crate::decrypt::{user_decrypt, ClearValue, HandleContractPair, UserDecrypt};
    pub use crate::runtime::{sdk, FheRuntime, RelayerConfig, RelayerInstance};
    pub use crate::signer::{LocalSigner, TypedDataSigner};
    pub use crate::storage::{FsStorage, MemoryStorage, StringStorage};
    pub use crate::version::build_info;
}
