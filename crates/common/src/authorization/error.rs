use alloy_primitives::Address;

use crate::crypto::KeyError;
use crate::signer::SignerError;

/// Errors surfaced by scope derivation, signing and the grant cache
///
/// Identity and signing faults require user action and are always returned
/// to the caller. `MalformedRecord` is absorbed by the cache manager, which
/// renews the grant instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("an authorization must cover at least one contract")]
    NoContracts,
    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),
    #[error("signing rejected: {0}")]
    SigningRejected(String),
    #[error("malformed authorization record: {0}")]
    MalformedRecord(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("signature does not belong to {expected}: {reason}")]
    SignatureMismatch { expected: Address, reason: String },
    #[error("failed to encode authorization: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl AuthorizationError {
    pub(crate) fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AuthorizationError::StorageUnavailable(Box::new(err))
    }
}

impl From<SignerError> for AuthorizationError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Unavailable(reason) => AuthorizationError::SignerUnavailable(reason),
            SignerError::Rejected(reason) => AuthorizationError::SigningRejected(reason),
        }
    }
}
