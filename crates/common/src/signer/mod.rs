//! The user's signing identity
//!
//! A [`TypedDataSigner`] is usually a wallet: resolving its address may fail
//! when no account is connected, and signing waits on a human who may say no.
//! Neither failure is retried here; both are handed back to the caller.

mod local;

pub use local::LocalSigner;

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;

use crate::authorization::Eip712Payload;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The identity cannot be resolved (no account, locked wallet, ...)
    #[error("signer identity unavailable: {0}")]
    Unavailable(String),
    /// The signing request was declined or failed
    #[error("signature request rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    /// Address of the account this signer acts for
    async fn address(&self) -> Result<Address, SignerError>;

    /// Produce an EIP-712 signature over exactly `payload`
    async fn sign_typed_data(&self, payload: &Eip712Payload) -> Result<Bytes, SignerError>;
}

#[async_trait]
impl<T: TypedDataSigner + ?Sized> TypedDataSigner for std::sync::Arc<T> {
    async fn address(&self) -> Result<Address, SignerError> {
        (**self).address().await
    }

    async fn sign_typed_data(&self, payload: &Eip712Payload) -> Result<Bytes, SignerError> {
        (**self).sign_typed_data(payload).await
    }
}
