use super::grant::{timestamp_now, DURATION_DAYS};
use super::{Authorization, AuthorizationError, ContractSet};
use crate::crypto::KeyPair;
use crate::runtime::FheRuntime;
use crate::signer::TypedDataSigner;

impl Authorization {
    /// Ask `signer` to authorize decryption of `contracts` for `key_pair`
    ///
    /// The grant starts now and lasts [`DURATION_DAYS`]. Nothing is persisted;
    /// a rejected prompt is returned as `SigningRejected` and not retried.
    pub async fn create<R, S>(
        runtime: &R,
        contracts: &ContractSet,
        key_pair: &KeyPair,
        signer: &S,
    ) -> Result<Self, AuthorizationError>
    where
        R: FheRuntime + ?Sized,
        S: TypedDataSigner + ?Sized,
    {
        Self::create_at(runtime, contracts, key_pair, signer, timestamp_now()).await
    }

    pub(crate) async fn create_at<R, S>(
        runtime: &R,
        contracts: &ContractSet,
        key_pair: &KeyPair,
        signer: &S,
        start_timestamp: u64,
    ) -> Result<Self, AuthorizationError>
    where
        R: FheRuntime + ?Sized,
        S: TypedDataSigner + ?Sized,
    {
        let user_address = signer.address().await?;
        if user_address == alloy_primitives::Address::ZERO {
            return Err(AuthorizationError::SignerUnavailable(
                "signer resolved to the zero address".to_string(),
            ));
        }

        let eip712 = runtime.create_eip712(
            key_pair.public_key(),
            contracts,
            start_timestamp,
            DURATION_DAYS,
        );

        tracing::debug!(
            user = %user_address,
            contracts = contracts.len(),
            start_timestamp,
            "requesting decryption authorization signature"
        );
        let signature = signer
            .sign_typed_data(&eip712)
            .await
            .map_err(|e| match AuthorizationError::from(e) {
                // the identity resolved a moment ago; any failure now is a refusal
                AuthorizationError::SignerUnavailable(reason) => {
                    AuthorizationError::SigningRejected(reason)
                }
                other => other,
            })?;
        if signature.is_empty() {
            return Err(AuthorizationError::SigningRejected(
                "signer returned an empty signature".to_string(),
            ));
        }

        Ok(Self {
            public_key: key_pair.public_key().clone(),
            private_key: key_pair.private_key().clone(),
            signature,
            start_timestamp,
            duration_days: DURATION_DAYS,
            user_address,
            contract_addresses: contracts.clone(),
            eip712,
        })
    }
}
