//! Assembly of user-decrypt requests from a cached grant
//!
//! The relayer transport itself sits behind [`UserDecrypt`]; this module only
//! checks that a grant actually covers the requested handles and shapes the
//! request the relayer expects.

use std::collections::HashMap;
use std::fmt;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::authorization::{timestamp_now, Authorization};

/// An encrypted value handle and the contract that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleContractPair {
    pub handle: B256,
    pub contract_address: Address,
}

impl HandleContractPair {
    pub fn new(handle: B256, contract_address: Address) -> Self {
        Self {
            handle,
            contract_address,
        }
    }
}

/// A decrypted value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum ClearValue {
    Bool(bool),
    Uint(U256),
    Bytes(Bytes),
}

#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    #[error("no handles to decrypt")]
    NoHandles,
    #[error("contract {0} is not covered by the authorization")]
    ContractNotAuthorized(Address),
    #[error("authorization is not valid at {now} (window ends at {expires_at})")]
    Expired { expires_at: u64, now: u64 },
    #[error("relayer returned no value for handle {0}")]
    MissingResult(B256),
    #[error("relayer error: {0}")]
    Relayer(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Everything the relayer needs to decrypt and re-encrypt for the user
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDecryptRequest {
    handle_contract_pairs: Vec<HandleContractPair>,
    private_key: Bytes,
    public_key: Bytes,
    signature: Bytes,
    contract_addresses: Vec<Address>,
    user_address: Address,
    start_timestamp: u64,
    duration_days: u64,
}

impl fmt::Debug for UserDecryptRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDecryptRequest")
            .field("handle_contract_pairs", &self.handle_contract_pairs)
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("user_address", &self.user_address)
            .field("start_timestamp", &self.start_timestamp)
            .field("duration_days", &self.duration_days)
            .finish_non_exhaustive()
    }
}

impl UserDecryptRequest {
    /// Build a request for `pairs` under `auth`, checked against `now`
    ///
    /// # Errors
    ///
    /// * `NoHandles` - `pairs` is empty
    /// * `Expired` - `auth` is not valid at `now`
    /// * `ContractNotAuthorized` - a handle belongs to a contract outside the grant
    pub fn new(
        pairs: Vec<HandleContractPair>,
        auth: &Authorization,
        now: u64,
    ) -> Result<Self, DecryptError> {
        if pairs.is_empty() {
            return Err(DecryptError::NoHandles);
        }
        if !auth.is_valid(now) {
            return Err(DecryptError::Expired {
                expires_at: auth.expires_at(),
                now,
            });
        }
        if let Some(pair) = pairs
            .iter()
            .find(|pair| !auth.contract_addresses().contains(&pair.contract_address))
        {
            return Err(DecryptError::ContractNotAuthorized(pair.contract_address));
        }

        Ok(Self {
            handle_contract_pairs: pairs,
            private_key: auth.private_key().clone(),
            public_key: auth.public_key().clone(),
            signature: auth.signature().clone(),
            contract_addresses: auth.contract_addresses().as_slice().to_vec(),
            user_address: auth.user_address(),
            start_timestamp: auth.start_timestamp(),
            duration_days: auth.duration_days(),
        })
    }

    pub fn handle_contract_pairs(&self) -> &[HandleContractPair] {
        &self.handle_contract_pairs
    }

    pub fn private_key(&self) -> &Bytes {
        &self.private_key
    }

    pub fn public_key(&self) -> &Bytes {
        &self.public_key
    }

    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    pub fn contract_addresses(&self) -> &[Address] {
        &self.contract_addresses
    }

    pub fn user_address(&self) -> Address {
        self.user_address
    }

    pub fn start_timestamp(&self) -> u64 {
        self.start_timestamp
    }

    pub fn duration_days(&self) -> u64 {
        self.duration_days
    }
}

/// A relayer able to serve user-decrypt requests
#[async_trait]
pub trait UserDecrypt: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn user_decrypt(
        &self,
        request: &UserDecryptRequest,
    ) -> Result<HashMap<B256, ClearValue>, Self::Error>;
}

/// Decrypt `pairs` through `relayer` using a grant that is valid right now
///
/// Every requested handle must come back; anything missing is an error
/// rather than a silently shorter map.
pub async fn user_decrypt<D: UserDecrypt + ?Sized>(
    relayer: &D,
    pairs: Vec<HandleContractPair>,
    auth: &Authorization,
) -> Result<HashMap<B256, ClearValue>, DecryptError> {
    let request = UserDecryptRequest::new(pairs, auth, timestamp_now())?;
    tracing::debug!(
        handles = request.handle_contract_pairs().len(),
        user = %request.user_address(),
        "submitting user decrypt request"
    );

    let results = relayer
        .user_decrypt(&request)
        .await
        .map_err(|e| DecryptError::Relayer(Box::new(e)))?;

    if let Some(pair) = request
        .handle_contract_pairs()
        .iter()
        .find(|pair| !results.contains_key(&pair.handle))
    {
        return Err(DecryptError::MissingResult(pair.handle));
    }
    Ok(results)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::authorization::{load_or_create, ContractSet};
    use crate::runtime::{RelayerConfig, RelayerInstance};
    use crate::signer::LocalSigner;
    use crate::storage::MemoryStorage;

    #[derive(Debug, thiserror::Error)]
    #[error("relayer offline")]
    struct Offline;

    /// Answers every handle with its first byte as a uint
    struct EchoRelayer {
        skip_last: bool,
    }

    #[async_trait]
    impl UserDecrypt for EchoRelayer {
        type Error = Offline;

        async fn user_decrypt(
            &self,
            request: &UserDecryptRequest,
        ) -> Result<HashMap<B256, ClearValue>, Offline> {
            let mut pairs = request.handle_contract_pairs().to_vec();
            if self.skip_last {
                pairs.pop();
            }
            Ok(pairs
                .into_iter()
                .map(|pair| (pair.handle, ClearValue::Uint(U256::from(pair.handle[0]))))
                .collect())
        }
    }

    struct DownRelayer;

    #[async_trait]
    impl UserDecrypt for DownRelayer {
        type Error = Offline;

        async fn user_decrypt(
            &self,
            _request: &UserDecryptRequest,
        ) -> Result<HashMap<B256, ClearValue>, Offline> {
            Err(Offline)
        }
    }

    async fn grant() -> Authorization {
        let runtime = RelayerInstance::new(RelayerConfig::sepolia());
        let contracts =
            ContractSet::new([Address::repeat_byte(0xbb), Address::repeat_byte(0xcc)]).unwrap();
        load_or_create(
            &runtime,
            &contracts,
            &LocalSigner::generate(),
            &MemoryStorage::new(),
            None,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_request_carries_grant() {
        let auth = grant().await;
        let pairs = vec![HandleContractPair::new(
            B256::repeat_byte(1),
            Address::repeat_byte(0xbb),
        )];
        let request = UserDecryptRequest::new(pairs.clone(), &auth, auth.start_timestamp()).unwrap();

        assert_eq!(request.handle_contract_pairs(), pairs.as_slice());
        assert_eq!(request.signature(), auth.signature());
        assert_eq!(request.private_key(), auth.private_key());
        assert_eq!(request.contract_addresses(), auth.contract_addresses().as_slice());
        assert_eq!(request.duration_days(), auth.duration_days());

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("handleContractPairs").is_some());
        assert!(json.get("userAddress").is_some());
        assert!(!format!("{:?}", request).contains(&hex::encode(auth.private_key())));
    }

    #[tokio::test]
    async fn test_request_rejections() {
        let auth = grant().await;
        let now = auth.start_timestamp();
        let pair = HandleContractPair::new(B256::repeat_byte(1), Address::repeat_byte(0xbb));

        assert!(matches!(
            UserDecryptRequest::new(vec![], &auth, now),
            Err(DecryptError::NoHandles)
        ));
        assert!(matches!(
            UserDecryptRequest::new(vec![pair], &auth, auth.expires_at()),
            Err(DecryptError::Expired { .. })
        ));

        let foreign = Address::repeat_byte(0xdd);
        let err = UserDecryptRequest::new(
            vec![pair, HandleContractPair::new(B256::repeat_byte(2), foreign)],
            &auth,
            now,
        )
        .unwrap_err();
        assert!(matches!(err, DecryptError::ContractNotAuthorized(a) if a == foreign));
    }

    #[tokio::test]
    async fn test_user_decrypt() {
        let auth = grant().await;
        let pairs = vec![
            HandleContractPair::new(B256::repeat_byte(1), Address::repeat_byte(0xbb)),
            HandleContractPair::new(B256::repeat_byte(2), Address::repeat_byte(0xcc)),
        ];

        let results = user_decrypt(&EchoRelayer { skip_last: false }, pairs.clone(), &auth)
            .await
            .unwrap();
        assert_eq!(
            results.get(&B256::repeat_byte(2)),
            Some(&ClearValue::Uint(U256::from(2u8)))
        );

        let err = user_decrypt(&EchoRelayer { skip_last: true }, pairs.clone(), &auth)
            .await
            .unwrap_err();
        assert!(matches!(err, DecryptError::MissingResult(h) if h == B256::repeat_byte(2)));

        let err = user_decrypt(&DownRelayer, pairs, &auth).await.unwrap_err();
        assert!(matches!(err, DecryptError::Relayer(_)));
    }
}
