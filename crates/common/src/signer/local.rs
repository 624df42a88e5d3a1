use std::str::FromStr;

use alloy_primitives::{Address, Bytes, B256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;

use super::{SignerError, TypedDataSigner};
use crate::authorization::Eip712Payload;
use crate::crypto::KeyError;

/// Size of a secp256k1 private key in bytes
pub const SIGNING_KEY_SIZE: usize = 32;

const PEM_TAG: &str = "PRIVATE KEY";

/// Signer holding a secp256k1 key in process memory
///
/// Used by the CLI, where the key lives in the state directory, and by tests.
/// A local signer never rejects; the only failure is a broken key.
///
/// # Examples
///
/// ```ignore
/// let signer = LocalSigner::generate();
/// std::fs::write("key.pem", signer.to_pem())?;
///
/// let pem = std::fs::read_to_string("key.pem")?;
/// let recovered = LocalSigner::from_pem(&pem)?;
/// assert_eq!(signer.address(), recovered.address());
/// ```
#[derive(Debug, Clone)]
pub struct LocalSigner(PrivateKeySigner);

impl From<PrivateKeySigner> for LocalSigner {
    fn from(signer: PrivateKeySigner) -> Self {
        Self(signer)
    }
}

impl LocalSigner {
    /// Generate a new random signing key
    pub fn generate() -> Self {
        Self(PrivateKeySigner::random())
    }

    pub fn from_bytes(bytes: &[u8; SIGNING_KEY_SIZE]) -> Result<Self, KeyError> {
        PrivateKeySigner::from_bytes(&B256::from(*bytes))
            .map(Self)
            .map_err(|e| anyhow::anyhow!("invalid signing key: {}", e).into())
    }

    /// Parse a signing key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        PrivateKeySigner::from_str(hex.trim())
            .map(Self)
            .map_err(|e| anyhow::anyhow!("invalid signing key hex: {}", e).into())
    }

    pub fn to_bytes(&self) -> [u8; SIGNING_KEY_SIZE] {
        self.0.to_bytes().0
    }

    /// Address derived from the signing key
    pub fn address(&self) -> Address {
        self.0.address()
    }

    /// Encode the signing key in PEM format with tag "PRIVATE KEY"
    pub fn to_pem(&self) -> String {
        let pem = pem::Pem::new(PEM_TAG, self.to_bytes());
        pem::encode(&pem)
    }

    /// Parse a signing key from PEM format
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM is malformed, carries a different tag or
    /// does not hold exactly [`SIGNING_KEY_SIZE`] bytes.
    pub fn from_pem(pem_str: &str) -> Result<Self, KeyError> {
        let pem = pem::parse(pem_str).map_err(|e| anyhow::anyhow!("failed to parse PEM: {}", e))?;

        if pem.tag() != PEM_TAG {
            return Err(anyhow::anyhow!("invalid PEM tag, expected {}", PEM_TAG).into());
        }

        let contents = pem.contents();
        if contents.len() != SIGNING_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid signing key size in PEM, expected {}, got {}",
                SIGNING_KEY_SIZE,
                contents.len()
            )
            .into());
        }

        let mut bytes = [0u8; SIGNING_KEY_SIZE];
        bytes.copy_from_slice(contents);
        Self::from_bytes(&bytes)
    }
}

#[async_trait]
impl TypedDataSigner for LocalSigner {
    async fn address(&self) -> Result<Address, SignerError> {
        Ok(self.0.address())
    }

    async fn sign_typed_data(&self, payload: &Eip712Payload) -> Result<Bytes, SignerError> {
        let hash = payload.signing_hash();
        let signature = self
            .0
            .sign_hash(&hash)
            .await
            .map_err(|e| SignerError::Rejected(e.to_string()))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::authorization::{Eip712DomainRecord, UserDecryptMessage};

    #[test]
    fn test_pem_roundtrip() {
        let signer = LocalSigner::generate();
        let recovered = LocalSigner::from_pem(&signer.to_pem()).unwrap();
        assert_eq!(signer.address(), recovered.address());
        assert_eq!(signer.to_bytes(), recovered.to_bytes());

        let wrong_tag = pem::encode(&pem::Pem::new("PUBLIC KEY", signer.to_bytes()));
        assert!(LocalSigner::from_pem(&wrong_tag).is_err());

        let short = pem::encode(&pem::Pem::new(PEM_TAG, vec![1u8; 16]));
        assert!(LocalSigner::from_pem(&short).is_err());
    }

    #[test]
    fn test_hex_roundtrip() {
        let signer = LocalSigner::generate();
        let hex = format!("0x{}", hex::encode(signer.to_bytes()));
        assert_eq!(LocalSigner::from_hex(&hex).unwrap().address(), signer.address());
        assert!(LocalSigner::from_hex("0xnope").is_err());
    }

    #[tokio::test]
    async fn test_signature_recovers_to_address() {
        let signer = LocalSigner::generate();
        let payload = Eip712Payload::new(
            Eip712DomainRecord::decryption(55815, Address::repeat_byte(9)),
            UserDecryptMessage {
                public_key: Bytes::from(vec![1u8; 32]),
                contract_addresses: vec![Address::repeat_byte(1)],
                contracts_chain_id: 11155111,
                start_timestamp: 1_700_000_000,
                duration_days: 365,
            },
        );

        let signature = signer.sign_typed_data(&payload).await.unwrap();
        assert_eq!(signature.len(), 65);
        assert_eq!(payload.recover_address(&signature).unwrap(), signer.address());
    }
}
