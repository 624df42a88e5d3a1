use std::fmt;

use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

/// Size of a generated X25519 private key in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of a generated X25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("key pair is missing its {0} key")]
    Empty(&'static str),
}

/// Ephemeral key pair handed to the relayer alongside an authorization
///
/// The relayer re-encrypts decrypted values under `public_key`; only the holder
/// of `private_key` can read them back. The pair is opaque to this crate beyond
/// being non-empty: pairs produced by [`KeyPair::generate`] are X25519, but a
/// caller may pin any pair its runtime understands.
///
/// # Examples
///
/// ```ignore
/// let pair = KeyPair::generate()?;
/// assert_eq!(pair.public_key().len(), PUBLIC_KEY_SIZE);
///
/// // A pinned pair, e.g. loaded from disk
/// let pinned = KeyPair::from_hex(&public_hex, &private_hex)?;
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "KeyPairRecord")]
pub struct KeyPair {
    public_key: Bytes,
    private_key: Bytes,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyPairRecord {
    public_key: Bytes,
    private_key: Bytes,
}

impl TryFrom<KeyPairRecord> for KeyPair {
    type Error = KeyError;

    fn try_from(record: KeyPairRecord) -> Result<Self, Self::Error> {
        Self::new(record.public_key, record.private_key)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl KeyPair {
    /// Build a pair from raw bytes, rejecting empty halves
    pub fn new(public_key: Bytes, private_key: Bytes) -> Result<Self, KeyError> {
        if public_key.is_empty() {
            return Err(KeyError::Empty("public"));
        }
        if private_key.is_empty() {
            return Err(KeyError::Empty("private"));
        }
        Ok(Self {
            public_key,
            private_key,
        })
    }

    /// Parse a pair from hexadecimal strings
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(public_key: &str, private_key: &str) -> Result<Self, KeyError> {
        let decode = |hex: &str, which: &str| {
            let hex = hex.strip_prefix("0x").unwrap_or(hex);
            hex::decode(hex).map_err(|_| anyhow::anyhow!("{} key hex decode error", which))
        };
        Self::new(
            decode(public_key, "public")?.into(),
            decode(private_key, "private")?.into(),
        )
    }

    /// Generate a fresh X25519 pair using the OS random source
    pub fn generate() -> Result<Self, KeyError> {
        let mut bytes = [0u8; PRIVATE_KEY_SIZE];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        let secret = StaticSecret::from(bytes);
        let public = X25519PublicKey::from(&secret);

        Ok(Self {
            public_key: Bytes::copy_from_slice(public.as_bytes()),
            private_key: Bytes::copy_from_slice(&secret.to_bytes()),
        })
    }

    pub fn public_key(&self) -> &Bytes {
        &self.public_key
    }

    pub fn private_key(&self) -> &Bytes {
        &self.private_key
    }

    /// Hex encoding of the public key, without prefix
    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_generate_x25519_pair() {
        let pair = KeyPair::generate().unwrap();
        assert_eq!(pair.public_key().len(), PUBLIC_KEY_SIZE);
        assert_eq!(pair.private_key().len(), PRIVATE_KEY_SIZE);

        // public half must be derivable from the private half
        let mut secret = [0u8; PRIVATE_KEY_SIZE];
        secret.copy_from_slice(pair.private_key());
        let derived = X25519PublicKey::from(&StaticSecret::from(secret));
        assert_eq!(&derived.as_bytes()[..], &pair.public_key()[..]);

        let other = KeyPair::generate().unwrap();
        assert_ne!(pair, other);
    }

    #[test]
    fn test_from_hex() {
        let pair = KeyPair::generate().unwrap();
        let public_hex = pair.public_key_hex();
        let private_hex = format!("0x{}", hex::encode(pair.private_key()));

        let recovered = KeyPair::from_hex(&public_hex, &private_hex).unwrap();
        assert_eq!(pair, recovered);

        assert!(KeyPair::from_hex("zz", "00").is_err());
        assert!(matches!(
            KeyPair::from_hex("", "00"),
            Err(KeyError::Empty("public"))
        ));
    }

    #[test]
    fn test_deserialize_rejects_empty_halves() {
        let pair = KeyPair::generate().unwrap();
        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(serde_json::from_str::<KeyPair>(&json).unwrap(), pair);

        let err = serde_json::from_str::<KeyPair>(r#"{"publicKey":"0x","privateKey":"0x01"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("public"));
        assert!(
            serde_json::from_str::<KeyPair>(r#"{"publicKey":"0x01","privateKey":"0x"}"#).is_err()
        );
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let pair = KeyPair::new(vec![1, 2].into(), vec![0xde, 0xad].into()).unwrap();
        let debug = format!("{:?}", pair);
        assert!(debug.contains("redacted"));
        assert!(!debug.contains("dead"));
    }
}
