use std::fmt;

use alloy_primitives::Address;

use super::{parse_address, AuthorizationError, ContractSet};
use crate::runtime::FheRuntime;

// Stand-in public key for unpinned scopes: the 20-byte zero address.
const PLACEHOLDER_PUBLIC_KEY: [u8; 20] = [0u8; 20];

/// Storage key identifying one (user, contract set, optional public key) scope
///
/// Rendered as `"{checksummed user}:{typed data hash}"`. The hash is taken
/// over a canonical empty payload (zero validity window, zero-address
/// placeholder when no public key is pinned), so it only varies with the
/// scope and never with time. Recomputed on every lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey(String);

impl ScopeKey {
    pub fn derive<R: FheRuntime + ?Sized>(
        runtime: &R,
        user_address: Address,
        contracts: &ContractSet,
        public_key: Option<&[u8]>,
    ) -> Result<Self, AuthorizationError> {
        if user_address == Address::ZERO {
            return Err(AuthorizationError::InvalidAddress(user_address.to_string()));
        }

        let public_key = public_key.unwrap_or(&PLACEHOLDER_PUBLIC_KEY);
        let empty = runtime.create_eip712(public_key, contracts, 0, 0);
        let hash = empty.signing_hash();

        Ok(Self(format!("{}:{}", user_address, hash)))
    }

    /// Like [`ScopeKey::derive`], for a user address given as text
    pub fn derive_str<R: FheRuntime + ?Sized>(
        runtime: &R,
        user_address: &str,
        contracts: &ContractSet,
        public_key: Option<&[u8]>,
    ) -> Result<Self, AuthorizationError> {
        Self::derive(runtime, parse_address(user_address)?, contracts, public_key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ScopeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::runtime::{RelayerConfig, RelayerInstance};

    #[test]
    fn test_key_format() {
        let runtime = RelayerInstance::new(RelayerConfig::sepolia());
        let user = Address::repeat_byte(0xaa);
        let contracts = ContractSet::new([Address::repeat_byte(0xbb)]).unwrap();

        let key = ScopeKey::derive(&runtime, user, &contracts, None).unwrap();
        let (prefix, hash) = key.as_str().split_once(':').unwrap();
        assert_eq!(prefix, user.to_checksum(None));
        assert!(hash.starts_with("0x"));
        assert_eq!(hash.len(), 66);
    }

    #[test]
    fn test_zero_placeholder_differs_from_pinned_key() {
        let runtime = RelayerInstance::new(RelayerConfig::sepolia());
        let user = Address::repeat_byte(0xaa);
        let contracts = ContractSet::new([Address::repeat_byte(0xbb)]).unwrap();

        let unpinned = ScopeKey::derive(&runtime, user, &contracts, None).unwrap();
        let pinned = ScopeKey::derive(&runtime, user, &contracts, Some(&[1u8; 32][..])).unwrap();
        assert_ne!(unpinned, pinned);
    }

    #[test]
    fn test_network_is_part_of_scope() {
        let user = Address::repeat_byte(0xaa);
        let contracts = ContractSet::new([Address::repeat_byte(0xbb)]).unwrap();
        let sepolia = RelayerInstance::new(RelayerConfig::sepolia());
        let mut other_config = RelayerConfig::sepolia();
        other_config.chain_id = 1;
        let other = RelayerInstance::new(other_config);

        assert_ne!(
            ScopeKey::derive(&sepolia, user, &contracts, None).unwrap(),
            ScopeKey::derive(&other, user, &contracts, None).unwrap()
        );
    }
}
