use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use super::AuthorizationError;

/// Parse a 20-byte hex account address
///
/// Checksums are not enforced; the zero address is not an account and is
/// rejected.
pub fn parse_address(address: &str) -> Result<Address, AuthorizationError> {
    let parsed = Address::from_str(address.trim())
        .map_err(|_| AuthorizationError::InvalidAddress(address.to_string()))?;
    if parsed == Address::ZERO {
        return Err(AuthorizationError::InvalidAddress(address.to_string()));
    }
    Ok(parsed)
}

/// The contracts an authorization covers
///
/// Always non-empty, sorted ascending by address bytes and free of
/// duplicates. The ordering is what makes two requests that only differ in
/// input order resolve to the same scope key and the same signed payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Address>", into = "Vec<Address>")]
pub struct ContractSet(Vec<Address>);

impl ContractSet {
    /// Canonicalize a list of contracts
    pub fn new(addresses: impl IntoIterator<Item = Address>) -> Result<Self, AuthorizationError> {
        let mut addresses: Vec<Address> = addresses.into_iter().collect();
        addresses.sort();
        addresses.dedup();
        if addresses.is_empty() {
            return Err(AuthorizationError::NoContracts);
        }
        Ok(Self(addresses))
    }

    /// Parse and canonicalize a list of hex addresses
    pub fn parse<S: AsRef<str>>(addresses: &[S]) -> Result<Self, AuthorizationError> {
        let parsed = addresses
            .iter()
            .map(|a| {
                Address::from_str(a.as_ref().trim())
                    .map_err(|_| AuthorizationError::InvalidAddress(a.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsed)
    }

    pub fn as_slice(&self) -> &[Address] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.0.binary_search(address).is_ok()
    }
}

// Decoding is strict: a stored set must already be canonical.
impl TryFrom<Vec<Address>> for ContractSet {
    type Error = AuthorizationError;

    fn try_from(addresses: Vec<Address>) -> Result<Self, Self::Error> {
        if addresses.is_empty() {
            return Err(AuthorizationError::NoContracts);
        }
        if addresses.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(AuthorizationError::MalformedRecord(
                "contract addresses are not sorted and unique".to_string(),
            ));
        }
        Ok(Self(addresses))
    }
}

impl From<ContractSet> for Vec<Address> {
    fn from(set: ContractSet) -> Self {
        set.0
    }
}
