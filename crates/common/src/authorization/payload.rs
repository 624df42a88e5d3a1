//! EIP-712 payload the user signs to authorize relayer decryption
//!
//! The relayer re-derives the signing hash from the exact schema below, so the
//! primary type carries precisely these fields in this order and nothing else:
//!
//! ```text
//! UserDecryptRequestVerification(
//!     bytes publicKey,
//!     address[] contractAddresses,
//!     uint256 contractsChainId,
//!     uint256 startTimestamp,
//!     uint256 durationDays
//! )
//! ```
//!
//! [`Eip712Payload`] is the JSON-shaped record kept next to the signature so a
//! grant can be re-verified later. Hashing goes through the `sol!` struct.

use std::borrow::Cow;
use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, Signature, B256, U256};
use alloy_sol_types::{sol, Eip712Domain, SolStruct};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

pub const DOMAIN_NAME: &str = "Decryption";
pub const DOMAIN_VERSION: &str = "1";
pub const DOMAIN_TYPE: &str = "EIP712Domain";
pub const PRIMARY_TYPE: &str = "UserDecryptRequestVerification";

const DOMAIN_FIELDS: [(&str, &str); 4] = [
    ("name", "string"),
    ("version", "string"),
    ("chainId", "uint256"),
    ("verifyingContract", "address"),
];

const PRIMARY_FIELDS: [(&str, &str); 5] = [
    ("publicKey", "bytes"),
    ("contractAddresses", "address[]"),
    ("contractsChainId", "uint256"),
    ("startTimestamp", "uint256"),
    ("durationDays", "uint256"),
];

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct UserDecryptRequestVerification {
        bytes publicKey;
        address[] contractAddresses;
        uint256 contractsChainId;
        uint256 startTimestamp;
        uint256 durationDays;
    }
}

/// Signing domain of the decryption verifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712DomainRecord {
    pub name: String,
    pub version: String,
    /// Chain id of the gateway chain hosting the verifier, not the host chain
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712DomainRecord {
    pub fn decryption(gateway_chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            name: DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            chain_id: gateway_chain_id,
            verifying_contract,
        }
    }

    fn to_sol(&self) -> Eip712Domain {
        Eip712Domain::new(
            Some(Cow::Owned(self.name.clone())),
            Some(Cow::Owned(self.version.clone())),
            Some(U256::from(self.chain_id)),
            Some(self.verifying_contract),
            None,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Message body; integers travel as decimal strings like any EIP-712 JSON
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDecryptMessage {
    pub public_key: Bytes,
    pub contract_addresses: Vec<Address>,
    #[serde_as(as = "DisplayFromStr")]
    pub contracts_chain_id: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub start_timestamp: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub duration_days: u64,
}

/// Full typed-data object as handed to the signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Payload {
    domain: Eip712DomainRecord,
    types: BTreeMap<String, Vec<TypedField>>,
    primary_type: String,
    message: UserDecryptMessage,
}

fn fields(table: &[(&str, &str)]) -> Vec<TypedField> {
    table
        .iter()
        .map(|(name, ty)| TypedField {
            name: name.to_string(),
            ty: ty.to_string(),
        })
        .collect()
}

fn standard_types() -> BTreeMap<String, Vec<TypedField>> {
    BTreeMap::from([
        (DOMAIN_TYPE.to_string(), fields(&DOMAIN_FIELDS)),
        (PRIMARY_TYPE.to_string(), fields(&PRIMARY_FIELDS)),
    ])
}

impl Eip712Payload {
    pub fn new(domain: Eip712DomainRecord, message: UserDecryptMessage) -> Self {
        Self {
            domain,
            types: standard_types(),
            primary_type: PRIMARY_TYPE.to_string(),
            message,
        }
    }

    pub fn domain(&self) -> &Eip712DomainRecord {
        &self.domain
    }

    pub fn types(&self) -> &BTreeMap<String, Vec<TypedField>> {
        &self.types
    }

    pub fn primary_type(&self) -> &str {
        &self.primary_type
    }

    pub fn message(&self) -> &UserDecryptMessage {
        &self.message
    }

    /// Whether the declared schema is exactly the one the relayer verifies
    pub fn has_standard_schema(&self) -> bool {
        self.primary_type == PRIMARY_TYPE && self.types == standard_types()
    }

    fn to_sol(&self) -> UserDecryptRequestVerification {
        UserDecryptRequestVerification {
            publicKey: self.message.public_key.clone(),
            contractAddresses: self.message.contract_addresses.clone(),
            contractsChainId: U256::from(self.message.contracts_chain_id),
            startTimestamp: U256::from(self.message.start_timestamp),
            durationDays: U256::from(self.message.duration_days),
        }
    }

    /// `keccak256("\x19\x01" || domainSeparator || hashStruct(message))`
    pub fn signing_hash(&self) -> B256 {
        self.to_sol().eip712_signing_hash(&self.domain.to_sol())
    }

    /// Recover the address that produced a 65-byte signature over this payload
    pub fn recover_address(&self, signature: &[u8]) -> Result<Address, alloy_primitives::SignatureError> {
        let signature = Signature::try_from(signature)?;
        signature.recover_address_from_prehash(&self.signing_hash())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy_primitives::address;

    fn payload(start_timestamp: u64) -> Eip712Payload {
        Eip712Payload::new(
            Eip712DomainRecord::decryption(
                55815,
                address!("b6e160b1ff80d67bfe90a85ee06ce0a2613607d1"),
            ),
            UserDecryptMessage {
                public_key: Bytes::from(vec![7u8; 32]),
                contract_addresses: vec![address!("00000000000000000000000000000000000000aa")],
                contracts_chain_id: 11155111,
                start_timestamp,
                duration_days: 365,
            },
        )
    }

    #[test]
    fn test_signing_hash_is_deterministic() {
        assert_eq!(payload(1).signing_hash(), payload(1).signing_hash());
        assert_ne!(payload(1).signing_hash(), payload(2).signing_hash());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(payload(1_700_000_000)).unwrap();
        assert_eq!(json["primaryType"], PRIMARY_TYPE);
        assert_eq!(json["domain"]["name"], DOMAIN_NAME);
        assert_eq!(json["domain"]["chainId"], 55815);
        assert_eq!(json["message"]["startTimestamp"], "1700000000");
        assert_eq!(json["message"]["durationDays"], "365");

        let fields: Vec<&str> = json["types"][PRIMARY_TYPE]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            fields,
            vec![
                "publicKey",
                "contractAddresses",
                "contractsChainId",
                "startTimestamp",
                "durationDays"
            ]
        );
    }

    #[test]
    fn test_schema_tampering_detected() {
        let mut json = serde_json::to_value(payload(1)).unwrap();
        json["types"][PRIMARY_TYPE]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({"name": "extraData", "type": "bytes"}));
        let tampered: Eip712Payload = serde_json::from_value(json).unwrap();
        assert!(!tampered.has_standard_schema());
        assert!(payload(1).has_standard_schema());
    }

    #[test]
    fn test_recover_rejects_short_signature() {
        assert!(payload(1).recover_address(&[0u8; 12]).is_err());
    }
}
