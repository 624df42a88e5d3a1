use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use url::Url;

/// Ethereum Sepolia, the host chain of the public FHE deployment
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;
/// Local hardhat node running the FHE mock
pub const HARDHAT_CHAIN_ID: u64 = 31337;
/// Gateway chain hosting the decryption and input verifiers
pub const GATEWAY_CHAIN_ID: u64 = 55815;

pub const SEPOLIA_RELAYER_URL: &str = "https://relayer.testnet.zama.cloud";

// Verifier contracts deployed on the gateway chain. The mock node reuses the
// same deterministic deployment addresses.
const GATEWAY_DECRYPTION_VERIFIER: Address = address!("b6e160b1ff80d67bfe90a85ee06ce0a2613607d1");
const GATEWAY_INPUT_VERIFIER: Address = address!("7048c39f048125eda9d678aebadfb22f7900a29f");
const MOCK_DECRYPTION_VERIFIER: Address = address!("5ffdaab0373e62e2ea2944776209aef29e631a64");
const MOCK_INPUT_VERIFIER: Address = address!("812b06e1cdce800494b79ffe4f925a504a9a9810");

/// Addresses and chain ids the relayer runtime binds authorizations to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerConfig {
    /// Host chain the encrypted values live on
    pub chain_id: u64,
    /// Gateway chain; the EIP-712 domain chain id
    pub gateway_chain_id: u64,
    pub acl_contract_address: Address,
    pub kms_contract_address: Address,
    pub input_verifier_contract_address: Address,
    /// EIP-712 verifying contract for user decryption
    pub verifying_contract_address_decryption: Address,
    pub verifying_contract_address_input_verification: Address,
    /// Relayer endpoint; unset for local mock nodes
    #[serde(default)]
    pub relayer_url: Option<Url>,
}

/// FHE contract addresses reported by a local hardhat node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayerMetadata {
    #[serde(rename = "ACLAddress", alias = "acl_address")]
    pub acl_address: Address,
    #[serde(rename = "InputVerifierAddress", alias = "input_verifier_address")]
    pub input_verifier_address: Address,
    #[serde(rename = "KMSVerifierAddress", alias = "kms_verifier_address")]
    pub kms_verifier_address: Address,
}

impl RelayerConfig {
    pub fn sepolia() -> Self {
        Self {
            chain_id: SEPOLIA_CHAIN_ID,
            gateway_chain_id: GATEWAY_CHAIN_ID,
            acl_contract_address: address!("687820221192c5b662b25367f70076a37bc79b6c"),
            kms_contract_address: address!("1364cbbf2cdf5032c47d8226a6f6fbd2afcdacac"),
            input_verifier_contract_address: address!("bc91f3dad1a5f19f8390c400196e58073b6a0bc4"),
            verifying_contract_address_decryption: GATEWAY_DECRYPTION_VERIFIER,
            verifying_contract_address_input_verification: GATEWAY_INPUT_VERIFIER,
            relayer_url: Url::parse(SEPOLIA_RELAYER_URL).ok(),
        }
    }

    /// Mock runtime backed by a local node's reported contracts
    pub fn mock(chain_id: u64, metadata: &RelayerMetadata) -> Self {
        Self {
            chain_id,
            gateway_chain_id: GATEWAY_CHAIN_ID,
            acl_contract_address: metadata.acl_address,
            kms_contract_address: metadata.kms_verifier_address,
            input_verifier_contract_address: metadata.input_verifier_address,
            verifying_contract_address_decryption: MOCK_DECRYPTION_VERIFIER,
            verifying_contract_address_input_verification: MOCK_INPUT_VERIFIER,
            relayer_url: None,
        }
    }

    /// Pick the runtime configuration for a connected chain
    ///
    /// Chains listed as mock chains (hardhat is always one) use the mock
    /// runtime, but only when the node actually reported its FHE metadata.
    /// Everything else falls back to the public Sepolia deployment.
    pub fn for_chain(
        chain_id: u64,
        mock_chains: &[u64],
        metadata: Option<&RelayerMetadata>,
    ) -> Self {
        let is_mock_chain = chain_id == HARDHAT_CHAIN_ID || mock_chains.contains(&chain_id);
        match metadata {
            Some(metadata) if is_mock_chain => Self::mock(chain_id, metadata),
            _ => Self::sepolia(),
        }
    }
}
