//! The FHE relayer runtime as seen by the authorization core
//!
//! Only two runtime capabilities are needed to manage grants: building the
//! typed payload a user signs and producing ephemeral key pairs. Both sit
//! behind [`FheRuntime`] so the cache and builder can be driven by the real
//! relayer configuration or by anything a test supplies.

mod config;
pub mod sdk;

pub use config::{
    RelayerConfig, RelayerMetadata, GATEWAY_CHAIN_ID, HARDHAT_CHAIN_ID, SEPOLIA_CHAIN_ID,
    SEPOLIA_RELAYER_URL,
};

use crate::authorization::{ContractSet, Eip712DomainRecord, Eip712Payload, UserDecryptMessage};
use crate::crypto::{KeyError, KeyPair};

pub trait FheRuntime: Send + Sync {
    /// Build the typed payload binding a public key to a contract scope and
    /// validity window
    fn create_eip712(
        &self,
        public_key: &[u8],
        contracts: &ContractSet,
        start_timestamp: u64,
        duration_days: u64,
    ) -> Eip712Payload;

    /// Produce a fresh ephemeral key pair
    fn generate_keypair(&self) -> Result<KeyPair, KeyError>;
}

/// Runtime bound to one relayer network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayerInstance {
    config: RelayerConfig,
}

impl RelayerInstance {
    pub fn new(config: RelayerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RelayerConfig {
        &self.config
    }
}

impl FheRuntime for RelayerInstance {
    fn create_eip712(
        &self,
        public_key: &[u8],
        contracts: &ContractSet,
        start_timestamp: u64,
        duration_days: u64,
    ) -> Eip712Payload {
        let domain = Eip712DomainRecord::decryption(
            self.config.gateway_chain_id,
            self.config.verifying_contract_address_decryption,
        );
        Eip712Payload::new(
            domain,
            UserDecryptMessage {
                public_key: public_key.to_vec().into(),
                contract_addresses: contracts.as_slice().to_vec(),
                contracts_chain_id: self.config.chain_id,
                start_timestamp,
                duration_days,
            },
        )
    }

    fn generate_keypair(&self) -> Result<KeyPair, KeyError> {
        KeyPair::generate()
    }
}

impl<T: FheRuntime + ?Sized> FheRuntime for std::sync::Arc<T> {
    fn create_eip712(
        &self,
        public_key: &[u8],
        contracts: &ContractSet,
        start_timestamp: u64,
        duration_days: u64,
    ) -> Eip712Payload {
        (**self).create_eip712(public_key, contracts, start_timestamp, duration_days)
    }

    fn generate_keypair(&self) -> Result<KeyPair, KeyError> {
        (**self).generate_keypair()
    }
}

impl<T: FheRuntime + ?Sized> FheRuntime for &T {
    fn create_eip712(
        &self,
        public_key: &[u8],
        contracts: &ContractSet,
        start_timestamp: u64,
        duration_days: u64,
    ) -> Eip712Payload {
        (**self).create_eip712(public_key, contracts, start_timestamp, duration_days)
    }

    fn generate_keypair(&self) -> Result<KeyPair, KeyError> {
        (**self).generate_keypair()
    }
}
