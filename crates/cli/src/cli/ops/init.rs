use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};

use common::crypto::KeyError;
use common::runtime::{RelayerMetadata, HARDHAT_CHAIN_ID};
use common::signer::LocalSigner;
use fhe_grant::{AppConfig, AppState, NetworkConfig, StateError};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Sepolia,
    Hardhat,
}

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Relayer network grants are bound to
    #[arg(long, value_enum, default_value_t = Network::Sepolia)]
    pub network: Network,

    /// Chain id of the local node (hardhat only)
    #[arg(long, default_value_t = HARDHAT_CHAIN_ID)]
    pub chain_id: u64,

    /// JSON file holding the node's fhevm_relayer_metadata (hardhat only)
    #[arg(long)]
    pub metadata: Option<PathBuf>,

    /// Import an existing hex signing key instead of generating one
    #[arg(long)]
    pub signing_key: Option<String>,

    /// Default log level
    #[arg(long, default_value = "warn")]
    pub log_level: tracing::Level,

    /// Directory for log files (logs to stderr only if not set)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
    #[error("invalid signing key: {0}")]
    SigningKey(#[from] KeyError),
    #[error("{0:#}")]
    Metadata(#[from] anyhow::Error),
}

fn read_metadata(path: &Path) -> anyhow::Result<RelayerMetadata> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read relayer metadata {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid relayer metadata in {}", path.display()))
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let network = match self.network {
            Network::Sepolia => NetworkConfig::Sepolia,
            Network::Hardhat => NetworkConfig::Hardhat {
                chain_id: self.chain_id,
                mock_chains: Vec::new(),
                metadata: self.metadata.as_deref().map(read_metadata).transpose()?,
            },
        };
        let relayer = network.relayer_config();

        let config = AppConfig {
            log_level: self.log_level,
            log_dir: self.log_dir.clone(),
            network,
        };

        let signer = match &self.signing_key {
            Some(hex) => LocalSigner::from_hex(hex)?,
            None => LocalSigner::generate(),
        };
        let state = AppState::init_with_signer(ctx.config_path.clone(), Some(config), &signer)?;

        let output = format!(
            "Initialized fhe-grant directory at: {}\n\
             - Key: {}\n\
             - Grants: {}\n\
             - Config: {}\n\
             - Signer address: {}\n\
             - Host chain: {}\n\
             - Gateway chain: {}",
            state.state_dir.display(),
            state.key_path.display(),
            state.grants_path.display(),
            state.config_path.display(),
            signer.address(),
            relayer.chain_id,
            relayer.gateway_chain_id,
        );

        Ok(output)
    }
}
