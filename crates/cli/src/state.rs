use std::io::Write;
use std::{
    fs,
    path::{Path, PathBuf},
};

use common::runtime::{RelayerConfig, RelayerMetadata, HARDHAT_CHAIN_ID};
use common::signer::LocalSigner;
use common::storage::{FsStorage, FsStorageError};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

pub const APP_NAME: &str = "fhe-grant";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEY_FILE_NAME: &str = "key.pem";
pub const GRANTS_DIR_NAME: &str = "grants";

/// Which relayer deployment grants are bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetworkConfig {
    /// Public deployment on Sepolia
    #[default]
    Sepolia,

    /// Local hardhat node running the FHE mock
    Hardhat {
        /// Chain id the node reports
        #[serde(default = "default_hardhat_chain_id")]
        chain_id: u64,
        /// Extra chain ids to treat as mock chains
        #[serde(default)]
        mock_chains: Vec<u64>,
        /// Contract addresses from the node's `fhevm_relayer_metadata`;
        /// without them the node is treated as Sepolia
        #[serde(default)]
        metadata: Option<RelayerMetadata>,
    },

    /// Fully specified deployment
    Custom { relayer: RelayerConfig },
}

fn default_hardhat_chain_id() -> u64 {
    HARDHAT_CHAIN_ID
}

impl NetworkConfig {
    pub fn relayer_config(&self) -> RelayerConfig {
        match self {
            NetworkConfig::Sepolia => RelayerConfig::sepolia(),
            NetworkConfig::Hardhat {
                chain_id,
                mock_chains,
                metadata,
            } => RelayerConfig::for_chain(*chain_id, mock_chains, metadata.as_ref()),
            NetworkConfig::Custom { relayer } => relayer.clone(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default log level; `RUST_LOG` takes precedence
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_log_level")]
    pub log_level: tracing::Level,
    /// Directory for daily rolling log files (stderr only if not set)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Relayer deployment
    #[serde(default)]
    pub network: NetworkConfig,
}

fn default_log_level() -> tracing::Level {
    tracing::Level::WARN
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: None,
            network: NetworkConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.fhe-grant)
    pub state_dir: PathBuf,
    /// Path to the signing key PEM file
    pub key_path: PathBuf,
    /// Path to the cached grants directory
    pub grants_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.fhe-grant)
    pub fn state_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new state directory with a fresh signing key
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        Self::init_with_signer(custom_path, config, &LocalSigner::generate())
    }

    /// Initialize a new state directory around an existing signing key
    pub fn init_with_signer(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
        signer: &LocalSigner,
    ) -> Result<Self, StateError> {
        let state_dir = Self::state_dir(custom_path)?;

        if state_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&state_dir)?;

        let grants_path = state_dir.join(GRANTS_DIR_NAME);
        fs::create_dir_all(&grants_path)?;

        let key_path = state_dir.join(KEY_FILE_NAME);
        write_private(&key_path, signer.to_pem().as_bytes())?;

        let config = config.unwrap_or_default();
        let config_path = state_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            state_dir,
            key_path,
            grants_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let state_dir = Self::state_dir(custom_path)?;

        if !state_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let key_path = state_dir.join(KEY_FILE_NAME);
        let grants_path = state_dir.join(GRANTS_DIR_NAME);
        let config_path = state_dir.join(CONFIG_FILE_NAME);

        if !key_path.exists() {
            return Err(StateError::MissingFile(KEY_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            state_dir,
            key_path,
            grants_path,
            config_path,
            config,
        })
    }

    /// Load the signing key from the key file
    pub fn load_signer(&self) -> Result<LocalSigner, StateError> {
        let pem = fs::read_to_string(&self.key_path)?;
        LocalSigner::from_pem(&pem).map_err(|e| StateError::InvalidKey(e.to_string()))
    }

    /// Open the grant store, recreating the directory if it was removed
    pub async fn open_storage(&self) -> Result<FsStorage, StateError> {
        Ok(FsStorage::open(&self.grants_path).await?)
    }
}

/// Create a new file readable by its owner only (on unix)
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)?.write_all(contents)
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state directory not initialized. Run 'fhe-grant init' first")]
    NotInitialized,

    #[error("state directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("grant storage error: {0}")]
    Storage(#[from] FsStorageError),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
