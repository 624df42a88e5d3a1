use std::path::PathBuf;

use clap::Args;

use common::authorization::{AuthorizationError, ContractSet};
use common::runtime::sdk::{self, SdkError};
use fhe_grant::grants::{self, read_key_pair, GrantsError};
use fhe_grant::{AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Show {
    /// Contract addresses the grant covers
    #[arg(required = true)]
    pub contracts: Vec<String>,

    /// Look up grants issued to this address instead of the local signer
    #[arg(long)]
    pub user: Option<String>,

    /// JSON file holding the pinned key pair the grant was issued for
    #[arg(long)]
    pub key_pair: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ShowError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("runtime error: {0}")]
    Sdk(#[from] SdkError),
    #[error("lookup failed: {0}")]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Grants(#[from] GrantsError),
    #[error("{0:#}")]
    KeyPair(#[from] anyhow::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Show {
    type Error = ShowError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let runtime = sdk::init(state.config.network.relayer_config())?;

        let contracts = ContractSet::parse(&self.contracts)?;
        let key_pair = self.key_pair.as_deref().map(read_key_pair).transpose()?;

        let lookup = grants::lookup(
            &state,
            runtime,
            &contracts,
            self.user.as_deref(),
            key_pair.as_ref(),
        )
        .await?;
        let grant = match lookup.grant {
            Some(grant) => grant,
            None => return Ok(format!("No valid authorization cached for {}", lookup.user)),
        };

        let signature = match grant.auth.verify() {
            Ok(()) => "valid".to_string(),
            Err(e) => format!("INVALID ({})", e),
        };
        Ok(format!("{}\nsignature:  {}", grant, signature))
    }
}
