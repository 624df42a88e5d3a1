use std::path::PathBuf;

use clap::Args;

use common::authorization::{AuthorizationError, ContractSet};
use common::runtime::sdk::{self, SdkError};
use fhe_grant::grants::{self, read_key_pair, GrantsError};
use fhe_grant::{AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Grant {
    /// Contract addresses the grant covers
    #[arg(required = true)]
    pub contracts: Vec<String>,

    /// JSON file holding a fixed {"publicKey", "privateKey"} pair to bind the grant to
    #[arg(long)]
    pub key_pair: Option<PathBuf>,

    /// Drop any cached grant for this scope and sign a new one
    #[arg(long)]
    pub renew: bool,

    /// Print the full grant record, private key included, as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum GrantError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("runtime error: {0}")]
    Sdk(#[from] SdkError),
    #[error("authorization failed: {0}")]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Grants(#[from] GrantsError),
    #[error("{0:#}")]
    KeyPair(#[from] anyhow::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Grant {
    type Error = GrantError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let runtime = sdk::init(state.config.network.relayer_config())?;

        let contracts = ContractSet::parse(&self.contracts)?;
        let key_pair = self.key_pair.as_deref().map(read_key_pair).transpose()?;

        let grant = grants::issue(&state, runtime, &contracts, key_pair.as_ref(), self.renew).await?;
        if self.json {
            return Ok(grant.auth.serialize()?);
        }
        Ok(grant.to_string())
    }
}
