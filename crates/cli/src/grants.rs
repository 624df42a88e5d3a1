//! Grant operations backing the `grant` and `show` commands

use std::fmt;
use std::path::Path;

use anyhow::Context;
use common::authorization::{
    parse_address, Authorization, AuthorizationCache, AuthorizationError, ContractSet, ScopeKey,
};
use common::crypto::KeyPair;
use common::runtime::FheRuntime;

use crate::state::{AppState, StateError};

#[derive(Debug, thiserror::Error)]
pub enum GrantsError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("authorization failed: {0}")]
    Authorization(#[from] AuthorizationError),
}

/// Read a pinned key pair from a JSON file
pub fn read_key_pair(path: &Path) -> anyhow::Result<KeyPair> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key pair {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid key pair in {}", path.display()))
}

pub fn format_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}

/// A grant together with the key it is cached under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedGrant {
    pub auth: Authorization,
    pub scope_key: ScopeKey,
}

impl fmt::Display for ScopedGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let contracts = self
            .auth
            .contract_addresses()
            .iter()
            .map(|address| address.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "user:       {}", self.auth.user_address())?;
        writeln!(f, "contracts:  {}", contracts)?;
        writeln!(f, "public key: {}", self.auth.public_key())?;
        writeln!(f, "valid from: {}", format_timestamp(self.auth.start_timestamp()))?;
        writeln!(f, "expires:    {}", format_timestamp(self.auth.expires_at()))?;
        write!(f, "scope key:  {}", self.scope_key)
    }
}

/// Result of looking up a cached grant without signing
#[derive(Debug, Clone)]
pub struct Lookup {
    /// Checksummed address the lookup was made for
    pub user: String,
    pub grant: Option<ScopedGrant>,
}

/// Return a valid grant for the state directory's signer, signing if needed
///
/// With `renew`, whatever is cached for the scope is dropped first.
pub async fn issue<R: FheRuntime>(
    state: &AppState,
    runtime: R,
    contracts: &ContractSet,
    key_pair: Option<&KeyPair>,
    renew: bool,
) -> Result<ScopedGrant, GrantsError> {
    let signer = state.load_signer()?;
    let storage = state.open_storage().await?;
    let cache = AuthorizationCache::new(runtime, storage);

    if renew {
        let public_key = key_pair.map(|pair| &pair.public_key()[..]);
        cache
            .forget(contracts, signer.address(), public_key)
            .await?;
    }

    let auth = cache.load_or_create(contracts, &signer, key_pair).await?;
    let scope_key = auth.scope_key(cache.runtime(), key_pair.is_some())?;
    Ok(ScopedGrant { auth, scope_key })
}

/// Find a cached grant for `user`, or for the local signer when unset
pub async fn lookup<R: FheRuntime>(
    state: &AppState,
    runtime: R,
    contracts: &ContractSet,
    user: Option<&str>,
    key_pair: Option<&KeyPair>,
) -> Result<Lookup, GrantsError> {
    let user = match user {
        Some(user) => parse_address(user)?,
        None => state.load_signer()?.address(),
    };
    let storage = state.open_storage().await?;
    let public_key = key_pair.map(|pair| &pair.public_key()[..]);

    let grant = match Authorization::load(&runtime, &storage, contracts, user, public_key).await? {
        Some(auth) => {
            let scope_key = auth.scope_key(&runtime, key_pair.is_some())?;
            Some(ScopedGrant { auth, scope_key })
        }
        None => None,
    };
    Ok(Lookup {
        user: user.to_string(),
        grant,
    })
}
