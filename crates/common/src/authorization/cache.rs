use std::collections::HashMap;
use std::sync::{Arc, Weak};

use alloy_primitives::Address;
use parking_lot::Mutex;

use super::grant::timestamp_now;
use super::{Authorization, AuthorizationError, ContractSet, ScopeKey};
use crate::crypto::KeyPair;
use crate::runtime::FheRuntime;
use crate::signer::TypedDataSigner;
use crate::storage::StringStorage;

impl Authorization {
    /// Look up a usable grant for the given scope
    ///
    /// Returns `Ok(None)` when nothing is stored, when the stored record
    /// cannot be decoded, when it has expired, or when it was issued for a
    /// different scope or network than the one requested. Only a failing
    /// storage read is an error.
    pub async fn load<R, T>(
        runtime: &R,
        storage: &T,
        contracts: &ContractSet,
        user_address: Address,
        public_key: Option<&[u8]>,
    ) -> Result<Option<Self>, AuthorizationError>
    where
        R: FheRuntime + ?Sized,
        T: StringStorage + ?Sized,
    {
        let key = ScopeKey::derive(runtime, user_address, contracts, public_key)?;
        Self::load_by_key(runtime, storage, &key, contracts, user_address, public_key).await
    }

    async fn load_by_key<R, T>(
        runtime: &R,
        storage: &T,
        key: &ScopeKey,
        contracts: &ContractSet,
        user_address: Address,
        public_key: Option<&[u8]>,
    ) -> Result<Option<Self>, AuthorizationError>
    where
        R: FheRuntime + ?Sized,
        T: StringStorage + ?Sized,
    {
        let raw = match storage
            .get(key.as_str())
            .await
            .map_err(AuthorizationError::storage)?
        {
            Some(raw) => raw,
            None => {
                tracing::debug!(key = %key, "no cached authorization");
                return Ok(None);
            }
        };

        let auth = match Self::deserialize(&raw) {
            Ok(auth) => auth,
            Err(e) => {
                tracing::warn!(key = %key, "discarding unreadable authorization: {}", e);
                return Ok(None);
            }
        };

        if auth.user_address != user_address || &auth.contract_addresses != contracts {
            tracing::warn!(key = %key, "cached authorization was issued for another scope");
            return Ok(None);
        }
        if let Some(public_key) = public_key {
            if auth.public_key[..] != *public_key {
                tracing::warn!(key = %key, "cached authorization is bound to another key pair");
                return Ok(None);
            }
        }

        let expected = runtime.create_eip712(
            &auth.public_key,
            contracts,
            auth.start_timestamp,
            auth.duration_days,
        );
        if auth.eip712 != expected {
            tracing::warn!(key = %key, "cached authorization was signed for another network");
            return Ok(None);
        }

        let now = timestamp_now();
        if !auth.is_valid(now) {
            tracing::debug!(
                key = %key,
                expired_at = auth.expires_at(),
                now,
                "cached authorization is not valid now"
            );
            return Ok(None);
        }

        tracing::debug!(key = %key, expires_at = auth.expires_at(), "using cached authorization");
        Ok(Some(auth))
    }

    /// Persist this grant under its own scope key and return that key
    ///
    /// `with_public_key` selects the pinned slot, and must match whether the
    /// grant was requested for a caller supplied key pair.
    pub async fn save<R, T>(
        &self,
        runtime: &R,
        storage: &T,
        with_public_key: bool,
    ) -> Result<ScopeKey, AuthorizationError>
    where
        R: FheRuntime + ?Sized,
        T: StringStorage + ?Sized,
    {
        let key = self.scope_key(runtime, with_public_key)?;
        let raw = self.serialize()?;
        storage
            .set(key.as_str(), raw)
            .await
            .map_err(AuthorizationError::storage)?;
        tracing::debug!(key = %key, "stored authorization");
        Ok(key)
    }
}

/// Return a valid grant for `contracts`, asking `signer` only when needed
///
/// At most one signing prompt per call. Unreadable or expired entries are
/// renewed silently; signer and storage faults are returned. Without the
/// single-flight layer of [`AuthorizationCache`], concurrent callers racing
/// on the same scope may each sign, and the last write wins.
pub async fn load_or_create<R, S, T>(
    runtime: &R,
    contracts: &ContractSet,
    signer: &S,
    storage: &T,
    key_pair: Option<&KeyPair>,
) -> Result<Authorization, AuthorizationError>
where
    R: FheRuntime + ?Sized,
    S: TypedDataSigner + ?Sized,
    T: StringStorage + ?Sized,
{
    let user_address = signer.address().await?;
    let public_key = key_pair.map(|pair| &pair.public_key()[..]);
    let key = ScopeKey::derive(runtime, user_address, contracts, public_key)?;
    load_or_create_at(runtime, contracts, signer, storage, key_pair, user_address, &key).await
}

async fn load_or_create_at<R, S, T>(
    runtime: &R,
    contracts: &ContractSet,
    signer: &S,
    storage: &T,
    key_pair: Option<&KeyPair>,
    user_address: Address,
    key: &ScopeKey,
) -> Result<Authorization, AuthorizationError>
where
    R: FheRuntime + ?Sized,
    S: TypedDataSigner + ?Sized,
    T: StringStorage + ?Sized,
{
    let public_key = key_pair.map(|pair| &pair.public_key()[..]);
    if let Some(auth) =
        Authorization::load_by_key(runtime, storage, key, contracts, user_address, public_key)
            .await?
    {
        return Ok(auth);
    }

    let generated;
    let key_pair = match key_pair {
        Some(pair) => pair,
        None => {
            generated = runtime.generate_keypair()?;
            &generated
        }
    };

    let auth = Authorization::create(runtime, contracts, key_pair, signer).await?;
    if auth.user_address != user_address {
        return Err(AuthorizationError::SignerUnavailable(format!(
            "signer switched accounts from {} to {} while signing",
            user_address, auth.user_address
        )));
    }

    let stored = auth.save(runtime, storage, public_key.is_some()).await?;
    tracing::info!(
        key = %stored,
        user = %auth.user_address,
        contracts = contracts.len(),
        expires_at = auth.expires_at(),
        "signed new decryption authorization"
    );
    Ok(auth)
}

type FlightMap = HashMap<String, Weak<tokio::sync::Mutex<()>>>;

/// Grant cache over a runtime and a storage backend
///
/// With [`AuthorizationCache::with_single_flight`], concurrent
/// `load_or_create` calls for the same scope inside this process queue on a
/// per-scope lock: the first caller signs, the rest find its record. Scopes
/// never contend with each other. Separate processes sharing a backend still
/// race, and the last write wins.
#[derive(Debug)]
pub struct AuthorizationCache<R, T> {
    runtime: R,
    storage: T,
    flights: Option<Mutex<FlightMap>>,
}

impl<R, T> AuthorizationCache<R, T>
where
    R: FheRuntime,
    T: StringStorage,
{
    pub fn new(runtime: R, storage: T) -> Self {
        Self {
            runtime,
            storage,
            flights: None,
        }
    }

    pub fn with_single_flight(mut self) -> Self {
        self.flights = Some(Mutex::new(HashMap::new()));
        self
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn storage(&self) -> &T {
        &self.storage
    }

    pub async fn load(
        &self,
        contracts: &ContractSet,
        user_address: Address,
        public_key: Option<&[u8]>,
    ) -> Result<Option<Authorization>, AuthorizationError> {
        Authorization::load(
            &self.runtime,
            &self.storage,
            contracts,
            user_address,
            public_key,
        )
        .await
    }

    pub async fn save(
        &self,
        auth: &Authorization,
        with_public_key: bool,
    ) -> Result<ScopeKey, AuthorizationError> {
        auth.save(&self.runtime, &self.storage, with_public_key)
            .await
    }

    /// Drop whatever is stored for a scope, so the next request signs again
    pub async fn forget(
        &self,
        contracts: &ContractSet,
        user_address: Address,
        public_key: Option<&[u8]>,
    ) -> Result<(), AuthorizationError> {
        let key = ScopeKey::derive(&self.runtime, user_address, contracts, public_key)?;
        self.storage
            .remove(key.as_str())
            .await
            .map_err(AuthorizationError::storage)?;
        tracing::debug!(key = %key, "removed cached authorization");
        Ok(())
    }

    pub async fn load_or_create<S: TypedDataSigner + ?Sized>(
        &self,
        contracts: &ContractSet,
        signer: &S,
        key_pair: Option<&KeyPair>,
    ) -> Result<Authorization, AuthorizationError> {
        let user_address = signer.address().await?;
        let public_key = key_pair.map(|pair| &pair.public_key()[..]);
        let key = ScopeKey::derive(&self.runtime, user_address, contracts, public_key)?;

        let flight = self.flight(&key);
        let _guard = match &flight {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        load_or_create_at(
            &self.runtime,
            contracts,
            signer,
            &self.storage,
            key_pair,
            user_address,
            &key,
        )
        .await
    }

    fn flight(&self, key: &ScopeKey) -> Option<Arc<tokio::sync::Mutex<()>>> {
        let mut flights = self.flights.as_ref()?.lock();
        flights.retain(|_, lock| lock.strong_count() > 0);

        if let Some(lock) = flights.get(key.as_str()).and_then(Weak::upgrade) {
            return Some(lock);
        }
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        flights.insert(key.as_str().to_string(), Arc::downgrade(&lock));
        Some(lock)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::runtime::{RelayerConfig, RelayerInstance};
    use crate::signer::LocalSigner;
    use crate::storage::MemoryStorage;

    fn contracts() -> ContractSet {
        ContractSet::new([Address::repeat_byte(0xbb), Address::repeat_byte(0xcc)]).unwrap()
    }

    #[tokio::test]
    async fn test_load_after_save() {
        let runtime = RelayerInstance::new(RelayerConfig::sepolia());
        let storage = MemoryStorage::new();
        let signer = LocalSigner::generate();

        let auth = load_or_create(&runtime, &contracts(), &signer, &storage, None)
            .await
            .unwrap();
        assert_eq!(storage.len(), 1);

        let loaded = Authorization::load(&runtime, &storage, &contracts(), signer.address(), None)
            .await
            .unwrap();
        assert_eq!(loaded, Some(auth));
    }

    #[tokio::test]
    async fn test_scope_mismatch_is_a_miss() {
        let runtime = RelayerInstance::new(RelayerConfig::sepolia());
        let storage = MemoryStorage::new();
        let signer = LocalSigner::generate();

        let auth = load_or_create(&runtime, &contracts(), &signer, &storage, None)
            .await
            .unwrap();

        // plant the record under another user's key
        let other = LocalSigner::generate();
        let key = ScopeKey::derive(&runtime, other.address(), &contracts(), None).unwrap();
        storage
            .set(key.as_str(), auth.serialize().unwrap())
            .await
            .unwrap();

        let loaded = Authorization::load(&runtime, &storage, &contracts(), other.address(), None)
            .await
            .unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_forget_forces_new_signature() {
        let cache = AuthorizationCache::new(
            RelayerInstance::new(RelayerConfig::sepolia()),
            MemoryStorage::new(),
        );
        let signer = LocalSigner::generate();

        let first = cache.load_or_create(&contracts(), &signer, None).await.unwrap();
        cache
            .forget(&contracts(), signer.address(), None)
            .await
            .unwrap();
        assert!(cache.storage().is_empty());

        let second = cache.load_or_create(&contracts(), &signer, None).await.unwrap();
        assert_ne!(first.public_key(), second.public_key());
    }

    #[tokio::test]
    async fn test_flight_locks_are_released() {
        let cache = AuthorizationCache::new(
            RelayerInstance::new(RelayerConfig::sepolia()),
            MemoryStorage::new(),
        )
        .with_single_flight();
        let signer = LocalSigner::generate();

        cache.load_or_create(&contracts(), &signer, None).await.unwrap();
        let other = ContractSet::new([Address::repeat_byte(0xdd)]).unwrap();
        cache.load_or_create(&other, &signer, None).await.unwrap();

        let flights = cache.flights.as_ref().unwrap().lock();
        assert!(flights.values().all(|lock| lock.strong_count() == 0));
    }
}
