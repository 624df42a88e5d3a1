//! Shared test utilities for grant cache integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use common::authorization::{ContractSet, Eip712Payload};
use common::runtime::{RelayerConfig, RelayerInstance};
use common::signer::{LocalSigner, SignerError, TypedDataSigner};
use common::storage::{MemoryStorage, MemoryStorageError, StringStorage};

pub fn runtime() -> RelayerInstance {
    RelayerInstance::new(RelayerConfig::sepolia())
}

pub fn contracts(bytes: &[u8]) -> ContractSet {
    ContractSet::new(bytes.iter().map(|b| Address::repeat_byte(*b))).unwrap()
}

/// Local signer that counts signing prompts and can be told to refuse
#[derive(Debug, Clone)]
pub struct ScriptedSigner {
    inner: LocalSigner,
    calls: Arc<AtomicUsize>,
    reject: Arc<AtomicBool>,
    delay: Option<Duration>,
}

impl ScriptedSigner {
    pub fn new() -> Self {
        Self {
            inner: LocalSigner::generate(),
            calls: Arc::new(AtomicUsize::new(0)),
            reject: Arc::new(AtomicBool::new(false)),
            delay: None,
        }
    }

    /// Hold every signing prompt open for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn address(&self) -> Address {
        self.inner.address()
    }
}

#[async_trait]
impl TypedDataSigner for ScriptedSigner {
    async fn address(&self) -> Result<Address, SignerError> {
        Ok(self.inner.address())
    }

    async fn sign_typed_data(&self, payload: &Eip712Payload) -> Result<Bytes, SignerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject.load(Ordering::SeqCst) {
            return Err(SignerError::Rejected("user denied message signature".to_string()));
        }
        self.inner.sign_typed_data(payload).await
    }
}

/// Memory storage whose reads or writes can be switched off
#[derive(Debug, Clone, Default)]
pub struct FailingStorage {
    inner: MemoryStorage,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStorage {
        &self.inner
    }
}

#[async_trait]
impl StringStorage for FailingStorage {
    type Error = MemoryStorageError;

    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(MemoryStorageError::Internal("disk unavailable".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Self::Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MemoryStorageError::Internal("disk full".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), Self::Error> {
        self.inner.remove(key).await
    }
}
