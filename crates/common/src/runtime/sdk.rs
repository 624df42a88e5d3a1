//! Process-wide relayer runtime handle
//!
//! The runtime is initialized once per process and shared from then on.
//! [`init`] is idempotent and safe to race from several threads: exactly one
//! caller's configuration wins, every other caller observes it. Asking for a
//! different network after initialization is an error rather than a silent
//! swap, since grants already handed out are bound to the first one.

use std::sync::OnceLock;

use super::{RelayerConfig, RelayerInstance};

static SDK: OnceLock<RelayerInstance> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("relayer sdk is not initialized")]
    NotInitialized,
    #[error("relayer sdk already initialized for chain {0}")]
    AlreadyInitialized(u64),
}

/// Initialize the process-wide runtime, or return the existing one if it was
/// initialized with the same configuration
pub fn init(config: RelayerConfig) -> Result<&'static RelayerInstance, SdkError> {
    let instance = SDK.get_or_init(|| {
        tracing::info!(
            chain_id = config.chain_id,
            gateway_chain_id = config.gateway_chain_id,
            "initializing relayer sdk"
        );
        RelayerInstance::new(config.clone())
    });

    if instance.config() != &config {
        return Err(SdkError::AlreadyInitialized(instance.config().chain_id));
    }
    Ok(instance)
}

pub fn is_initialized() -> bool {
    SDK.get().is_some()
}

pub fn instance() -> Result<&'static RelayerInstance, SdkError> {
    SDK.get().ok_or(SdkError::NotInitialized)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::runtime::{RelayerMetadata, HARDHAT_CHAIN_ID};
    use alloy_primitives::Address;

    // The handle is global to the test binary, so the whole lifecycle lives in
    // one test.
    #[test]
    fn test_init_lifecycle() {
        assert!(!is_initialized());
        assert!(matches!(instance(), Err(SdkError::NotInitialized)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    init(RelayerConfig::sepolia()).map(|i| i as *const RelayerInstance as usize)
                })
            })
            .collect();
        let pointers: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert!(pointers.windows(2).all(|w| w[0] == w[1]));

        assert!(is_initialized());
        assert_eq!(instance().unwrap().config(), &RelayerConfig::sepolia());

        let other = RelayerConfig::mock(
            HARDHAT_CHAIN_ID,
            &RelayerMetadata {
                acl_address: Address::repeat_byte(1),
                input_verifier_address: Address::repeat_byte(2),
                kms_verifier_address: Address::repeat_byte(3),
            },
        );
        assert!(matches!(
            init(other),
            Err(SdkError::AlreadyInitialized(chain)) if chain == RelayerConfig::sepolia().chain_id
        ));
    }
}
