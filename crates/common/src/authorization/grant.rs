use std::fmt;

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

use super::{AuthorizationError, ContractSet, Eip712Payload, ScopeKey};
use crate::crypto::{KeyError, KeyPair};
use crate::runtime::FheRuntime;

/// Validity of every authorization this crate signs
pub const DURATION_DAYS: u64 = 365;
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Current wall clock time in whole seconds since the epoch
pub fn timestamp_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// A signed, time-boxed grant letting the relayer decrypt on a user's behalf
///
/// Immutable: obtained from [`Authorization::create`] or by decoding a stored
/// record, and replaced rather than modified on renewal. The serialized form
/// is the cache record and carries every field, including the ephemeral
/// private key and the exact typed payload that was signed. Decoding through
/// serde applies the same checks as [`Authorization::deserialize`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "AuthorizationRecord")]
pub struct Authorization {
    pub(super) public_key: Bytes,
    pub(super) private_key: Bytes,
    pub(super) signature: Bytes,
    pub(super) start_timestamp: u64,
    pub(super) duration_days: u64,
    pub(super) user_address: Address,
    pub(super) contract_addresses: ContractSet,
    pub(super) eip712: Eip712Payload,
}

/// Unchecked wire form of [`Authorization`]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationRecord {
    public_key: Bytes,
    private_key: Bytes,
    signature: Bytes,
    start_timestamp: u64,
    duration_days: u64,
    user_address: Address,
    contract_addresses: ContractSet,
    eip712: Eip712Payload,
}

impl TryFrom<AuthorizationRecord> for Authorization {
    type Error = AuthorizationError;

    fn try_from(record: AuthorizationRecord) -> Result<Self, Self::Error> {
        let auth = Self {
            public_key: record.public_key,
            private_key: record.private_key,
            signature: record.signature,
            start_timestamp: record.start_timestamp,
            duration_days: record.duration_days,
            user_address: record.user_address,
            contract_addresses: record.contract_addresses,
            eip712: record.eip712,
        };
        auth.check_consistency()?;
        Ok(auth)
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("signature", &self.signature)
            .field("start_timestamp", &self.start_timestamp)
            .field("duration_days", &self.duration_days)
            .field("user_address", &self.user_address)
            .field("contract_addresses", &self.contract_addresses)
            .finish_non_exhaustive()
    }
}

impl Authorization {
    pub fn public_key(&self) -> &Bytes {
        &self.public_key
    }

    pub fn private_key(&self) -> &Bytes {
        &self.private_key
    }

    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    pub fn start_timestamp(&self) -> u64 {
        self.start_timestamp
    }

    pub fn duration_days(&self) -> u64 {
        self.duration_days
    }

    pub fn user_address(&self) -> Address {
        self.user_address
    }

    pub fn contract_addresses(&self) -> &ContractSet {
        &self.contract_addresses
    }

    pub fn eip712(&self) -> &Eip712Payload {
        &self.eip712
    }

    /// The ephemeral pair this grant was signed for
    pub fn key_pair(&self) -> Result<KeyPair, KeyError> {
        KeyPair::new(self.public_key.clone(), self.private_key.clone())
    }

    /// First second at which the grant is no longer valid
    pub fn expires_at(&self) -> u64 {
        self.start_timestamp
            .saturating_add(self.duration_days.saturating_mul(SECONDS_PER_DAY))
    }

    /// Whether `now` falls inside `[start, start + duration)`
    pub fn is_valid(&self, now: u64) -> bool {
        self.start_timestamp <= now && now < self.expires_at()
    }

    pub fn is_valid_now(&self) -> bool {
        self.is_valid(timestamp_now())
    }

    /// Scope key this grant is stored under
    ///
    /// The public key only takes part when the grant was requested for a
    /// pinned key pair.
    pub fn scope_key<R: FheRuntime + ?Sized>(
        &self,
        runtime: &R,
        with_public_key: bool,
    ) -> Result<ScopeKey, AuthorizationError> {
        let public_key = with_public_key.then_some(&self.public_key[..]);
        ScopeKey::derive(
            runtime,
            self.user_address,
            &self.contract_addresses,
            public_key,
        )
    }

    /// Check the signature against the retained payload
    pub fn verify(&self) -> Result<(), AuthorizationError> {
        let recovered = self.eip712.recover_address(&self.signature).map_err(|e| {
            AuthorizationError::SignatureMismatch {
                expected: self.user_address,
                reason: e.to_string(),
            }
        })?;
        if recovered != self.user_address {
            return Err(AuthorizationError::SignatureMismatch {
                expected: self.user_address,
                reason: format!("recovered {}", recovered),
            });
        }
        Ok(())
    }

    pub fn serialize(&self) -> Result<String, AuthorizationError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a cache record
    ///
    /// Anything that does not describe a coherent grant is `MalformedRecord`:
    /// unparsable text, missing fields, empty keys, a non-canonical contract
    /// list, a foreign schema, or record fields that disagree with the signed
    /// message.
    pub fn deserialize(raw: &str) -> Result<Self, AuthorizationError> {
        serde_json::from_str(raw).map_err(|e| AuthorizationError::MalformedRecord(e.to_string()))
    }

    fn check_consistency(&self) -> Result<(), AuthorizationError> {
        let malformed = |reason: &str| Err(AuthorizationError::MalformedRecord(reason.to_string()));

        if self.public_key.is_empty() || self.private_key.is_empty() {
            return malformed("empty key material");
        }
        if self.signature.is_empty() {
            return malformed("empty signature");
        }
        if !self.eip712.has_standard_schema() {
            return malformed("unexpected typed data schema");
        }

        let message = self.eip712.message();
        if message.public_key != self.public_key {
            return malformed("public key differs from signed message");
        }
        if message.contract_addresses != self.contract_addresses.as_slice() {
            return malformed("contract addresses differ from signed message");
        }
        if message.start_timestamp != self.start_timestamp
            || message.duration_days != self.duration_days
        {
            return malformed("validity window differs from signed message");
        }
        Ok(())
    }
}
