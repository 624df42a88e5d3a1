//! Ephemeral key material for decryption grants
//!
//! Every authorization binds one key pair. The relayer re-encrypts the
//! decrypted cleartexts under the public half so that only the requester, who
//! keeps the private half in local storage, can read them.
//!
//! Generated pairs are X25519. Callers that need a stable pair across
//! authorizations (for example to reuse a relayer-registered key) pin their own
//! pair, in which case the public key becomes part of the cache scope.

mod keys;

pub use keys::{KeyError, KeyPair, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
