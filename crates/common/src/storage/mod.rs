//! Persistent string key/value storage for authorization records
//!
//! The grant cache only needs get/set/remove over strings. Backends are
//! swappable through [`StringStorage`]; [`MemoryStorage`] serves tests and
//! short-lived processes, [`FsStorage`] keeps records across runs.

mod fs;
mod memory;
mod provider;

pub use fs::{FsStorage, FsStorageError};
pub use memory::{MemoryStorage, MemoryStorageError};
pub use provider::StringStorage;
