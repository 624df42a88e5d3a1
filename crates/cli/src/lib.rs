// Grant operations shared by the commands
pub mod grants;

// Logging setup for the binary
pub mod process;

// App state (configuration, paths)
pub mod state;

pub use process::init_logging;
pub use state::{AppConfig, AppState, NetworkConfig, StateError};
