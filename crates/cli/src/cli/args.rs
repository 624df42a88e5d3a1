pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fhe-grant")]
#[command(about = "Sign, cache and inspect FHE decryption grants")]
pub struct Args {
    /// Path to the state directory (defaults to ~/.fhe-grant)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
