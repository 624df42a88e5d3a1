// CLI modules
mod cli;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Grant, Init, Show, Version};
use fhe_grant::{init_logging, AppConfig, AppState};

command_enum! {
    (Grant, Grant),
    (Init, Init),
    (Show, Show),
    (Version, Version),
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Log with the configured level once initialized, defaults before that
    let config = AppState::load(args.config_path.clone())
        .map(|state| state.config)
        .unwrap_or_else(|_| AppConfig::default());
    let _guards = init_logging(&config);

    let ctx = cli::op::OpContext::new(args.config_path);

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::debug!("command failed: {:?}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
