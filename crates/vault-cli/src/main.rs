//! `vault-cli`: operator entry point for the PII encryption core.
//!
//! Startup sequence:
//! 1. Parse the command line.
//! 2. Load [`Config`] from environment variables.
//! 3. Initialise structured JSON logging on stderr.
//! 4. Run the subcommand and print its JSON result on stdout.

mod commands;
mod config;
mod telemetry;

use anyhow::Result;
use clap::Parser;
use common::protocol::ErrorResponse;
use tracing::{error, info};

use commands::Cli;
use config::Config;

fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Command line
    // -----------------------------------------------------------------------
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(version = env!("CARGO_PKG_VERSION"), "vault-cli starting");

    // -----------------------------------------------------------------------
    // 4. Command
    // -----------------------------------------------------------------------
    match commands::run(cli.command, &cfg, &mut std::io::stdin().lock()) {
        Ok(output) => {
            println!("{}", output.stdout);
            std::process::exit(output.exit_code);
        }
        Err(e) => {
            error!(error = %e, "command failed");
            let body = ErrorResponse::new(error_code(&e), e.to_string());
            eprintln!("{}", serde_json::to_string(&body)?);
            std::process::exit(e.exit_code());
        }
    }
}

fn error_code(e: &common::ServiceError) -> &'static str {
    use common::ServiceError::*;
    match e {
        Configuration(_) => "configuration_error",
        Decryption(_) => "decryption_failed",
        InvalidInput(_) => "invalid_input",
        Internal(_) => "internal_error",
    }
}
