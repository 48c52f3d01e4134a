//! cab CLI - incremental container-image builds
//!
//! Entry point for the cab command-line application.

use anyhow::Result;
use clap::Parser;

use cab::cli::output::display_error;
use cab::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Verbosity flags win over RUST_LOG defaults.
    let level = if cli.quiet {
        tracing::Level::ERROR
    } else {
        match cli.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match cli.run() {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
