//! `inspector-inject` binary.
//!
//! Stdout carries only command output; logs and errors go to stderr.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use inspector_inject::cli::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    init_logging(&args);

    let result = cli::run(&args).await;
    let status = cli::exit_status(&result);

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => eprintln!("error: {e}"),
    }

    ExitCode::from(status)
}

/// Initialize tracing/logging.
fn init_logging(args: &Cli) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log_directive()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
