//! This file defines the fitbucket binary entry point.

use fitbucket::app;
use fitbucket::cli;
use fitbucket::error::log_error;
use fitbucket::metrics;
use fitbucket::tracing;

use std::process::ExitCode;

/// Application entry point
#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    if let Err(error) = tracing::init_tracing(&args) {
        eprintln!("Failed to initialise tracing: {}", error);
        return ExitCode::FAILURE;
    }
    let result = match metrics::register_metrics() {
        Ok(()) => app::run(&args).await,
        Err(error) => Err(error),
    };
    let code = match result {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(error) => {
            log_error(&error);
            ExitCode::FAILURE
        }
    };
    tracing::shutdown_tracing();
    code
}
