use clap::Parser;
use clap::error::ErrorKind as ClapErrorKind;

use fhirpipe_validate::cli::Cli;
use fhirpipe_validate::config::loader::load_config;
use fhirpipe_validate::output::{print_error, print_report};
use fhirpipe_validate::runner::{self, EXIT_FAILED, EXIT_OK, RunOptions};
use fhirpipe_validate::observability;

#[tokio::main]
async fn main() {
    let code = run().await;
    std::process::exit(code);
}

async fn run() -> i32 {
    // Load .env file if present; a missing file is not an error.
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    observability::init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => EXIT_OK,
                _ => EXIT_FAILED,
            };
        }
    };

    let cfg = match load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            print_error(&format!("Configuration error: {e}"));
            return EXIT_FAILED;
        }
    };
    observability::apply_logging_level(cli.log_level.as_deref().unwrap_or(&cfg.logging.level));

    let opts = RunOptions::from(&cli);
    match runner::run(&opts, &cfg, shutdown_signal()).await {
        Ok(verdict) => {
            print_report(&verdict);
            if verdict.passed() { EXIT_OK } else { EXIT_FAILED }
        }
        Err(e) => {
            tracing::error!(kind = ?e.kind(), "Validation aborted");
            print_error(&format!("{e}"));
            runner::exit_code_for(&e)
        }
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    tracing::warn!("Interrupted");
}
