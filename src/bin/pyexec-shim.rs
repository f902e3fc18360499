//! Container entrypoint: evaluate stdin once, print JSON records, exit.

use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("PYEXEC_SHIM_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match pyexec::shim::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pyexec-shim: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
