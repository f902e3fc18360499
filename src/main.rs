//! pyexec - Python sandbox executor with HTTP API.
//!
//! Usage:
//!   pyexec serve [--port 8080]                 # Start HTTP server
//!   pyexec run [--session ID] [FILE]           # Execute FILE (or stdin) once

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use pyexec::config::{
    Config, Limits, SandboxConfig, DEFAULT_IMAGE, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_RUNTIME,
    DEFAULT_SESSIONS_DIR, DEFAULT_TIMEOUT_SECS,
};
use pyexec::state::AppState;
use pyexec::Executor;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pyexec")]
#[command(about = "Run Python snippets in disposable, network-isolated containers")]
struct Args {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs, Debug)]
struct Settings {
    /// Wall-clock limit per execution, in seconds
    #[arg(long, env = "PYEXEC_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout: u64,

    /// Maximum bytes captured per output stream
    #[arg(long, env = "PYEXEC_MAX_OUTPUT_BYTES", default_value_t = DEFAULT_MAX_OUTPUT_BYTES, global = true)]
    max_output_bytes: usize,

    /// Container runtime binary
    #[arg(long, env = "PYEXEC_RUNTIME", default_value = DEFAULT_RUNTIME, global = true)]
    runtime: String,

    /// Image that runs pyexec-shim
    #[arg(long, env = "PYEXEC_IMAGE", default_value = DEFAULT_IMAGE, global = true)]
    image: String,

    /// Host directory holding per-session mounts
    #[arg(long, env = "PYEXEC_SESSIONS_DIR", default_value = DEFAULT_SESSIONS_DIR, global = true)]
    sessions_dir: PathBuf,
}

impl Settings {
    fn into_config(self) -> Config {
        Config {
            limits: Limits {
                timeout: Duration::from_secs(self.timeout),
                max_output_bytes: self.max_output_bytes,
            },
            sandbox: SandboxConfig {
                runtime: self.runtime,
                image: self.image,
                sessions_root: self.sessions_dir,
                ..SandboxConfig::default()
            },
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, env = "PYEXEC_PORT", default_value = "8080")]
        port: u16,
    },
    /// Execute one snippet and print the result as JSON
    Run {
        /// Session whose directory is mounted into the container
        #[arg(long)]
        session: Option<String>,

        /// File with the code; reads stdin when omitted
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = args.settings.into_config();
    config.validate().context("invalid configuration")?;
    let executor = Executor::docker(config);

    match args.command {
        Commands::Serve { port } => {
            pyexec::http_server::run_server(port, AppState::new(executor))
                .await
                .context("HTTP server failed")?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { session, file } => {
            let code = match file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut code = String::new();
                    std::io::stdin()
                        .read_to_string(&mut code)
                        .context("failed to read code from stdin")?;
                    code
                }
            };

            let result = executor.execute(&code, session.as_deref()).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(if result.status.is_completed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
