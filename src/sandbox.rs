//! Container lifecycle: spawn, feed, collect under limits, kill.

use crate::config::{Limits, SandboxConfig, CONTAINER_SESSION_DIR};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::{error, info, warn};

const CONTAINER_PREFIX: &str = "ipython-exec";

/// Everything needed to start one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub container_name: String,
    pub image: String,
    pub memory: String,
    pub cpus: String,
    pub network: String,
    /// Host directory bound to [`CONTAINER_SESSION_DIR`].
    pub session_dir: Option<PathBuf>,
}

impl LaunchPlan {
    /// A plan with a freshly generated, unique container name.
    pub fn new(config: &SandboxConfig, session_dir: Option<PathBuf>) -> Self {
        Self {
            container_name: format!("{}-{}", CONTAINER_PREFIX, uuid::Uuid::new_v4()),
            image: config.image.clone(),
            memory: config.memory.clone(),
            cpus: config.cpus.clone(),
            network: config.network.clone(),
            session_dir,
        }
    }

    /// Arguments for the runtime binary, e.g. `docker <args>`.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--name".to_string(),
            self.container_name.clone(),
            "--rm".to_string(),
            "--memory".to_string(),
            self.memory.clone(),
            "--cpus".to_string(),
            self.cpus.clone(),
            "--network".to_string(),
            self.network.clone(),
            "-i".to_string(),
        ];
        if let Some(dir) = &self.session_dir {
            args.push("-v".to_string());
            args.push(format!("{}:{}", dir.display(), CONTAINER_SESSION_DIR));
        }
        args.push(self.image.clone());
        args
    }
}

/// Identifies a running sandbox both locally and to the container runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxHandle {
    /// Local runtime-client process, if there is one.
    pub pid: Option<u32>,
    /// Name the runtime knows the container by. Kills target this.
    pub container_name: String,
}

/// A started sandbox with its pipes and exit future.
pub struct SpawnedSandbox {
    pub handle: SandboxHandle,
    pub stdin: Box<dyn AsyncWrite + Send + Unpin>,
    pub stdout: Box<dyn AsyncRead + Send + Unpin>,
    pub stderr: Box<dyn AsyncRead + Send + Unpin>,
    /// Resolves to the exit code; signal deaths map to -1.
    pub exit: BoxFuture<'static, io::Result<i32>>,
}

/// Starts and kills isolation boundaries. Swapped out in tests.
#[async_trait]
pub trait ProcessManager: Send + Sync {
    async fn spawn(&self, plan: &LaunchPlan) -> io::Result<SpawnedSandbox>;

    /// Kill the container named by the handle, not just the local process.
    async fn kill(&self, handle: &SandboxHandle) -> io::Result<()>;
}

/// Drives a container runtime CLI (`docker` or a compatible one).
#[derive(Debug, Clone)]
pub struct DockerProcessManager {
    runtime: String,
}

impl DockerProcessManager {
    pub fn new(runtime: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
        }
    }
}

#[async_trait]
impl ProcessManager for DockerProcessManager {
    async fn spawn(&self, plan: &LaunchPlan) -> io::Result<SpawnedSandbox> {
        let mut child = Command::new(&self.runtime)
            .args(plan.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let missing =
            |name: &str| io::Error::new(io::ErrorKind::BrokenPipe, format!("no {} pipe", name));
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        let handle = SandboxHandle {
            pid: child.id(),
            container_name: plan.container_name.clone(),
        };
        info!(pid = ?handle.pid, container = %handle.container_name, "Sandbox spawned");

        Ok(SpawnedSandbox {
            handle,
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            exit: Box::pin(async move {
                let status = child.wait().await?;
                Ok(status.code().unwrap_or(-1))
            }),
        })
    }

    async fn kill(&self, handle: &SandboxHandle) -> io::Result<()> {
        let output = Command::new(&self.runtime)
            .args(["kill", handle.container_name.as_str()])
            .stdin(Stdio::null())
            .output()
            .await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "{} kill {} exited with {}: {}",
                    self.runtime,
                    handle.container_name,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// How one sandbox run ended.
#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed {
        exit_code: i32,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
    TimedOut,
    /// A stream crossed the byte ceiling; its output was discarded.
    OutputTooLarge(Stream),
    /// The sandbox never started, or its pipes failed mid-run.
    LaunchFailed(String),
}

enum ExchangeError {
    Overflow(Stream),
    Io(io::Error),
}

impl From<io::Error> for ExchangeError {
    fn from(err: io::Error) -> Self {
        ExchangeError::Io(err)
    }
}

/// Run `code` in the sandbox described by `plan`.
///
/// Feeding stdin and draining both streams happen concurrently and race the
/// deadline. Whenever the run is cut short the container is killed by name
/// before this returns.
pub async fn run(
    manager: &dyn ProcessManager,
    plan: &LaunchPlan,
    code: &str,
    limits: &Limits,
) -> RunOutcome {
    let SpawnedSandbox {
        handle,
        stdin,
        stdout,
        stderr,
        exit,
    } = match manager.spawn(plan).await {
        Ok(spawned) => spawned,
        Err(e) => {
            error!(container = %plan.container_name, error = %e, "Failed to spawn sandbox");
            return RunOutcome::LaunchFailed(e.to_string());
        }
    };

    let max = limits.max_output_bytes;
    let exchange = async move {
        let (_, stdout, stderr) = tokio::try_join!(
            feed(stdin, code.as_bytes()),
            read_capped(stdout, max, Stream::Stdout),
            read_capped(stderr, max, Stream::Stderr),
        )?;
        let exit_code = exit.await?;
        Ok::<_, ExchangeError>((exit_code, stdout, stderr))
    };
    tokio::pin!(exchange);

    tokio::select! {
        result = &mut exchange => match result {
            Ok((exit_code, stdout, stderr)) => {
                info!(
                    container = %handle.container_name,
                    exit_code,
                    stdout_len = stdout.len(),
                    stderr_len = stderr.len(),
                    "Sandbox finished"
                );
                RunOutcome::Completed { exit_code, stdout, stderr }
            }
            Err(ExchangeError::Overflow(stream)) => {
                warn!(container = %handle.container_name, %stream, limit = max, "Output limit exceeded");
                kill_quietly(manager, &handle).await;
                RunOutcome::OutputTooLarge(stream)
            }
            Err(ExchangeError::Io(e)) => {
                error!(container = %handle.container_name, error = %e, "Sandbox I/O failed");
                kill_quietly(manager, &handle).await;
                RunOutcome::LaunchFailed(e.to_string())
            }
        },
        _ = tokio::time::sleep(limits.timeout) => {
            warn!(
                container = %handle.container_name,
                timeout_secs = limits.timeout.as_secs(),
                "Sandbox exceeded time limit"
            );
            kill_quietly(manager, &handle).await;
            RunOutcome::TimedOut
        }
    }
}

async fn kill_quietly(manager: &dyn ProcessManager, handle: &SandboxHandle) {
    if let Err(e) = manager.kill(handle).await {
        error!(container = %handle.container_name, error = %e, "Error killing sandbox");
    }
}

/// Write the whole snippet, then close stdin. A closed pipe on the other end
/// just means the shim stopped reading.
async fn feed<W>(mut stdin: W, code: &[u8]) -> Result<(), ExchangeError>
where
    W: AsyncWrite + Unpin,
{
    let written = match stdin.write_all(code).await {
        Ok(()) => stdin.shutdown().await,
        Err(e) => Err(e),
    };
    match written {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e.into()),
        _ => Ok(()),
    }
}

/// Read to EOF, holding at most `limit + 1` bytes.
async fn read_capped<R>(reader: R, limit: usize, stream: Stream) -> Result<Vec<u8>, ExchangeError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut buf)
        .await?;
    if buf.len() > limit {
        return Err(ExchangeError::Overflow(stream));
    }
    Ok(buf)
}
