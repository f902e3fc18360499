//! Execution limits and container settings.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Wall-clock budget for one execution (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Ceiling on each captured stream (1 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

pub const DEFAULT_RUNTIME: &str = "docker";
pub const DEFAULT_IMAGE: &str = "ipython-executor";
pub const DEFAULT_SESSIONS_DIR: &str = "sessions";

/// Where the per-session host directory shows up inside the container.
pub const CONTAINER_SESSION_DIR: &str = "/home/user/session";

const MEMORY_LIMIT: &str = "512m";
const CPU_LIMIT: &str = "0.5";
const NETWORK_MODE: &str = "none";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("timeout must be at least one second")]
    ZeroTimeout,
    #[error("max output bytes must be greater than zero")]
    ZeroOutputLimit,
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Per-invocation limits. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// How the isolation boundary is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Container runtime binary (`docker`, `podman`, ...).
    pub runtime: String,
    pub image: String,
    /// Host directory holding one subdirectory per session.
    pub sessions_root: PathBuf,
    pub memory: String,
    pub cpus: String,
    pub network: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            runtime: DEFAULT_RUNTIME.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            sessions_root: PathBuf::from(DEFAULT_SESSIONS_DIR),
            memory: MEMORY_LIMIT.to_string(),
            cpus: CPU_LIMIT.to_string(),
            network: NETWORK_MODE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub limits: Limits,
    pub sandbox: SandboxConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.timeout.as_secs() == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.limits.max_output_bytes == 0 {
            return Err(ConfigError::ZeroOutputLimit);
        }
        if self.sandbox.runtime.trim().is_empty() {
            return Err(ConfigError::Empty("runtime"));
        }
        if self.sandbox.image.trim().is_empty() {
            return Err(ConfigError::Empty("image"));
        }
        if self.sandbox.sessions_root.as_os_str().is_empty() {
            return Err(ConfigError::Empty("sessions directory"));
        }
        Ok(())
    }
}
