//! The `execute` entry point.

use crate::config::Config;
use crate::error::ExecError;
use crate::result::ExecutionResult;
use crate::sandbox::{self, DockerProcessManager, LaunchPlan, ProcessManager, RunOutcome};
use crate::session;
use crate::translate::translate;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs snippets, one fresh container per call. Safe to share across tasks.
#[derive(Clone)]
pub struct Executor {
    config: Arc<Config>,
    manager: Arc<dyn ProcessManager>,
}

impl Executor {
    pub fn new(config: Config, manager: Arc<dyn ProcessManager>) -> Self {
        Self {
            config: Arc::new(config),
            manager,
        }
    }

    /// Executor backed by the configured container runtime.
    pub fn docker(config: Config) -> Self {
        let manager = Arc::new(DockerProcessManager::new(config.sandbox.runtime.clone()));
        Self::new(config, manager)
    }

    /// Run `code` and describe what happened. Never fails: every error is
    /// reported as result content.
    pub async fn execute(&self, code: &str, session_id: Option<&str>) -> ExecutionResult {
        match self.try_execute(code, session_id).await {
            Ok(result) => result,
            Err(e) => {
                if e.is_validation() {
                    info!(error = %e, "Rejected execution request");
                } else {
                    warn!(session_id = ?session_id, error = %e, "Execution failed");
                }
                e.into()
            }
        }
    }

    async fn try_execute(
        &self,
        code: &str,
        session_id: Option<&str>,
    ) -> Result<ExecutionResult, ExecError> {
        if code.trim().is_empty() {
            return Err(ExecError::EmptyCode);
        }

        let session_dir =
            session::ensure_session_dir(&self.config.sandbox.sessions_root, session_id).await?;
        let plan = LaunchPlan::new(&self.config.sandbox, Some(session_dir));
        info!(
            session_id = session_id.unwrap_or(session::DEFAULT_SESSION),
            container = %plan.container_name,
            code_len = code.len(),
            "Executing snippet"
        );

        let limits = &self.config.limits;
        match sandbox::run(self.manager.as_ref(), &plan, code, limits).await {
            RunOutcome::Completed {
                exit_code,
                stdout,
                stderr,
            } => Ok(translate(exit_code, &stdout, &stderr)),
            RunOutcome::TimedOut => Err(ExecError::Timeout(limits.timeout.as_secs())),
            RunOutcome::OutputTooLarge(stream) => Err(ExecError::OutputTooLarge(stream)),
            RunOutcome::LaunchFailed(reason) => Err(ExecError::Launch(reason)),
        }
    }
}
