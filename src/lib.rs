//! pyexec - run Python snippets in disposable, network-isolated containers.
//!
//! The orchestrator side ([`executor`], [`sandbox`], [`translate`]) spawns
//! one container per request, feeds it the snippet, enforces the time and
//! output limits and turns whatever comes back into an [`ExecutionResult`].
//! The [`shim`] runs inside that container and speaks [`protocol`].

pub mod config;
pub mod error;
pub mod executor;
pub mod http_server;
pub mod protocol;
pub mod result;
pub mod sandbox;
pub mod session;
pub mod shim;
pub mod state;
pub mod translate;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, Limits, SandboxConfig};
pub use error::ExecError;
pub use executor::Executor;
pub use result::{Content, ExecutionResult, ExecutionStatus};
