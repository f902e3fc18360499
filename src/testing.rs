//! Scripted [`ProcessManager`] for tests.

use crate::sandbox::{LaunchPlan, ProcessManager, SandboxHandle, SpawnedSandbox};
use async_trait::async_trait;
use futures_util::future::{self, BoxFuture};
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

/// What the fake sandbox does once spawned.
#[derive(Debug, Clone, Default)]
pub struct Script {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    /// `None` never exits.
    exit_code: Option<i32>,
    spawn_error: Option<String>,
}

impl Script {
    pub fn exits(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Self::default()
        }
    }

    pub fn hangs() -> Self {
        Self::default()
    }

    pub fn spawn_fails(reason: &str) -> Self {
        Self {
            spawn_error: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn stdout(mut self, bytes: &[u8]) -> Self {
        self.stdout = bytes.to_vec();
        self
    }

    pub fn stderr(mut self, bytes: &[u8]) -> Self {
        self.stderr = bytes.to_vec();
        self
    }
}

/// Plays back one [`Script`] per spawn, in order; the last one repeats.
pub struct FakeManager {
    scripts: Mutex<Vec<Script>>,
    spawns: AtomicUsize,
    plans: Mutex<Vec<LaunchPlan>>,
    stdin: Arc<Mutex<Vec<u8>>>,
    killed: Mutex<Vec<String>>,
    kill_fails: bool,
}

impl FakeManager {
    pub fn new(script: Script) -> Self {
        Self::sequence(vec![script])
    }

    pub fn sequence(mut scripts: Vec<Script>) -> Self {
        scripts.reverse();
        Self {
            scripts: Mutex::new(scripts),
            spawns: AtomicUsize::new(0),
            plans: Mutex::new(Vec::new()),
            stdin: Arc::new(Mutex::new(Vec::new())),
            killed: Mutex::new(Vec::new()),
            kill_fails: false,
        }
    }

    pub fn failing_kill(mut self) -> Self {
        self.kill_fails = true;
        self
    }

    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    pub fn plans(&self) -> Vec<LaunchPlan> {
        self.plans.lock().unwrap().clone()
    }

    /// Everything written to stdin across all spawns.
    pub fn stdin(&self) -> Vec<u8> {
        self.stdin.lock().unwrap().clone()
    }

    /// Container names passed to `kill`, in call order.
    pub fn killed(&self) -> Vec<String> {
        self.killed.lock().unwrap().clone()
    }

    fn next_script(&self) -> Script {
        let mut scripts = self.scripts.lock().unwrap();
        if scripts.len() > 1 {
            scripts.pop().unwrap()
        } else {
            scripts.last().cloned().unwrap_or_default()
        }
    }
}

#[async_trait]
impl ProcessManager for FakeManager {
    async fn spawn(&self, plan: &LaunchPlan) -> io::Result<SpawnedSandbox> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        self.plans.lock().unwrap().push(plan.clone());

        let script = self.next_script();
        if let Some(reason) = script.spawn_error {
            return Err(io::Error::new(io::ErrorKind::NotFound, reason));
        }

        let exit: BoxFuture<'static, io::Result<i32>> = match script.exit_code {
            Some(code) => Box::pin(future::ready(Ok::<_, io::Error>(code))),
            None => Box::pin(future::pending::<io::Result<i32>>()),
        };
        Ok(SpawnedSandbox {
            handle: SandboxHandle {
                pid: None,
                container_name: plan.container_name.clone(),
            },
            stdin: Box::new(Recorder(self.stdin.clone())),
            stdout: Box::new(Cursor::new(script.stdout)),
            stderr: Box::new(Cursor::new(script.stderr)),
            exit,
        })
    }

    async fn kill(&self, handle: &SandboxHandle) -> io::Result<()> {
        self.killed
            .lock()
            .unwrap()
            .push(handle.container_name.clone());
        if self.kill_fails {
            Err(io::Error::new(io::ErrorKind::Other, "no such container"))
        } else {
            Ok(())
        }
    }
}

struct Recorder(Arc<Mutex<Vec<u8>>>);

impl AsyncWrite for Recorder {
    fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
