//! In-container execution shim.
//!
//! Reads one snippet from stdin, evaluates it in a fresh interpreter and
//! prints the captured output as a JSON array of [`OutputRecord`]s. A new
//! container runs the shim exactly once.

use crate::protocol::{self, OutputRecord};
use anyhow::Context;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::TempDir;
use tracing::debug;

pub const PYTHON_ENV: &str = "PYEXEC_PYTHON";
pub const DEFAULT_PYTHON: &str = "python3";

const CELL_FILE: &str = "cell.py";
const VALUE_FILE: &str = "value.txt";
const ERROR_FILE: &str = "error.txt";
const FIGURE_FILE: &str = "figure.png";

/// Runs inside the interpreter. Takes the scratch directory as its only
/// argument, executes `cell.py` there and leaves side files behind.
const BOOTSTRAP: &str = r#"
import ast
import os
import sys
import traceback
import types

scratch = sys.argv[1]
sys.argv = [""]


def _save(name, text):
    with open(os.path.join(scratch, name), "w", encoding="utf-8") as fh:
        fh.write(text)


with open(os.path.join(scratch, "cell.py"), encoding="utf-8") as fh:
    source = fh.read()

# Snippet globals live in a real __main__ so pickle can find its classes.
_shim = sys.modules["__main__"]
main = types.ModuleType("__main__")
sys.modules["__main__"] = main
namespace = main.__dict__
try:
    tree = ast.parse(source, filename="<cell>", mode="exec")
    tail = None
    if tree.body and isinstance(tree.body[-1], ast.Expr):
        tail = ast.Expression(tree.body.pop().value)
    exec(compile(tree, "<cell>", "exec"), namespace)
    if tail is not None:
        value = eval(compile(tail, "<cell>", "eval"), namespace)
        if value is not None:
            _save("value.txt", str(value))
except BaseException as exc:
    traceback.print_exception(type(exc), exc, exc.__traceback__.tb_next)
    _save("error.txt", "%s: %s" % (type(exc).__name__, exc))
finally:
    plt = sys.modules.get("matplotlib.pyplot")
    if plt is not None:
        try:
            figures = plt.get_fignums()
            if len(figures) == 1:
                plt.figure(figures[0]).savefig(os.path.join(scratch, "figure.png"), format="png")
        finally:
            plt.close("all")
    sys.stdout.flush()
    sys.stderr.flush()
"#;

/// Raw results of one evaluation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Capture {
    pub stdout: String,
    pub stderr: String,
    /// `str` of the final expression, when it was not `None`.
    pub value: Option<String>,
    pub figure: Option<Vec<u8>>,
    /// `"<Type>: <message>"` of an exception raised by the snippet.
    pub error: Option<String>,
    /// Interpreter exit code; `None` if it died from a signal.
    pub exit_code: Option<i32>,
}

impl Capture {
    /// Records in protocol order: stdout, stderr, value, image, raised error.
    pub fn into_records(self) -> Vec<OutputRecord> {
        let mut records = Vec::new();
        if !self.stdout.is_empty() {
            records.push(OutputRecord::Text(self.stdout));
        }
        if !self.stderr.is_empty() {
            records.push(OutputRecord::Error(self.stderr));
        }
        if let Some(value) = self.value {
            records.push(OutputRecord::Text(value));
        }
        if let Some(png) = self.figure {
            records.push(OutputRecord::Image(png));
        }
        match (self.error, self.exit_code) {
            (Some(error), _) => records.push(OutputRecord::Error(error)),
            (None, Some(0)) => {}
            (None, Some(code)) => records.push(OutputRecord::Error(format!(
                "interpreter exited with status {}",
                code
            ))),
            (None, None) => records.push(OutputRecord::Error(
                "interpreter was terminated by a signal".to_string(),
            )),
        }
        records
    }
}

/// One private evaluation context: a scratch directory and the interpreter
/// that will run there. Consumed by [`EvaluationContext::evaluate`].
pub struct EvaluationContext {
    python: String,
    scratch: TempDir,
}

impl EvaluationContext {
    pub fn new(python: impl Into<String>) -> io::Result<Self> {
        let scratch = tempfile::Builder::new().prefix("pyexec-cell-").tempdir()?;
        Ok(Self {
            python: python.into(),
            scratch,
        })
    }

    pub fn evaluate(self, code: &str) -> io::Result<Capture> {
        let dir = self.scratch.path();
        std::fs::write(dir.join(CELL_FILE), code)?;

        debug!(python = %self.python, scratch = ?dir, "Starting interpreter");
        let output = Command::new(&self.python)
            .arg("-c")
            .arg(BOOTSTRAP)
            .arg(dir)
            .env("MPLBACKEND", "Agg")
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        debug!(status = %output.status, "Interpreter exited");

        Ok(Capture {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            value: read_text(&dir.join(VALUE_FILE))?,
            figure: read_optional(&dir.join(FIGURE_FILE))?,
            error: read_text(&dir.join(ERROR_FILE))?,
            exit_code: output.status.code(),
        })
    }
}

fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn read_text(path: &Path) -> io::Result<Option<String>> {
    Ok(read_optional(path)?.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

/// Shim main: stdin → evaluate → JSON array on stdout.
pub fn run() -> anyhow::Result<()> {
    let mut code = String::new();
    io::stdin()
        .read_to_string(&mut code)
        .context("failed to read snippet from stdin")?;

    let python = std::env::var(PYTHON_ENV).unwrap_or_else(|_| DEFAULT_PYTHON.to_string());
    let context = EvaluationContext::new(python).context("failed to create scratch directory")?;
    let capture = context
        .evaluate(&code)
        .context("failed to run the interpreter")?;

    let encoded = protocol::encode(&capture.into_records()).context("failed to encode output")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", encoded)?;
    stdout.flush()?;
    Ok(())
}
