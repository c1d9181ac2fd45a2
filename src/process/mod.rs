//! Running the engine as a child process.
//!
//! [`ProcessRunner`] is the only component that talks to an engine: it feeds
//! a script to the child's standard input, captures standard output and
//! measures wall-clock time until the child exits.

mod deadline;
mod scratch;

use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::config::HarnessConfig;
use crate::error::HarnessError;

pub use deadline::Deadline;
pub use scratch::ScratchFile;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Whether `path` names a regular file the harness may execute.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => has_exec_bit(&meta),
        _ => false,
    }
}

#[cfg(unix)]
fn has_exec_bit(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_exec_bit(_meta: &fs::Metadata) -> bool {
    true
}

/// Where the child's standard input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Closed immediately
    Empty,
    /// Written through a pipe, then closed
    Text(String),
    /// Redirected from a file
    File(PathBuf),
}

/// A fully described engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    input: Input,
}

impl Invocation {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
            input: Input::Empty,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    #[must_use]
    pub fn stdin_text(mut self, text: impl Into<String>) -> Self {
        self.input = Input::Text(text.into());
        self
    }

    #[must_use]
    pub fn stdin_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Input::File(path.into());
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    #[must_use]
    pub fn input(&self) -> &Input {
        &self.input
    }

    /// File redirected to standard input, if any.
    #[must_use]
    pub fn stdin_path(&self) -> Option<&Path> {
        match &self.input {
            Input::File(path) => Some(path),
            _ => None,
        }
    }
}

/// Captured output and timing of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub elapsed: Duration,
    /// Exit code, `None` when the child was terminated by a signal
    pub exit_code: Option<i32>,
}

impl ExecutionResult {
    /// Elapsed wall-clock time in fractional seconds.
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Executes engine invocations.
///
/// Implemented by [`ProcessRunner`] for real subprocesses; tests substitute
/// scripted fakes.
pub trait EngineRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult, HarnessError>;

    /// Run `program` with `stdin` as its whole standard input and return its output.
    fn run_text(&self, program: &Path, stdin: &str) -> Result<String, HarnessError> {
        let invocation = Invocation::new(program).stdin_text(stdin);
        self.run(&invocation).map(|result| result.stdout)
    }
}

impl<R: EngineRunner + ?Sized> EngineRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult, HarnessError> {
        (**self).run(invocation)
    }
}

/// Runs invocations as real child processes, one at a time.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        ProcessRunner { timeout }
    }

    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.timeout)
    }
}

impl EngineRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecutionResult, HarnessError> {
        let program = invocation.program();
        if !is_executable(program) {
            return Err(HarnessError::ExecutableNotFound {
                path: program.to_path_buf(),
            });
        }

        let stdin = match invocation.input() {
            Input::Empty => Stdio::null(),
            Input::Text(_) => Stdio::piped(),
            Input::File(path) => Stdio::from(File::open(path).map_err(|e| {
                HarnessError::io(format!("opening script {}", path.display()), e)
            })?),
        };

        debug!("running {} {:?}", program.display(), invocation.args());
        let deadline = Deadline::from_limit(self.timeout);
        let start = Instant::now();
        let mut child = Command::new(program)
            .args(invocation.args())
            .stdin(stdin)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        let writer = match invocation.input() {
            Input::Text(text) => Some(feed_stdin(&mut child, text.clone())?),
            _ => None,
        };

        let stdout = match drain_stdout(&mut child, program, deadline) {
            Ok(bytes) => bytes,
            Err(e) => {
                abandon(&mut child);
                return Err(e);
            }
        };
        let status = wait_for_exit(&mut child, program, deadline)?;
        let elapsed = start.elapsed();

        if let Some(writer) = writer {
            let _ = writer.join();
        }
        if !status.success() {
            warn!("{} exited with {status}", program.display());
        }

        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            elapsed,
            exit_code: status.code(),
        })
    }
}

fn feed_stdin(child: &mut Child, text: String) -> Result<JoinHandle<()>, HarnessError> {
    let mut pipe = child
        .stdin
        .take()
        .ok_or_else(|| HarnessError::io("engine stdin", io::ErrorKind::BrokenPipe.into()))?;
    Ok(thread::spawn(move || {
        // The engine may quit before reading everything; a broken pipe is fine.
        if let Err(e) = pipe.write_all(text.as_bytes()) {
            if e.kind() != io::ErrorKind::BrokenPipe {
                warn!("failed to write engine input: {e}");
            }
        }
    }))
}

fn drain_stdout(
    child: &mut Child,
    program: &Path,
    deadline: Option<Deadline>,
) -> Result<Vec<u8>, HarnessError> {
    let mut pipe = child
        .stdout
        .take()
        .ok_or_else(|| HarnessError::io("engine stdout", io::ErrorKind::BrokenPipe.into()))?;
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = pipe.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send(result);
    });

    let received = match deadline {
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        Some(deadline) => rx.recv_timeout(deadline.remaining()),
    };
    match received {
        Ok(result) => result.map_err(|e| HarnessError::io("reading engine output", e)),
        Err(RecvTimeoutError::Timeout) => Err(HarnessError::Timeout {
            program: program.to_path_buf(),
            limit: deadline.map(|d| d.limit()).unwrap_or_default(),
        }),
        Err(RecvTimeoutError::Disconnected) => Err(HarnessError::io(
            "reading engine output",
            io::ErrorKind::UnexpectedEof.into(),
        )),
    }
}

fn wait_for_exit(
    child: &mut Child,
    program: &Path,
    deadline: Option<Deadline>,
) -> Result<ExitStatus, HarnessError> {
    let Some(deadline) = deadline else {
        return child
            .wait()
            .map_err(|e| HarnessError::io("waiting for engine", e));
    };
    loop {
        if let Some(status) = child
            .try_wait()
            .map_err(|e| HarnessError::io("waiting for engine", e))?
        {
            return Ok(status);
        }
        if deadline.is_expired() {
            abandon(child);
            return Err(HarnessError::Timeout {
                program: program.to_path_buf(),
                limit: deadline.limit(),
            });
        }
        thread::sleep(EXIT_POLL_INTERVAL.min(deadline.remaining()));
    }
}

fn abandon(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
