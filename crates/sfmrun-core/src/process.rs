//! Subprocess capability used to drive the external SfM binaries.

use std::{
    collections::VecDeque,
    ffi::{OsStr, OsString},
    fmt::{self, Display, Formatter},
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, instrument};

use crate::error::ProcessError;

/// A program and its ordered argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Appends `flag value`.
    pub fn opt(self, flag: &str, value: impl AsRef<OsStr>) -> Self {
        self.arg(flag).arg(value)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Final component of the program path, used to name the process in errors.
    pub fn name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// The argument list as strings, lossy for non UTF-8 paths.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Sees every output line of a running process as it arrives.
pub trait OutputObserver: Send {
    fn on_line(&mut self, stream: OutputStream, line: &str);
}

impl OutputObserver for () {
    fn on_line(&mut self, _stream: OutputStream, _line: &str) {}
}

/// Target of the per-line tool output events, filtered separately from the
/// rest of this module.
pub const TOOL_OUTPUT_TARGET: &str = "sfmrun_core::process::output";

/// Number of trailing lines kept per stream.
pub const TAIL_LINES: usize = 64;

/// Exit code plus the last [`TAIL_LINES`] lines of each stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Default)]
struct Tail(VecDeque<String>);

impl Tail {
    fn push(&mut self, line: String) {
        if self.0.len() == TAIL_LINES {
            self.0.pop_front();
        }
        self.0.push_back(line);
    }

    fn into_string(self) -> String {
        self.0.into_iter().fold(String::new(), |mut out, line| {
            out.push_str(&line);
            out.push('\n');
            out
        })
    }
}

/// Decodes one raw output segment, replacing invalid UTF-8.
fn decode_line(mut segment: Vec<u8>) -> String {
    if segment.last() == Some(&b'\r') {
        segment.pop();
    }
    String::from_utf8_lossy(&segment).into_owned()
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `invocation` to completion. A non-zero exit is an error.
    async fn run(
        &self,
        invocation: &Invocation,
        observer: &mut dyn OutputObserver,
    ) -> Result<ProcessOutput, ProcessError>;
}

#[async_trait]
impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    async fn run(
        &self,
        invocation: &Invocation,
        observer: &mut dyn OutputObserver,
    ) -> Result<ProcessOutput, ProcessError> {
        (**self).run(invocation, observer).await
    }
}

/// Spawns processes with tokio, reading stdout and stderr concurrently.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

#[async_trait]
impl CommandRunner for TokioRunner {
    #[instrument(skip_all, fields(program = %invocation.name()))]
    async fn run(
        &self,
        invocation: &Invocation,
        observer: &mut dyn OutputObserver,
    ) -> Result<ProcessOutput, ProcessError> {
        info!(command = %invocation, "running");
        let program = invocation.name();
        let io_error = |source| ProcessError::Io {
            program: program.clone(),
            source,
        };

        let mut child = tokio::process::Command::new(invocation.program())
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.clone(),
                source,
            })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(io_error(std::io::Error::other("output pipes unavailable")));
        };
        let mut stdout = BufReader::new(stdout).split(b'\n');
        let mut stderr = BufReader::new(stderr).split(b'\n');
        let (mut stdout_tail, mut stderr_tail) = (Tail::default(), Tail::default());
        let (mut stdout_open, mut stderr_open) = (true, true);

        while stdout_open || stderr_open {
            tokio::select! {
                next = stdout.next_segment(), if stdout_open => match next.map_err(io_error)? {
                    Some(segment) => {
                        let line = decode_line(segment);
                        debug!(target: TOOL_OUTPUT_TARGET, stream = "stdout", "{}", line);
                        observer.on_line(OutputStream::Stdout, &line);
                        stdout_tail.push(line);
                    }
                    None => stdout_open = false,
                },
                next = stderr.next_segment(), if stderr_open => match next.map_err(io_error)? {
                    Some(segment) => {
                        let line = decode_line(segment);
                        debug!(target: TOOL_OUTPUT_TARGET, stream = "stderr", "{}", line);
                        observer.on_line(OutputStream::Stderr, &line);
                        stderr_tail.push(line);
                    }
                    None => stderr_open = false,
                },
            }
        }

        let status = child.wait().await.map_err(io_error)?;
        let output = ProcessOutput {
            code: status.code(),
            stdout: stdout_tail.into_string(),
            stderr: stderr_tail.into_string(),
        };
        if !status.success() {
            return Err(ProcessError::Failed {
                program,
                code: output.code,
                stderr: output.stderr,
            });
        }

        debug!(code = ?output.code, "finished");
        Ok(output)
    }
}
