//! # External Command Execution
//!
//! Every git invocation (and the `mkdir -p` that precedes a clone) goes
//! through the [`ProcessRunner`] trait, so the synchronization logic can be
//! exercised against a scripted fake without spawning anything.
//!
//! [`SystemRunner`] is the real implementation. It:
//!
//! - spawns the program directly from a [`CommandSpec`] argument list, no
//!   shell involved, so payload-derived strings can never be interpreted as
//!   shell syntax;
//! - sets the working directory on the child only, leaving the current
//!   directory of this process untouched;
//! - points stdout and stderr at the same anonymous temporary file so the
//!   captured output keeps git's interleaving, and drops that file before
//!   returning on every path;
//! - optionally kills the child when a timeout expires.
//!
//! Command lines and output are redacted before they reach the logger.

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::location::{redact_credentials, REDACTED};
use crate::logging::Logger;

/// Interval between child status polls while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A program invocation described as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Literal values that must never be displayed.
    secrets: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            secrets: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Marks `secret` as sensitive: it is masked wherever this command or
    /// its output is displayed.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }

    /// Masks registered secrets and URL credentials in `text`.
    pub fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        for secret in &self.secrets {
            redacted = redacted.replace(secret.as_str(), REDACTED);
        }
        redact_credentials(&redacted).into_owned()
    }

    /// The full argument vector, program first, unredacted.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

/// Renders the command line with secrets masked.
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self.argv().join(" ");
        f.write_str(&self.redact(&line))
    }
}

/// The result of running a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// True only when the child exited with status zero.
    pub success: bool,
    /// Combined stdout and stderr, split into lines.
    pub lines: Vec<String>,
    /// Exit code, when the child exited normally.
    pub status: Option<i32>,
    /// True when the child was killed because the timeout expired.
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn succeeded(lines: Vec<String>) -> Self {
        Self {
            success: true,
            lines,
            status: Some(0),
            timed_out: false,
        }
    }

    pub fn failed(status: Option<i32>, lines: Vec<String>) -> Self {
        Self {
            success: false,
            lines,
            status,
            timed_out: false,
        }
    }
}

/// Runs external commands - allows scripting in tests
pub trait ProcessRunner: Send + Sync {
    /// Runs `command` to completion.
    ///
    /// Never fails: a command that cannot be spawned is reported as an
    /// unsuccessful [`CommandOutput`] whose lines describe the problem.
    fn run(&self, command: &CommandSpec) -> CommandOutput;
}

/// Spawns real processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
    logger: Logger,
}

impl SystemRunner {
    pub fn new(logger: Logger) -> Self {
        Self {
            timeout: None,
            logger,
        }
    }

    /// Kills commands that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn execute(&self, command: &CommandSpec) -> Result<CommandOutput> {
        let mut capture = tempfile::tempfile()?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::from(capture.try_clone()?))
            .stderr(Stdio::from(capture.try_clone()?));
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| Error::Execution {
            command: command.to_string(),
            message: e.to_string(),
        })?;
        // The Command still owns write handles to the capture file.
        drop(cmd);

        let (status, timed_out) = self.wait(child)?;
        let lines = read_lines(&mut capture)?;

        Ok(CommandOutput {
            success: !timed_out && status.success(),
            lines,
            status: status.code(),
            timed_out,
        })
    }

    fn wait(&self, mut child: Child) -> Result<(ExitStatus, bool)> {
        let Some(timeout) = self.timeout else {
            return Ok((child.wait()?, false));
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok((status, false));
            }
            if started.elapsed() >= timeout {
                // The child may exit between the poll and the kill.
                let _ = child.kill();
                return Ok((child.wait()?, true));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &CommandSpec) -> CommandOutput {
        self.logger
            .debug(format_args!("Executing command: '{}'", command));

        let mut output = match self.execute(command) {
            Ok(output) => output,
            Err(e) => CommandOutput::failed(None, vec![e.to_string()]),
        };
        if output.timed_out {
            if let Some(timeout) = self.timeout {
                output
                    .lines
                    .push(format!("killed after exceeding the {:?} timeout", timeout));
            }
        }

        let shown: Vec<String> = output.lines.iter().map(|l| command.redact(l)).collect();
        if output.success {
            self.logger
                .debug(format_args!("Command output: {:?}", shown));
        } else {
            self.logger.error(format_args!(
                "Command '{}' didn't exit properly. Full output: {:?}",
                command, shown
            ));
        }

        output
    }
}

fn read_lines(capture: &mut File) -> Result<Vec<String>> {
    capture.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    capture.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}
