//! External command execution
//!
//! Every side effect on the container runtime goes through [`CommandRunner`]
//! as a structured [`Cmd`]: a program and its argument list, never a shell
//! string. The process-backed runner blocks until the child exits.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed with {}{}", describe_code(.code), stderr_suffix(.stderr))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

/// An external command with its execution options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    ignore_failure: bool,
    capture: bool,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            ignore_failure: false,
            capture: false,
        }
    }

    pub fn docker() -> Self {
        Self::new("docker")
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

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// A non-zero exit is swallowed instead of failing the caller
    pub fn ignore_failure(mut self) -> Self {
        self.ignore_failure = true;
        self
    }

    /// Return stdout to the caller instead of leaving it on the terminal
    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn is_ignorable(&self) -> bool {
        self.ignore_failure
    }

    pub fn is_captured(&self) -> bool {
        self.capture
    }

    /// True when the argument list begins with `prefix`
    pub fn args_start_with(&self, prefix: &[&str]) -> bool {
        self.args.len() >= prefix.len() && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }

    /// Outcome for a run that exited unsuccessfully, honouring `ignore_failure`
    pub fn failure(&self, code: Option<i32>, stderr: impl Into<String>) -> Result<Option<String>, CommandError> {
        let stderr = stderr.into();
        if self.ignore_failure {
            warn!(
                "Ignoring failure of `{}` ({}{})",
                self,
                describe_code(&code),
                stderr_suffix(&stderr)
            );
            return Ok(None);
        }
        Err(CommandError::Failed {
            command: self.to_string(),
            code,
            stderr,
        })
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Runs external commands to completion.
///
/// Returns the captured stdout for captured commands, `None` otherwise or
/// when an ignorable command failed.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    fn run(&self, cmd: &Cmd) -> Result<Option<String>, CommandError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, cmd: &Cmd) -> Result<Option<String>, CommandError> {
        (**self).run(cmd)
    }
}

/// Runs commands as child processes of this one
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, cmd: &Cmd) -> Result<Option<String>, CommandError> {
        info!("Executing: {}", cmd);

        let mut command = Command::new(cmd.program());
        command.args(cmd.get_args());
        if let Some(dir) = cmd.dir() {
            command.current_dir(dir);
        }

        let spawn_error = |source: io::Error| -> Result<Option<String>, CommandError> {
            if cmd.is_ignorable() {
                warn!("Ignoring failure to launch `{}`: {}", cmd, source);
                return Ok(None);
            }
            Err(CommandError::Spawn {
                command: cmd.to_string(),
                source,
            })
        };

        if cmd.is_captured() {
            let output = match command
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output()
            {
                Ok(output) => output,
                Err(e) => return spawn_error(e),
            };

            if output.status.success() {
                return Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()));
            }
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            cmd.failure(output.status.code(), stderr)
        } else {
            let status = match command.status() {
                Ok(status) => status,
                Err(e) => return spawn_error(e),
            };

            if status.success() {
                return Ok(None);
            }
            cmd.failure(status.code(), String::new())
        }
    }
}
