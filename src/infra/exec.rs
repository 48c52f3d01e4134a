//! Subprocess execution
//!
//! Every external tool (buildah, podman, git) is driven through the
//! [`CommandRunner`] seam so the pipeline can be exercised against an
//! in-process fake. Execution is synchronous and blocking throughout: a
//! call returns when the subprocess exits, and a hung tool hangs the
//! caller.

use std::process::Command;

use crate::error::ExecError;

/// Whether a subprocess's output is captured or inherits our stdio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Capture stdout/stderr for inspection.
    Piped,
    /// Let the subprocess write to our terminal (interactive shells,
    /// long compiles).
    Inherit,
}

/// Exit status plus captured output of one finished subprocess.
#[derive(Debug, Clone, Default)]
pub struct CmdOutput {
    pub status: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// First stdout line, trimmed; tools report created ids this way.
    pub fn first_line(&self) -> Option<&str> {
        self.stdout.first().map(|line| line.trim())
    }

    pub fn stdout_joined(&self) -> String {
        self.stdout.join("\n")
    }

    pub fn stderr_joined(&self) -> String {
        self.stderr.join("\n")
    }
}

/// Seam over subprocess execution.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String], capture: Capture)
        -> Result<CmdOutput, ExecError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(
        &self,
        program: &str,
        args: &[String],
        capture: Capture,
    ) -> Result<CmdOutput, ExecError> {
        (**self).run(program, args, capture)
    }
}

/// Runs commands on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostRunner;

impl CommandRunner for HostRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        capture: Capture,
    ) -> Result<CmdOutput, ExecError> {
        tracing::debug!("exec: {} {}", program, args.join(" "));

        let mut command = Command::new(program);
        command.args(args);

        match capture {
            Capture::Piped => {
                let output = command.output().map_err(|e| ExecError::Launch {
                    program: program.to_string(),
                    error: e.to_string(),
                })?;
                Ok(CmdOutput {
                    status: output.status.code().unwrap_or(-1),
                    stdout: split_lines(&output.stdout),
                    stderr: split_lines(&output.stderr),
                })
            }
            Capture::Inherit => {
                let status = command.status().map_err(|e| ExecError::Launch {
                    program: program.to_string(),
                    error: e.to_string(),
                })?;
                Ok(CmdOutput {
                    status: status.code().unwrap_or(-1),
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                })
            }
        }
    }
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}
