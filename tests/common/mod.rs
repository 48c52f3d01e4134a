//! Common test utilities and helpers
//!
//! A scripted stand-in for the image tool, answering every buildah
//! invocation with a plausible success so session-level behavior can be
//! exercised without containers on the host.

use std::path::PathBuf;

use cab::error::ExecError;
use cab::infra::exec::{Capture, CmdOutput, CommandRunner};
use tempfile::TempDir;

/// Answers buildah calls with canned successes.
pub struct ScriptedTool {
    /// Backing directory handed out as the mount point
    pub mount_dir: TempDir,
}

impl ScriptedTool {
    pub fn new() -> Self {
        Self {
            mount_dir: TempDir::new().expect("mount dir"),
        }
    }

    pub fn mount_path(&self) -> PathBuf {
        self.mount_dir.path().to_path_buf()
    }
}

impl CommandRunner for ScriptedTool {
    fn run(
        &self,
        _program: &str,
        args: &[String],
        _capture: Capture,
    ) -> Result<CmdOutput, ExecError> {
        // `buildah unshare buildah <subcmd> ...`
        let subcmd = args.get(2).map(String::as_str).unwrap_or_default();
        let stdout = match subcmd {
            "from" => vec!["demo-working-container".to_string()],
            "mount" => vec![self.mount_dir.path().display().to_string()],
            "commit" => vec!["f00dfeedbeef".to_string()],
            _ => Vec::new(),
        };
        Ok(CmdOutput {
            status: 0,
            stdout,
            stderr: Vec::new(),
        })
    }
}
