//! Git operations
//!
//! Source-tree bootstrapping for new builds. Driven through the same
//! subprocess seam as the image tool; clone progress goes straight to
//! the terminal.

use std::path::Path;

use crate::error::GitError;
use crate::infra::exec::{Capture, CommandRunner};

/// Clone `repository` (optionally a specific branch) into `dest`.
///
/// Cloning over an existing path is refused rather than merged.
pub fn clone_repository<R: CommandRunner>(
    runner: R,
    repository: &str,
    branch: Option<&str>,
    dest: &Path,
) -> Result<(), GitError> {
    if dest.exists() {
        return Err(GitError::DestinationExists {
            path: dest.to_path_buf(),
        });
    }

    let mut args = vec!["clone".to_string()];
    if let Some(branch) = branch {
        args.push("-b".to_string());
        args.push(branch.to_string());
    }
    args.push(repository.to_string());
    args.push(dest.display().to_string());

    tracing::info!("cloning {repository} into {}", dest.display());
    let out = runner.run("git", &args, Capture::Inherit)?;
    if !out.success() {
        return Err(GitError::CloneFailed { status: out.status });
    }
    Ok(())
}
