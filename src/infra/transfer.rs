//! Artifact transfer
//!
//! Recursive, update-only copy of a built artifact tree into a mounted
//! container filesystem. Permissions and symlinks are preserved; files
//! whose destination is already current (same size, not older) are
//! skipped, which keeps incremental builds down to the delta that the
//! compile actually produced.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::TransferError;

/// Counters for one finished transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub files_copied: u64,
    pub files_skipped: u64,
    pub symlinks: u64,
    pub dirs: u64,
    pub bytes_copied: u64,
}

/// Whether `rel` falls under an exclusion.
///
/// Single-component exclusions match that directory name at any depth
/// (the rsync convention); multi-component exclusions are anchored at
/// the tree root.
fn is_excluded(rel: &Path, excludes: &[PathBuf]) -> bool {
    excludes.iter().any(|exclude| {
        if exclude.components().count() == 1 {
            rel.components()
                .any(|component| component.as_os_str() == exclude.as_os_str())
        } else {
            rel.starts_with(exclude)
        }
    })
}

fn io_err(path: &Path, error: &std::io::Error) -> TransferError {
    TransferError::Io {
        path: path.to_path_buf(),
        error: error.to_string(),
    }
}

/// Copy `source` into `dest`, skipping excluded subtrees and up-to-date
/// files. `dest` must already exist (it is the container mount point).
pub fn sync_tree(
    source: &Path,
    dest: &Path,
    excludes: &[PathBuf],
) -> Result<TransferStats, TransferError> {
    if !source.is_dir() {
        return Err(TransferError::SourceMissing {
            path: source.to_path_buf(),
        });
    }

    let mut stats = TransferStats::default();
    let mut walker = WalkDir::new(source).follow_links(false).min_depth(1).into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| TransferError::Walk {
            error: e.to_string(),
        })?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| TransferError::Walk {
                error: e.to_string(),
            })?
            .to_path_buf();

        if is_excluded(&rel, excludes) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        let target = dest.join(&rel);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            stats.symlinks += 1;
        } else if file_type.is_dir() {
            copy_dir(entry.path(), &target)?;
            stats.dirs += 1;
        } else if copy_file_if_newer(entry.path(), &target)? {
            stats.files_copied += 1;
            stats.bytes_copied += entry.metadata().map(|m| m.len()).unwrap_or(0);
        } else {
            stats.files_skipped += 1;
        }
    }

    tracing::debug!(
        "transfer: {} copied, {} up to date, {} symlinks, {} dirs",
        stats.files_copied,
        stats.files_skipped,
        stats.symlinks,
        stats.dirs
    );
    Ok(stats)
}

fn copy_symlink(source: &Path, target: &Path) -> Result<(), TransferError> {
    let link = fs::read_link(source).map_err(|e| io_err(source, &e))?;
    if target.symlink_metadata().is_ok() {
        fs::remove_file(target).map_err(|e| io_err(target, &e))?;
    }
    symlink(&link, target).map_err(|e| io_err(target, &e))?;
    Ok(())
}

fn copy_dir(source: &Path, target: &Path) -> Result<(), TransferError> {
    // A plain file in the way of a directory is stale output.
    if let Ok(meta) = target.symlink_metadata() {
        if !meta.is_dir() {
            fs::remove_file(target).map_err(|e| io_err(target, &e))?;
        }
    }
    fs::create_dir_all(target).map_err(|e| io_err(target, &e))?;
    let perms = fs::metadata(source).map_err(|e| io_err(source, &e))?.permissions();
    fs::set_permissions(target, perms).map_err(|e| io_err(target, &e))?;
    Ok(())
}

/// Returns true when the file was actually copied.
fn copy_file_if_newer(source: &Path, target: &Path) -> Result<bool, TransferError> {
    let src_meta = fs::metadata(source).map_err(|e| io_err(source, &e))?;

    if let Ok(dst_meta) = target.symlink_metadata() {
        if dst_meta.is_file() && dst_meta.len() == src_meta.len() {
            if let (Ok(src_time), Ok(dst_time)) = (src_meta.modified(), dst_meta.modified()) {
                if dst_time >= src_time {
                    return Ok(false);
                }
            }
        }
        if dst_meta.is_dir() {
            fs::remove_dir_all(target).map_err(|e| io_err(target, &e))?;
        } else {
            fs::remove_file(target).map_err(|e| io_err(target, &e))?;
        }
    }

    // fs::copy carries permission bits along with the contents.
    fs::copy(source, target).map_err(|e| io_err(target, &e))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn excludes(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_sync_copies_tree() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&src.path().join("bin/cabd"), "elf");
        write(&src.path().join("etc/cab.conf"), "conf");

        let stats = sync_tree(src.path(), dst.path(), &[]).unwrap();
        assert_eq!(stats.files_copied, 2);
        assert_eq!(stats.dirs, 2);
        assert_eq!(fs::read_to_string(dst.path().join("etc/cab.conf")).unwrap(), "conf");
    }

    #[test]
    fn test_sync_is_update_only() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&src.path().join("bin/cabd"), "elf");

        let first = sync_tree(src.path(), dst.path(), &[]).unwrap();
        assert_eq!(first.files_copied, 1);

        let second = sync_tree(src.path(), dst.path(), &[]).unwrap();
        assert_eq!(second.files_copied, 0);
        assert_eq!(second.files_skipped, 1);
    }

    #[test]
    fn test_sync_recopies_changed_size() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&src.path().join("bin/cabd"), "elf");
        sync_tree(src.path(), dst.path(), &[]).unwrap();

        write(&src.path().join("bin/cabd"), "bigger-elf");
        let stats = sync_tree(src.path(), dst.path(), &[]).unwrap();
        assert_eq!(stats.files_copied, 1);
        assert_eq!(
            fs::read_to_string(dst.path().join("bin/cabd")).unwrap(),
            "bigger-elf"
        );
    }

    #[test]
    fn test_sync_preserves_symlinks() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&src.path().join("lib/libcab.so.1"), "so");
        symlink("libcab.so.1", src.path().join("lib/libcab.so")).unwrap();

        let stats = sync_tree(src.path(), dst.path(), &[]).unwrap();
        assert_eq!(stats.symlinks, 1);
        let copied = dst.path().join("lib/libcab.so");
        assert!(copied.symlink_metadata().unwrap().is_symlink());
        assert_eq!(fs::read_link(&copied).unwrap(), PathBuf::from("libcab.so.1"));
    }

    #[test]
    fn test_sync_preserves_permissions() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let script = src.path().join("bin/run.sh");
        write(&script, "#!/bin/sh\n");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        sync_tree(src.path(), dst.path(), &[]).unwrap();
        let mode = fs::metadata(dst.path().join("bin/run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_sync_skips_excluded_subtrees_anywhere() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&src.path().join("web/node_modules/dep/index.js"), "js");
        write(&src.path().join("web/app.js"), "js");

        let stats = sync_tree(src.path(), dst.path(), &excludes(&["node_modules"])).unwrap();
        assert_eq!(stats.files_copied, 1);
        assert!(!dst.path().join("web/node_modules").exists());
        assert!(dst.path().join("web/app.js").exists());
    }

    #[test]
    fn test_sync_anchored_exclude() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&src.path().join("var/cache/drop.bin"), "x");
        write(&src.path().join("other/var/cache/keep.bin"), "x");

        let stats = sync_tree(src.path(), dst.path(), &excludes(&["var/cache"])).unwrap();
        assert_eq!(stats.files_copied, 1);
        assert!(dst.path().join("other/var/cache/keep.bin").exists());
    }

    #[test]
    fn test_sync_missing_source_errors() {
        let dst = TempDir::new().unwrap();
        let result = sync_tree(Path::new("/nonexistent-cab-src"), dst.path(), &[]);
        assert!(matches!(result, Err(TransferError::SourceMissing { .. })));
    }
}
