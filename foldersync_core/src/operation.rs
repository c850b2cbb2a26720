use crate::context::SyncContext;
use crate::differ::{diff_folder, FolderDiff};
use foldersync_common::{SyncError, SyncEvent};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A single unit of sync work.
///
/// Every variant carries all the paths it needs, so an operation can be
/// executed on any worker without knowing anything about its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Make sure `target` exists, then diff `source` against it
    EnterFolder { source: PathBuf, target: PathBuf },
    /// Overwrite `target` with `source` and carry over the modification time
    CopyFile { source: PathBuf, target: PathBuf },
    DeleteFile { path: PathBuf },
    /// Remove `path` together with everything beneath it
    DeleteFolder { path: PathBuf },
}

/// What executing an operation produced
pub enum Outcome<'a> {
    /// Child operations of an entered folder, still to be scheduled
    Expanded(FolderDiff<'a>),
    Copied { bytes: u64 },
    FileDeleted,
    FolderDeleted,
}

impl Operation {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Operation::EnterFolder { .. } => "enter-folder",
            Operation::CopyFile { .. } => "copy-file",
            Operation::DeleteFile { .. } => "delete-file",
            Operation::DeleteFolder { .. } => "delete-folder",
        }
    }

    /// The destination-side path this operation acts on
    pub fn target_path(&self) -> &Path {
        match self {
            Operation::EnterFolder { target, .. } | Operation::CopyFile { target, .. } => target,
            Operation::DeleteFile { path } | Operation::DeleteFolder { path } => path,
        }
    }

    /// Perform the filesystem action and report its progress line.
    ///
    /// The line is reported before the action runs. In dry-run mode the line
    /// is still reported and counted but the destination is left alone.
    pub fn perform(self, ctx: &SyncContext) -> Result<Outcome<'_>, SyncError> {
        let dry_run = ctx.config.dry_run();

        match self {
            Operation::EnterFolder { source, target } => {
                diff_folder(ctx, &source, &target).map(Outcome::Expanded)
            }
            Operation::CopyFile { source, target } => {
                ctx.report(SyncEvent::FileCopied {
                    source: source.clone(),
                    target: target.clone(),
                });

                if dry_run {
                    ctx.stats.file_copied(0);
                    return Ok(Outcome::Copied { bytes: 0 });
                }

                let bytes = copy_with_mtime(ctx, &source, &target).map_err(|e| {
                    SyncError::Copy {
                        source_path: source.clone(),
                        target: target.clone(),
                        source: e,
                    }
                })?;

                debug!(
                    "Copied {} bytes from {} to {}",
                    bytes,
                    source.display(),
                    target.display()
                );
                ctx.stats.file_copied(bytes);
                Ok(Outcome::Copied { bytes })
            }
            Operation::DeleteFile { path } => {
                ctx.report(SyncEvent::Deleted(path.clone()));

                if !dry_run {
                    ctx.fs
                        .remove_file(&path)
                        .map_err(|e| SyncError::Delete {
                            path: path.clone(),
                            source: e,
                        })?;
                    debug!("Deleted file {}", path.display());
                }

                ctx.stats.file_deleted();
                Ok(Outcome::FileDeleted)
            }
            Operation::DeleteFolder { path } => {
                ctx.report(SyncEvent::Deleted(path.clone()));

                if !dry_run {
                    ctx.fs
                        .remove_dir_all(&path)
                        .map_err(|e| SyncError::Delete {
                            path: path.clone(),
                            source: e,
                        })?;
                    debug!("Deleted folder {}", path.display());
                }

                ctx.stats.folder_deleted();
                Ok(Outcome::FolderDeleted)
            }
        }
    }
}

fn copy_with_mtime(ctx: &SyncContext, source: &Path, target: &Path) -> std::io::Result<u64> {
    // Sampled before copying: a source modified mid-copy stays newer than the target
    let modified = ctx.fs.modified(source)?;
    let bytes = ctx.fs.copy_file(source, target)?;
    ctx.fs.set_modified(target, modified)?;
    Ok(bytes)
}

/// Create `target` if it is not already a directory, reporting `+target`.
///
/// Runs synchronously before any child of the folder is produced.
pub(crate) fn create_folder(ctx: &SyncContext, target: &Path) -> Result<(), SyncError> {
    if ctx.fs.is_dir(target) {
        return Ok(());
    }

    ctx.report(SyncEvent::FolderCreated(target.to_path_buf()));

    if !ctx.config.dry_run() {
        ctx.fs
            .create_dir_all(target)
            .map_err(|e| SyncError::CreateFolder {
                path: target.to_path_buf(),
                source: e,
            })?;
        debug!("Created folder {}", target.display());
    }

    ctx.stats.folder_created();
    Ok(())
}
