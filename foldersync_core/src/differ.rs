//! Pairwise comparison of one source folder against one target folder.
//!
//! [`diff_folder`] lists both folders once and returns a [`FolderDiff`], an
//! iterator that decides what to do with each name only when it is pulled.
//! Nothing is cached between traversals: every `EnterFolder` lists the live
//! filesystem again.

use crate::context::SyncContext;
use crate::operation::{create_folder, Operation};
use crate::pattern::PatternSet;
use foldersync_common::{EntryInfo, EntryKind, SyncError};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Names compare case-insensitively where the usual filesystems do
const CASE_INSENSITIVE_NAMES: bool = cfg!(any(windows, target_os = "macos"));

/// Key under which a directory entry is matched against its counterpart
pub(crate) fn name_key(name: &OsStr) -> OsString {
    if CASE_INSENSITIVE_NAMES {
        OsString::from(name.to_string_lossy().to_lowercase())
    } else {
        name.to_os_string()
    }
}

type NameIndex = BTreeMap<OsString, EntryInfo>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Conflicts,
    Files,
    StaleFiles,
    Folders,
    StaleFolders,
    Done,
}

/// Lazily produced operations for one source/target folder pair
pub struct FolderDiff<'a> {
    ctx: &'a SyncContext,
    target: PathBuf,
    conflicts: Vec<SyncError>,
    source_files: NameIndex,
    target_files: NameIndex,
    source_folders: NameIndex,
    target_folders: NameIndex,
    stage: Stage,
}

/// Compare `source` with `target` and return the operations needed to bring
/// `target` up to date.
///
/// `target` is created right away when missing, before any child operation
/// exists. A target that cannot be listed because it is absent (dry-run)
/// counts as empty.
pub fn diff_folder<'a>(
    ctx: &'a SyncContext,
    source: &Path,
    target: &Path,
) -> Result<FolderDiff<'a>, SyncError> {
    create_folder(ctx, target)?;

    let source_entries = ctx
        .fs
        .read_dir(source)
        .map_err(|e| SyncError::Enumeration {
            path: source.to_path_buf(),
            source: e,
        })?;

    let target_entries = match ctx.fs.read_dir(target) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            return Err(SyncError::Enumeration {
                path: target.to_path_buf(),
                source: e,
            })
        }
    };

    let config = &ctx.config;
    let (source_files, source_folders) =
        index_entries(source_entries, config.file_excludes(), config.folder_excludes());
    let (target_files, target_folders) =
        index_entries(target_entries, config.file_excludes(), config.folder_excludes());

    debug!(
        "Diffing {} ({} files, {} folders) against {} ({} files, {} folders)",
        source.display(),
        source_files.len(),
        source_folders.len(),
        target.display(),
        target_files.len(),
        target_folders.len()
    );

    let mut diff = FolderDiff {
        ctx,
        target: target.to_path_buf(),
        conflicts: Vec::new(),
        source_files,
        target_files,
        source_folders,
        target_folders,
        stage: Stage::Conflicts,
    };
    diff.extract_conflicts();
    Ok(diff)
}

/// Split a listing into file and folder indexes, dropping excluded names
fn index_entries(
    entries: Vec<EntryInfo>,
    file_excludes: &PatternSet,
    folder_excludes: &PatternSet,
) -> (NameIndex, NameIndex) {
    let mut files = NameIndex::new();
    let mut folders = NameIndex::new();

    for entry in entries {
        let (index, excludes) = match entry.kind {
            EntryKind::File => (&mut files, file_excludes),
            EntryKind::Folder => (&mut folders, folder_excludes),
        };
        if excludes.is_excluded(&entry.name) {
            continue;
        }
        index.insert(name_key(&entry.name), entry);
    }

    (files, folders)
}

impl<'a> FolderDiff<'a> {
    /// Pull out names that are a file on one side and a folder on the other.
    ///
    /// Neither side of such a name is touched; each becomes one error.
    fn extract_conflicts(&mut self) {
        let file_vs_folder: Vec<OsString> = self
            .source_files
            .keys()
            .filter(|key| self.target_folders.contains_key(*key))
            .cloned()
            .collect();
        let folder_vs_file: Vec<OsString> = self
            .source_folders
            .keys()
            .filter(|key| self.target_files.contains_key(*key))
            .cloned()
            .collect();

        for key in file_vs_folder {
            if let (Some(source), Some(target)) = (
                self.source_files.remove(&key),
                self.target_folders.remove(&key),
            ) {
                self.conflicts.push(conflict(source, target));
            }
        }
        for key in folder_vs_file {
            if let (Some(source), Some(target)) = (
                self.source_folders.remove(&key),
                self.target_files.remove(&key),
            ) {
                self.conflicts.push(conflict(source, target));
            }
        }
    }

    fn compare_file(&mut self, key: &OsStr, source: EntryInfo) -> Option<Operation> {
        let target_path = self.target.join(&source.name);
        self.ctx.trace_compare(&source.path, target_path.clone());

        let needs_copy = match self.target_files.remove(key) {
            None => true,
            // Strictly newer only: equal timestamps are treated as up to date
            Some(existing) => source.modified > existing.modified,
        };

        needs_copy.then(|| Operation::CopyFile {
            source: source.path,
            target: target_path,
        })
    }

    fn enter_folder(&mut self, key: &OsStr, source: EntryInfo) -> Operation {
        let target_path = self.target.join(&source.name);
        self.ctx.trace_compare(&source.path, target_path.clone());
        self.target_folders.remove(key);

        Operation::EnterFolder {
            source: source.path,
            target: target_path,
        }
    }
}

fn conflict(source: EntryInfo, target: EntryInfo) -> SyncError {
    SyncError::Conflict {
        source_path: source.path,
        source_kind: source.kind,
        target: target.path,
        target_kind: target.kind,
    }
}

impl Iterator for FolderDiff<'_> {
    type Item = Result<Operation, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stage {
                Stage::Conflicts => match self.conflicts.pop() {
                    Some(err) => return Some(Err(err)),
                    None => self.stage = Stage::Files,
                },
                Stage::Files => match self.source_files.pop_first() {
                    Some((key, source)) => {
                        if let Some(op) = self.compare_file(&key, source) {
                            return Some(Ok(op));
                        }
                    }
                    None => self.stage = Stage::StaleFiles,
                },
                Stage::StaleFiles => {
                    if self.ctx.config.mirror() {
                        if let Some((_, stale)) = self.target_files.pop_first() {
                            return Some(Ok(Operation::DeleteFile { path: stale.path }));
                        }
                    }
                    self.stage = Stage::Folders;
                }
                Stage::Folders => match self.source_folders.pop_first() {
                    Some((key, source)) => return Some(Ok(self.enter_folder(&key, source))),
                    None => self.stage = Stage::StaleFolders,
                },
                Stage::StaleFolders => {
                    if self.ctx.config.mirror() {
                        if let Some((_, stale)) = self.target_folders.pop_first() {
                            return Some(Ok(Operation::DeleteFolder { path: stale.path }));
                        }
                    }
                    self.stage = Stage::Done;
                }
                Stage::Done => return None,
            }
        }
    }
}
