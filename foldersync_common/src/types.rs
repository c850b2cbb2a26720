use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// Whether a directory entry is a file or a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Folder,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Folder => f.write_str("folder"),
        }
    }
}

/// One immediate child of a listed directory
#[derive(Debug, Clone)]
pub struct EntryInfo {
    /// Base name of the entry (no separators)
    pub name: OsString,
    /// Full path of the entry
    pub path: PathBuf,
    pub kind: EntryKind,
    pub modified: SystemTime,
}

/// Something the engine reports while it works.
///
/// The `Display` form is the stable one-line log format written to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    FolderCreated(PathBuf),
    FileCopied { source: PathBuf, target: PathBuf },
    Deleted(PathBuf),
    /// Verbose only
    Comparing { source: PathBuf, target: PathBuf },
    /// Verbose only
    SourceMissing(PathBuf),
}

impl SyncEvent {
    /// Whether the event is a diagnostic line shown only in verbose mode
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, SyncEvent::Comparing { .. } | SyncEvent::SourceMissing(_))
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::FolderCreated(path) => write!(f, "+{}", path.display()),
            SyncEvent::FileCopied { source, target } => {
                write!(f, "={} -> {}", source.display(), target.display())
            }
            SyncEvent::Deleted(path) => write!(f, "-{}", path.display()),
            SyncEvent::Comparing { source, target } => {
                write!(f, "Comparing {} -> {}", source.display(), target.display())
            }
            SyncEvent::SourceMissing(path) => {
                write!(f, "Source folder {} not found.", path.display())
            }
        }
    }
}

/// Counters gathered over one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub folders_created: u64,
    pub files_copied: u64,
    pub bytes_copied: u64,
    pub files_deleted: u64,
    pub folders_deleted: u64,
    pub failures: u64,
    /// The run stopped before doing anything because the source root was absent
    pub source_missing: bool,
}

impl SyncSummary {
    /// Number of filesystem-changing actions performed (or planned, in dry-run)
    pub fn total_operations(&self) -> u64 {
        self.folders_created + self.files_copied + self.files_deleted + self.folders_deleted
    }
}
