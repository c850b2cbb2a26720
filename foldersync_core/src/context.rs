use crate::pattern::PatternSet;
use crate::report::Reporter;
use foldersync_common::{FileSystem, SyncConfig, SyncError, SyncEvent, SyncSummary};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Sync configuration with its exclusion lists compiled.
///
/// Built once before traversal and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    settings: SyncConfig,
    file_excludes: PatternSet,
    folder_excludes: PatternSet,
}

impl CompiledConfig {
    pub fn compile(settings: SyncConfig) -> Result<Self, SyncError> {
        let file_excludes = PatternSet::compile(&settings.exclude_files)?;
        let folder_excludes = PatternSet::compile(&settings.exclude_folders)?;
        Ok(Self {
            settings,
            file_excludes,
            folder_excludes,
        })
    }

    pub fn settings(&self) -> &SyncConfig {
        &self.settings
    }

    pub fn source(&self) -> &Path {
        &self.settings.source
    }

    pub fn destination(&self) -> &Path {
        &self.settings.destination
    }

    pub fn mirror(&self) -> bool {
        self.settings.mirror
    }

    pub fn verbose(&self) -> bool {
        self.settings.verbose
    }

    pub fn dry_run(&self) -> bool {
        self.settings.dry_run
    }

    pub fn file_excludes(&self) -> &PatternSet {
        &self.file_excludes
    }

    pub fn folder_excludes(&self) -> &PatternSet {
        &self.folder_excludes
    }

    /// Reject a destination nested inside the source, which would make a run
    /// feed on its own output.
    ///
    /// Paths are expected to be resolved with [`resolve_root`] already. A nested
    /// destination is accepted only when one of the folders leading to it is
    /// excluded. Source and destination being the same folder is a no-op run.
    pub fn check_layout(&self) -> Result<(), SyncError> {
        let source = self.source();
        let destination = self.destination();

        let Ok(nested) = destination.strip_prefix(source) else {
            return Ok(());
        };
        if nested.as_os_str().is_empty() {
            return Ok(());
        }

        let excluded = nested
            .components()
            .any(|c| self.folder_excludes.is_excluded(c.as_os_str()));
        if excluded {
            Ok(())
        } else {
            Err(SyncError::Configuration(format!(
                "Destination {} is inside source {}; exclude it with a folder pattern",
                destination.display(),
                source.display()
            )))
        }
    }
}

/// Make `path` absolute and fold `.` and `..` lexically, without touching the disk
pub fn resolve_root(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut resolved = PathBuf::new();

    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                if matches!(resolved.components().next_back(), Some(Component::Normal(_))) {
                    resolved.pop();
                }
            }
            other => resolved.push(other.as_os_str()),
        }
    }

    Ok(resolved)
}

/// Counters updated concurrently by running operations
#[derive(Debug, Default)]
pub struct SyncStats {
    folders_created: AtomicU64,
    files_copied: AtomicU64,
    bytes_copied: AtomicU64,
    files_deleted: AtomicU64,
    folders_deleted: AtomicU64,
    failures: AtomicU64,
}

impl SyncStats {
    pub fn folder_created(&self) {
        self.folders_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn file_copied(&self, bytes: u64) {
        self.files_copied.fetch_add(1, Ordering::Relaxed);
        self.bytes_copied.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn file_deleted(&self) {
        self.files_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn folder_deleted(&self) {
        self.folders_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncSummary {
        SyncSummary {
            folders_created: self.folders_created.load(Ordering::Relaxed),
            files_copied: self.files_copied.load(Ordering::Relaxed),
            bytes_copied: self.bytes_copied.load(Ordering::Relaxed),
            files_deleted: self.files_deleted.load(Ordering::Relaxed),
            folders_deleted: self.folders_deleted.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            source_missing: false,
        }
    }
}

/// Everything an operation needs while it runs; shared read-only across workers
pub struct SyncContext {
    pub config: CompiledConfig,
    pub fs: Arc<dyn FileSystem>,
    pub reporter: Arc<dyn Reporter>,
    pub stats: SyncStats,
}

impl SyncContext {
    pub fn new(
        config: CompiledConfig,
        fs: Arc<dyn FileSystem>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            config,
            fs,
            reporter,
            stats: SyncStats::default(),
        }
    }

    pub(crate) fn report(&self, event: SyncEvent) {
        self.reporter.report(&event);
    }

    /// Emit a `Comparing` diagnostic when running verbose
    pub(crate) fn trace_compare(&self, source: &Path, target: PathBuf) {
        if self.config.verbose() {
            self.report(SyncEvent::Comparing {
                source: source.to_path_buf(),
                target,
            });
        }
    }
}
