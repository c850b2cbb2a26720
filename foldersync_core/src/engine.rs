use crate::context::{resolve_root, CompiledConfig, SyncContext};
use crate::executor::Executor;
use crate::fs::LocalFs;
use crate::operation::Operation;
use crate::report::{ConsoleReporter, Reporter};
use foldersync_common::{FileSystem, SyncConfig, SyncError, SyncEvent, SyncSummary};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one run: counters plus every per-operation failure
#[derive(Debug, Default)]
pub struct SyncReport {
    pub summary: SyncSummary,
    pub failures: Vec<SyncError>,
}

impl SyncReport {
    fn source_missing() -> Self {
        Self {
            summary: SyncSummary {
                source_missing: true,
                ..SyncSummary::default()
            },
            failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Collapse into the summary, or one aggregate error if anything failed
    pub fn into_result(self) -> Result<SyncSummary, SyncError> {
        if self.failures.is_empty() {
            Ok(self.summary)
        } else {
            Err(SyncError::Incomplete(self.failures))
        }
    }
}

/// Mirrors a source folder tree into a destination folder tree
pub struct SyncEngine {
    config: CompiledConfig,
    fs: Arc<dyn FileSystem>,
    reporter: Arc<dyn Reporter>,
}

impl SyncEngine {
    /// Resolve both roots to normalized absolute paths and compile exclusions.
    ///
    /// Nothing on disk is touched here.
    pub fn new(mut config: SyncConfig) -> Result<Self, SyncError> {
        config.source = resolve_root(&config.source)?;
        config.destination = resolve_root(&config.destination)?;

        let config = CompiledConfig::compile(config)?;

        Ok(Self {
            config,
            fs: Arc::new(LocalFs::new()),
            reporter: Arc::new(ConsoleReporter::stdout()),
        })
    }

    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &CompiledConfig {
        &self.config
    }

    /// Run to completion and report every outcome.
    ///
    /// A missing source ends the run quietly. Only a destination nested in the
    /// source or a worker pool that cannot be built fail outright; operation
    /// failures are collected in the returned report after all concurrently
    /// running work has finished.
    pub fn run(&self) -> Result<SyncReport, SyncError> {
        let source = self.config.source();
        let destination = self.config.destination();

        if !self.fs.is_dir(source) {
            warn!("Source folder {} not found", source.display());
            if self.config.verbose() {
                self.reporter
                    .report(&SyncEvent::SourceMissing(source.to_path_buf()));
            }
            return Ok(SyncReport::source_missing());
        }

        self.config.check_layout()?;

        info!(
            "Syncing {} -> {} (mirror: {}, dry run: {})",
            source.display(),
            destination.display(),
            self.config.mirror(),
            self.config.dry_run()
        );

        let ctx = SyncContext::new(
            self.config.clone(),
            Arc::clone(&self.fs),
            Arc::clone(&self.reporter),
        );
        let root = Operation::EnterFolder {
            source: source.to_path_buf(),
            target: destination.to_path_buf(),
        };

        let failures = match self.config.settings().max_threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("foldersync-{}", i))
                    .build()
                    .map_err(|e| SyncError::ThreadPool(e.to_string()))?;
                pool.install(|| Executor::new(&ctx).execute(root))
            }
            None => Executor::new(&ctx).execute(root),
        };

        let summary = ctx.stats.snapshot();
        info!(
            "Sync finished: {} folders created, {} files copied ({} bytes), {} files and {} folders deleted, {} failures",
            summary.folders_created,
            summary.files_copied,
            summary.bytes_copied,
            summary.files_deleted,
            summary.folders_deleted,
            summary.failures
        );

        Ok(SyncReport { summary, failures })
    }

    /// Run and fold the report into a single result
    pub fn sync(&self) -> Result<SyncSummary, SyncError> {
        self.run()?.into_result()
    }
}
