use crate::engine::{SyncEngine, SyncReport};
use crate::fs::LocalFs;
use crate::report::MemoryReporter;
use filetime::{set_file_mtime, FileTime};
use foldersync_common::{EntryInfo, FileSystem, SyncConfig, SyncError, SyncEvent};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Helper struct to manage test directories
struct TestFixture {
    _temp_dir: TempDir,
    source: PathBuf,
    dest: PathBuf,
}

impl TestFixture {
    /// Source exists; destination is left for the test to decide
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("source");
        let dest = temp_dir.path().join("dest");
        fs::create_dir(&source).expect("Failed to create source dir");

        TestFixture {
            _temp_dir: temp_dir,
            source,
            dest,
        }
    }

    /// Create a file with content and a fixed modification time (seconds since epoch)
    fn create_file(&self, base: &Path, rel: &str, content: &str, secs: i64) -> PathBuf {
        let path = base.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&path, content).expect("Failed to write file");
        set_file_mtime(&path, FileTime::from_unix_time(secs, 0)).expect("Failed to set mtime");
        path
    }

    fn source_file(&self, rel: &str, content: &str, secs: i64) -> PathBuf {
        self.create_file(&self.source, rel, content, secs)
    }

    fn dest_file(&self, rel: &str, content: &str, secs: i64) -> PathBuf {
        self.create_file(&self.dest, rel, content, secs)
    }

    fn dest_dir(&self, rel: &str) -> PathBuf {
        let path = self.dest.join(rel);
        fs::create_dir_all(&path).expect("Failed to create directory");
        path
    }

    fn config(&self) -> SyncConfig {
        SyncConfig::new(&self.source, &self.dest)
    }

    fn read_dest(&self, rel: &str) -> String {
        fs::read_to_string(self.dest.join(rel)).expect("Failed to read destination file")
    }
}

fn run(config: SyncConfig) -> (SyncReport, Arc<MemoryReporter>) {
    run_with_fs(config, Arc::new(LocalFs::new()))
}

fn run_with_fs(
    config: SyncConfig,
    fs_impl: Arc<dyn FileSystem>,
) -> (SyncReport, Arc<MemoryReporter>) {
    let reporter = Arc::new(MemoryReporter::new());
    let engine = SyncEngine::new(config)
        .expect("valid configuration")
        .with_filesystem(fs_impl)
        .with_reporter(reporter.clone());
    let report = engine.run().expect("run");
    (report, reporter)
}

/// Local filesystem that fails selected calls
struct FailingFs {
    inner: LocalFs,
    fail_copy: Vec<OsString>,
    fail_list: Vec<PathBuf>,
}

impl FailingFs {
    fn new() -> Self {
        Self {
            inner: LocalFs::new(),
            fail_copy: Vec::new(),
            fail_list: Vec::new(),
        }
    }

    fn fail_copy_of(mut self, name: &str) -> Self {
        self.fail_copy.push(OsString::from(name));
        self
    }

    fn fail_listing_of(mut self, path: PathBuf) -> Self {
        self.fail_list.push(path);
        self
    }
}

impl FileSystem for FailingFs {
    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<EntryInfo>> {
        if self.fail_list.iter().any(|p| p == path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected listing failure",
            ));
        }
        self.inner.read_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path)
    }

    fn copy_file(&self, src: &Path, dest: &Path) -> io::Result<u64> {
        let blocked = src
            .file_name()
            .is_some_and(|name| self.fail_copy.iter().any(|f| f == name));
        if blocked {
            return Err(io::Error::other("injected copy failure"));
        }
        self.inner.copy_file(src, dest)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.inner.modified(path)
    }

    fn set_modified(&self, path: &Path, mtime: SystemTime) -> io::Result<()> {
        self.inner.set_modified(path, mtime)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.inner.remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.remove_dir_all(path)
    }
}

// ============================================================================
// Freshness
// ============================================================================

#[test]
fn test_copies_missing_and_newer_files_only() {
    let fixture = TestFixture::new();
    fixture.source_file("new.txt", "new", 2_000);
    fixture.source_file("newer.txt", "fresh", 3_000);
    fixture.dest_file("newer.txt", "stale", 1_000);
    fixture.source_file("older.txt", "old source", 1_000);
    fixture.dest_file("older.txt", "newer dest", 3_000);
    fixture.source_file("sub/deep.txt", "deep", 2_000);

    let (report, _) = run(fixture.config());

    assert!(report.is_success(), "failures: {:?}", report.failures);
    assert_eq!(fixture.read_dest("new.txt"), "new");
    assert_eq!(fixture.read_dest("newer.txt"), "fresh");
    assert_eq!(fixture.read_dest("older.txt"), "newer dest");
    assert_eq!(fixture.read_dest("sub/deep.txt"), "deep");

    let copied_mtime = fs::metadata(fixture.dest.join("newer.txt"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(
        copied_mtime,
        SystemTime::UNIX_EPOCH + Duration::from_secs(3_000)
    );

    assert_eq!(report.summary.files_copied, 3);
    assert_eq!(report.summary.folders_created, 1);
    assert_eq!(report.summary.bytes_copied, 12);
}

#[test]
fn test_equal_timestamps_never_copy() {
    let fixture = TestFixture::new();
    fixture.source_file("a.txt", "source bytes", 5_000);
    fixture.dest_file("a.txt", "different bytes", 5_000);

    let (report, reporter) = run(fixture.config().with_mirror(true));

    assert_eq!(fixture.read_dest("a.txt"), "different bytes");
    assert_eq!(report.summary.files_copied, 0);
    assert!(reporter.actions().is_empty());
}

#[test]
fn test_destination_root_created_when_missing() {
    let fixture = TestFixture::new();
    fixture.source_file("a.txt", "a", 1_000);

    let (report, reporter) = run(fixture.config());

    assert!(fixture.dest.is_dir());
    assert_eq!(
        reporter.sorted_lines(),
        vec![
            format!("+{}", fixture.dest.display()),
            format!(
                "={} -> {}",
                fixture.source.join("a.txt").display(),
                fixture.dest.join("a.txt").display()
            ),
        ]
    );
    assert_eq!(report.summary.folders_created, 1);
}

// ============================================================================
// Mirror mode
// ============================================================================

#[test]
fn test_mirror_deletes_only_in_mirror_mode() {
    let fixture = TestFixture::new();
    fixture.source_file("a.txt", "a", 1_000);
    fixture.dest_file("a.txt", "a", 1_000);
    fixture.dest_file("b.txt", "b", 1_000);

    let (report, _) = run(fixture.config());
    assert!(fixture.dest.join("b.txt").exists());
    assert_eq!(report.summary.files_deleted, 0);

    let (report, reporter) = run(fixture.config().with_mirror(true));
    assert!(!fixture.dest.join("b.txt").exists());
    assert!(fixture.dest.join("a.txt").exists());
    assert_eq!(report.summary.files_deleted, 1);
    assert_eq!(
        reporter.actions(),
        vec![SyncEvent::Deleted(fixture.dest.join("b.txt"))]
    );
}

#[test]
fn test_mirror_is_idempotent() {
    let fixture = TestFixture::new();
    fixture.source_file("a.txt", "a", 1_000);
    fixture.source_file("docs/readme.md", "readme", 2_000);
    fixture.source_file("docs/img/logo.svg", "<svg/>", 3_000);
    fixture.source_file("empty/.keep", "", 4_000);
    fixture.dest_file("obsolete.txt", "x", 1_000);
    fixture.dest_file("docs/old/notes.txt", "x", 1_000);

    let (first, _) = run(fixture.config().with_mirror(true));
    assert!(first.is_success());
    assert!(first.summary.total_operations() > 0);

    let (second, reporter) = run(fixture.config().with_mirror(true));
    assert!(second.is_success());
    assert_eq!(second.summary.total_operations(), 0);
    assert!(reporter.events().is_empty());
}

#[test]
fn test_mirror_deletes_unmatched_subtree_entirely() {
    let fixture = TestFixture::new();
    fixture.source_file("kept/a.txt", "a", 1_000);
    fixture.dest_file("kept/a.txt", "a", 1_000);
    fixture.dest_file("doomed/keep.tmp", "excluded inside", 1_000);
    fixture.dest_file("doomed/inner/deep.txt", "deep", 1_000);

    let config = fixture
        .config()
        .with_mirror(true)
        .exclude_files(["*.tmp"]);
    let (report, reporter) = run(config);

    assert!(report.is_success());
    assert!(!fixture.dest.join("doomed").exists());
    assert!(fixture.dest.join("kept/a.txt").exists());
    assert_eq!(report.summary.folders_deleted, 1);
    assert_eq!(
        reporter.actions(),
        vec![SyncEvent::Deleted(fixture.dest.join("doomed"))]
    );
}

// ============================================================================
// Exclusions
// ============================================================================

#[test]
fn test_excluded_names_are_never_copied_or_deleted() {
    let fixture = TestFixture::new();
    fixture.source_file("main.rs", "fn main() {}", 2_000);
    fixture.source_file("app.log", "log", 2_000);
    fixture.source_file("sub/trace.LOG", "trace", 2_000);
    fixture.source_file("cache/x.bin", "x", 2_000);
    fixture.dest_file("old.log", "old", 1_000);
    fixture.dest_file("Cache/y.bin", "y", 1_000);

    let config = fixture
        .config()
        .with_mirror(true)
        .exclude_files(["*.log"])
        .exclude_folders(["cache"]);
    let (report, _) = run(config);

    assert!(report.is_success());
    assert!(fixture.dest.join("main.rs").exists());
    assert!(!fixture.dest.join("app.log").exists());
    assert!(!fixture.dest.join("sub/trace.LOG").exists());
    assert!(fixture.dest.join("sub").is_dir());
    assert!(fixture.dest.join("old.log").exists());
    assert!(fixture.dest.join("Cache/y.bin").exists());
    assert!(!fixture.dest.join("cache/x.bin").exists());
    assert_eq!(report.summary.files_deleted, 0);
    assert_eq!(report.summary.folders_deleted, 0);
}

// ============================================================================
// Failure isolation
// ============================================================================

#[test]
fn test_copy_failure_does_not_stop_siblings() {
    let fixture = TestFixture::new();
    fixture.source_file("bad.txt", "bad", 1_000);
    fixture.source_file("good.txt", "good", 1_000);
    fixture.source_file("other/more.txt", "more", 1_000);

    let fs_impl = Arc::new(FailingFs::new().fail_copy_of("bad.txt"));
    let (report, _) = run_with_fs(fixture.config(), fs_impl);

    assert_eq!(fixture.read_dest("good.txt"), "good");
    assert_eq!(fixture.read_dest("other/more.txt"), "more");
    assert!(!fixture.dest.join("bad.txt").exists());

    assert_eq!(report.summary.files_copied, 2);
    assert_eq!(report.summary.failures, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0], SyncError::Copy { .. }));

    match report.into_result() {
        Err(SyncError::Incomplete(failures)) => assert_eq!(failures.len(), 1),
        other => panic!("expected aggregate failure, got {:?}", other),
    }
}

#[test]
fn test_listing_failure_fails_only_that_subtree() {
    let fixture = TestFixture::new();
    fixture.source_file("top.txt", "top", 1_000);
    fixture.source_file("locked/a.txt", "a", 1_000);
    fixture.source_file("open/b.txt", "b", 1_000);

    let fs_impl = Arc::new(FailingFs::new().fail_listing_of(fixture.source.join("locked")));
    let (report, _) = run_with_fs(fixture.config(), fs_impl);

    assert_eq!(fixture.read_dest("top.txt"), "top");
    assert_eq!(fixture.read_dest("open/b.txt"), "b");
    assert!(!fixture.dest.join("locked/a.txt").exists());
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        SyncError::Enumeration { path, .. } if *path == fixture.source.join("locked")
    ));
}

#[test]
fn test_file_folder_collision_is_reported_not_guessed() {
    let fixture = TestFixture::new();
    fs::create_dir_all(fixture.source.join("x")).unwrap();
    fixture.source_file("x/inside.txt", "inside", 1_000);
    fixture.dest_file("x", "a file named x", 1_000);
    fixture.source_file("ok.txt", "ok", 1_000);

    let (report, _) = run(fixture.config().with_mirror(true));

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0], SyncError::Conflict { .. }));
    assert!(fixture.dest.join("x").is_file());
    assert_eq!(fixture.read_dest("x"), "a file named x");
    assert_eq!(fixture.read_dest("ok.txt"), "ok");
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_missing_source_performs_nothing() {
    let fixture = TestFixture::new();
    let missing = fixture.source.join("nope");
    let config = SyncConfig::new(&missing, &fixture.dest).with_verbose(true);

    let (report, reporter) = run(config);

    assert!(report.summary.source_missing);
    assert!(report.is_success());
    assert_eq!(report.summary.total_operations(), 0);
    assert!(!fixture.dest.exists());
    assert_eq!(reporter.events(), vec![SyncEvent::SourceMissing(missing)]);
}

#[test]
fn test_missing_source_is_silent_without_verbose() {
    let fixture = TestFixture::new();
    let config = SyncConfig::new(fixture.source.join("nope"), &fixture.dest);

    let (report, reporter) = run(config);

    assert!(report.summary.source_missing);
    assert!(reporter.events().is_empty());
}

#[test]
fn test_nested_destination_needs_exclusion() {
    let fixture = TestFixture::new();
    fixture.source_file("a.txt", "a", 1_000);
    let nested = fixture.source.join("backup");

    let err = SyncEngine::new(SyncConfig::new(&fixture.source, &nested))
        .expect("roots resolve")
        .run()
        .err()
        .expect("nested destination must be rejected");
    assert!(matches!(err, SyncError::Configuration(_)));
    assert!(!nested.exists());

    let config = SyncConfig::new(&fixture.source, &nested).exclude_folders(["backup"]);
    let (report, _) = run(config);

    assert!(report.is_success());
    assert!(nested.join("a.txt").exists());
    assert!(!nested.join("backup").exists());
}

#[test]
fn test_nested_destination_found_through_parent_components() {
    let fixture = TestFixture::new();
    fixture.source_file("a.txt", "a", 1_000);
    let root = fixture.source.parent().expect("temp root").to_path_buf();
    let winding_source = root.join("elsewhere").join("..").join("source");
    let nested = fixture.source.join("backup");

    let engine =
        SyncEngine::new(SyncConfig::new(&winding_source, &nested)).expect("roots resolve");
    assert_eq!(engine.config().source(), fixture.source.as_path());

    let err = engine.run().err().expect("nested destination must be rejected");
    assert!(matches!(err, SyncError::Configuration(_)));
    assert!(!nested.exists());
}

#[test]
fn test_progress_lines_use_normalized_roots() {
    let fixture = TestFixture::new();
    fixture.source_file("a.txt", "a", 1_000);
    let root = fixture.source.parent().expect("temp root").to_path_buf();
    let config = SyncConfig::new(
        fixture.source.join("."),
        root.join("scratch").join("..").join("dest"),
    );

    let (report, reporter) = run(config);

    assert!(report.is_success());
    assert_eq!(
        reporter.sorted_lines(),
        vec![
            format!("+{}", fixture.dest.display()),
            format!(
                "={} -> {}",
                fixture.source.join("a.txt").display(),
                fixture.dest.join("a.txt").display()
            ),
        ]
    );
    assert!(!root.join("scratch").exists());
}

#[test]
fn test_missing_source_wins_over_nested_destination() {
    let fixture = TestFixture::new();
    let missing = fixture.source.join("nope");
    let nested = missing.join("out");
    let config = SyncConfig::new(&missing, &nested).with_verbose(true);

    let (report, reporter) = run(config);

    assert!(report.summary.source_missing);
    assert!(report.is_success());
    assert!(!nested.exists());
    assert_eq!(reporter.events(), vec![SyncEvent::SourceMissing(missing)]);
}

#[test]
fn test_same_source_and_destination_is_a_no_op() {
    let fixture = TestFixture::new();
    fixture.source_file("a.txt", "a", 1_000);
    fixture.source_file("sub/b.txt", "b", 1_000);

    let config = SyncConfig::new(&fixture.source, &fixture.source).with_mirror(true);
    let (report, reporter) = run(config);

    assert!(report.is_success());
    assert_eq!(report.summary.total_operations(), 0);
    assert!(reporter.events().is_empty());
    assert!(fixture.source.join("sub/b.txt").exists());
}

#[test]
fn test_dry_run_changes_nothing() {
    let fixture = TestFixture::new();
    fixture.source_file("a.txt", "a", 2_000);
    fixture.source_file("sub/b.txt", "b", 2_000);
    fixture.dest_file("stale.txt", "stale", 1_000);
    fixture.dest_dir("stale_dir");

    let (report, reporter) = run(fixture.config().with_mirror(true).with_dry_run(true));

    assert!(report.is_success());
    assert!(!fixture.dest.join("a.txt").exists());
    assert!(!fixture.dest.join("sub").exists());
    assert!(fixture.dest.join("stale.txt").exists());
    assert!(fixture.dest.join("stale_dir").exists());

    assert_eq!(report.summary.files_copied, 2);
    assert_eq!(report.summary.folders_created, 1);
    assert_eq!(report.summary.files_deleted, 1);
    assert_eq!(report.summary.folders_deleted, 1);
    assert_eq!(reporter.actions().len(), 5);
}

#[test]
fn test_dedicated_pool_runs_wide_trees() {
    let fixture = TestFixture::new();
    for dir in 0..8 {
        for file in 0..12 {
            fixture.source_file(&format!("d{dir}/f{file}.txt"), "data", 1_000);
        }
    }

    let (report, reporter) = run(fixture.config().with_max_threads(Some(2)));

    assert!(report.is_success());
    assert_eq!(report.summary.files_copied, 96);
    assert_eq!(report.summary.folders_created, 9);
    assert_eq!(reporter.actions().len(), 105);
    assert!(fixture.dest.join("d7/f11.txt").exists());
}
