use filetime::FileTime;
use foldersync_common::{EntryInfo, EntryKind, FileSystem};
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

/// Local filesystem implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<EntryInfo>> {
        let mut entries = Vec::new();

        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let entry_path = entry.path();

            // Follow symlinks; a dangling link falls back to the link itself
            let meta = match fs::metadata(&entry_path) {
                Ok(meta) => meta,
                Err(_) => match entry.metadata() {
                    Ok(meta) => meta,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        debug!("Entry vanished while listing: {}", entry_path.display());
                        continue;
                    }
                    Err(e) => return Err(e),
                },
            };

            entries.push(EntryInfo {
                name: entry.file_name(),
                path: entry_path,
                kind: if meta.is_dir() {
                    EntryKind::Folder
                } else {
                    EntryKind::File
                },
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        Ok(entries)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn copy_file(&self, src: &Path, dest: &Path) -> io::Result<u64> {
        fs::copy(src, dest)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn set_modified(&self, path: &Path, mtime: SystemTime) -> io::Result<()> {
        filetime::set_file_mtime(path, FileTime::from_system_time(mtime))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }
}
