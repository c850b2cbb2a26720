use crate::EntryInfo;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Filesystem abstraction used by the sync engine.
///
/// All paths are absolute. The engine only ever touches the disk through this
/// trait, which lets tests wrap the local implementation and inject failures
/// into individual calls.
pub trait FileSystem: Send + Sync {
    /// Checks if a path exists and is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Lists the immediate children of a directory
    fn read_dir(&self, path: &Path) -> io::Result<Vec<EntryInfo>>;

    /// Create a directory and all parent directories
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Copies a file from src to dest, overwriting dest. Returns bytes copied.
    fn copy_file(&self, src: &Path, dest: &Path) -> io::Result<u64>;

    /// Last modification time of a path
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Set file modification time
    fn set_modified(&self, path: &Path, mtime: SystemTime) -> io::Result<()>;

    /// Removes a file
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Removes a directory and everything beneath it
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}
