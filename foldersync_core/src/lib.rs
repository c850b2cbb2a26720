pub mod context;
pub mod differ;
pub mod engine;
pub mod executor;
pub mod fs;
pub mod operation;
pub mod pattern;
pub mod report;

#[cfg(test)]
mod tests_sync;

pub use context::{resolve_root, CompiledConfig, SyncContext};
pub use differ::{diff_folder, FolderDiff};
pub use engine::{SyncEngine, SyncReport};
pub use executor::Executor;
pub use fs::LocalFs;
pub use operation::{Operation, Outcome};
pub use pattern::{NamePattern, PatternSet};
pub use report::{ConsoleReporter, MemoryReporter, NullReporter, Reporter};
