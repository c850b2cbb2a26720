use crate::context::SyncContext;
use crate::operation::{Operation, Outcome};
use foldersync_common::SyncError;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Runs an operation tree on the current rayon pool.
///
/// Every operation becomes its own task inside one `rayon::scope`. Entering a
/// folder spawns its children into the same scope, so the whole tree fans
/// out without a breadth limit while the scope still joins every task before
/// [`Executor::execute`] returns. Failures are recorded and never stop
/// unrelated tasks.
pub struct Executor<'a> {
    ctx: &'a SyncContext,
    failures: Mutex<Vec<SyncError>>,
}

impl<'a> Executor<'a> {
    pub fn new(ctx: &'a SyncContext) -> Self {
        Self {
            ctx,
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Execute `root` and everything it expands into; returns the failures
    pub fn execute(self, root: Operation) -> Vec<SyncError> {
        rayon::scope(|scope| self.spawn(scope, root));

        self.failures
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn<'s>(&'s self, scope: &rayon::Scope<'s>, op: Operation) {
        scope.spawn(move |scope| self.run(scope, op));
    }

    fn run<'s>(&'s self, scope: &rayon::Scope<'s>, op: Operation) {
        debug!(
            "Executing {} on {}",
            op.kind_name(),
            op.target_path().display()
        );

        match op.perform(self.ctx) {
            Ok(Outcome::Expanded(children)) => {
                for child in children {
                    match child {
                        Ok(op) => self.spawn(scope, op),
                        Err(err) => self.record(err),
                    }
                }
            }
            Ok(Outcome::Copied { .. } | Outcome::FileDeleted | Outcome::FolderDeleted) => {}
            Err(err) => self.record(err),
        }
    }

    fn record(&self, err: SyncError) {
        warn!("{}", err);
        self.ctx.stats.failed();
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(err);
    }
}
