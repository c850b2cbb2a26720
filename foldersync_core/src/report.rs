//! Where progress lines go.
//!
//! Operations never print directly; they hand a [`SyncEvent`] to a
//! [`Reporter`]. Implementations must be safe to call from many workers at
//! once and must emit each event as one uninterrupted line.

use foldersync_common::SyncEvent;
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::debug;

pub trait Reporter: Send + Sync {
    fn report(&self, event: &SyncEvent);
}

impl<F> Reporter for F
where
    F: Fn(&SyncEvent) + Send + Sync,
{
    fn report(&self, event: &SyncEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Writes one line per event to the process console
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    stream: Stream,
}

impl ConsoleReporter {
    pub fn stdout() -> Self {
        Self {
            stream: Stream::Stdout,
        }
    }

    /// Used when stdout is reserved for machine-readable output
    pub fn stderr() -> Self {
        Self {
            stream: Stream::Stderr,
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: &SyncEvent) {
        // The lock is held for the whole line so concurrent workers never interleave.
        let written = match self.stream {
            Stream::Stdout => write_line(&mut std::io::stdout().lock(), event),
            Stream::Stderr => write_line(&mut std::io::stderr().lock(), event),
        };
        if let Err(e) = written {
            debug!("Failed to write progress line \"{}\": {}", event, e);
        }
    }
}

fn write_line(out: &mut impl Write, event: &SyncEvent) -> io::Result<()> {
    writeln!(out, "{}", event)?;
    out.flush()
}

/// Collects events in memory, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<SyncEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Events excluding verbose diagnostics, i.e. the actions taken
    pub fn actions(&self) -> Vec<SyncEvent> {
        self.events()
            .into_iter()
            .filter(|e| !e.is_diagnostic())
            .collect()
    }

    /// Rendered log lines, sorted so concurrent runs compare deterministically
    pub fn sorted_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.events().iter().map(ToString::to_string).collect();
        lines.sort();
        lines
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: &SyncEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: &SyncEvent) {}
}
