//! Shell-style name patterns used for exclusions.
//!
//! A pattern is matched against a bare file or folder name, never a path:
//! - `*` matches any run of characters, including none
//! - `?` matches exactly one character
//! - everything else is literal, compared case-insensitively
//!
//! Matching is anchored at both ends, so `*.log` excludes `debug.log` but not
//! `debug.log.old`.

use foldersync_common::SyncError;
use regex::{Regex, RegexBuilder};
use std::ffi::OsStr;
use tracing::debug;

/// A single compiled exclusion pattern
#[derive(Debug, Clone)]
pub struct NamePattern {
    pattern: String,
    regex: Regex,
}

impl NamePattern {
    pub fn compile(pattern: &str) -> Result<Self, SyncError> {
        let body = regex::escape(pattern)
            .replace(r"\*", ".*")
            .replace(r"\?", ".");

        let regex = RegexBuilder::new(&format!("^(?:{})$", body))
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The pattern as it was written
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

/// An ordered set of patterns; a name is excluded when any of them matches
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<NamePattern>,
}

impl PatternSet {
    pub fn compile<I, S>(patterns: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| NamePattern::compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Compiled {} exclusion patterns", patterns.len());
        Ok(Self { patterns })
    }

    pub fn is_excluded(&self, name: &OsStr) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let name = name.to_string_lossy();
        self.patterns.iter().any(|p| p.matches(&name))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamePattern> {
        self.patterns.iter()
    }
}
