use crate::SyncError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "foldersync.toml";

/// Everything a single sync run needs.
///
/// Exclusion lists hold the raw glob strings; they are compiled once by the
/// engine before traversal starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
    #[serde(default)]
    pub exclude_files: Vec<String>,
    #[serde(default)]
    pub exclude_folders: Vec<String>,
    /// Delete destination entries that have no counterpart in the source
    #[serde(default)]
    pub mirror: bool,
    #[serde(default)]
    pub verbose: bool,
    /// Report what would happen without touching the destination
    #[serde(default)]
    pub dry_run: bool,
    /// Worker threads for a dedicated pool; `None` runs on the global rayon pool
    #[serde(default)]
    pub max_threads: Option<usize>,
}

impl SyncConfig {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            ..Self::default()
        }
    }

    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Add file exclusion patterns; each item may itself be a `;`-separated list
    pub fn exclude_files<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in patterns {
            self.exclude_files.extend(split_patterns(item.as_ref()));
        }
        self
    }

    /// Add folder exclusion patterns; each item may itself be a `;`-separated list
    pub fn exclude_folders<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in patterns {
            self.exclude_folders.extend(split_patterns(item.as_ref()));
        }
        self
    }

    /// Fill in the defaults from the application config without overriding explicit values
    pub fn apply_defaults(&mut self, app: &AppConfig) {
        for pattern in &app.exclude_files {
            if !self.exclude_files.contains(pattern) {
                self.exclude_files.push(pattern.clone());
            }
        }
        for pattern in &app.exclude_folders {
            if !self.exclude_folders.contains(pattern) {
                self.exclude_folders.push(pattern.clone());
            }
        }
        if self.max_threads.is_none() {
            self.max_threads = app.max_threads;
        }
    }
}

/// Split a `;`-separated pattern list, dropping empty segments.
///
/// Whitespace is part of a pattern: `" a"` only matches a name starting with a space.
pub fn split_patterns(list: &str) -> Vec<String> {
    list.split(';')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A saved source/destination pair that can be run by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProfile {
    pub name: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    #[serde(default)]
    pub exclude_files: Vec<String>,
    #[serde(default)]
    pub exclude_folders: Vec<String>,
    #[serde(default)]
    pub mirror: bool,
}

impl SyncProfile {
    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig::new(&self.source, &self.destination)
            .exclude_files(&self.exclude_files)
            .exclude_folders(&self.exclude_folders)
            .with_mirror(self.mirror)
    }

    pub fn from_sync_config(name: impl Into<String>, config: &SyncConfig) -> Self {
        Self {
            name: name.into(),
            source: config.source.clone(),
            destination: config.destination.clone(),
            exclude_files: config.exclude_files.clone(),
            exclude_folders: config.exclude_folders.clone(),
            mirror: config.mirror,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// File patterns excluded from every run (e.g., "Thumbs.db")
    #[serde(default)]
    pub exclude_files: Vec<String>,

    /// Folder patterns excluded from every run (e.g., ".git")
    #[serde(default)]
    pub exclude_folders: Vec<String>,

    /// Default worker thread count
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,

    /// Saved sync profiles
    #[serde(default)]
    pub profiles: Vec<SyncProfile>,
}

impl AppConfig {
    /// Look up a profile by name (case-insensitive)
    pub fn profile(&self, name: &str) -> Option<&SyncProfile> {
        self.profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Insert a profile, replacing any existing one with the same name
    pub fn upsert_profile(&mut self, profile: SyncProfile) {
        match self
            .profiles
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(&profile.name))
        {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub exists: bool,
    pub portable: bool,
}

pub fn load_config(prefer_portable: bool) -> Result<LoadedConfig, SyncError> {
    let (path, portable) = resolve_config_path(prefer_portable)?;
    let mut loaded = load_config_from(&path)?;
    loaded.portable = portable;
    loaded.config.portable_mode = portable;
    Ok(loaded)
}

/// Load the configuration stored at `path`, or defaults when the file does not exist
pub fn load_config_from(path: &Path) -> Result<LoadedConfig, SyncError> {
    let exists = path.exists();

    let config = if exists {
        let data = fs::read_to_string(path)?;
        toml::from_str(&data).map_err(|e| SyncError::Serialization(e.to_string()))?
    } else {
        AppConfig::default()
    };

    Ok(LoadedConfig {
        config,
        path: path.to_path_buf(),
        exists,
        portable: false,
    })
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data =
        toml::to_string_pretty(config).map_err(|e| SyncError::Serialization(e.to_string()))?;
    fs::write(path, data)?;
    Ok(())
}

fn resolve_config_path(prefer_portable: bool) -> Result<(PathBuf, bool), SyncError> {
    if let Some(portable_path) = portable_config_path() {
        if prefer_portable || portable_path.exists() {
            return Ok((portable_path, true));
        }
    }

    let dirs = ProjectDirs::from("", "foldersync", "foldersync").ok_or_else(|| {
        SyncError::Configuration("Unable to determine config directory".to_string())
    })?;
    Ok((dirs.config_dir().join(CONFIG_FILE_NAME), false))
}

fn portable_config_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
}
