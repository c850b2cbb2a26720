use anyhow::{bail, Context, Result};
use clap::Parser;
use foldersync_common::{
    load_config, load_config_from, save_config, AppConfig, LoadedConfig, SyncConfig, SyncProfile,
    SyncSummary,
};
use foldersync_core::{ConsoleReporter, Reporter, SyncEngine, SyncReport};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_CONFIG_ERROR: i32 = 1;
const EXIT_OPERATIONS_FAILED: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "foldersync")]
#[command(author = "FolderSync Contributors")]
#[command(version)]
#[command(about = "Bring a destination folder tree up to date with a source folder", long_about = None)]
#[command(after_help = "Example: foldersync myFolder toFolder --xf *.csproj --xd obj\n\
Legacy switches /xf, /xd, /mirror and /v are accepted as well.")]
struct Cli {
    /// Source folder
    #[arg(required_unless_present = "profile", conflicts_with = "profile")]
    source: Option<PathBuf>,

    /// Destination folder
    #[arg(required_unless_present = "profile", conflicts_with = "profile")]
    destination: Option<PathBuf>,

    /// File name patterns to skip, `;`-separated (can be specified multiple times)
    #[arg(long = "xf", value_name = "PATTERNS")]
    exclude_files: Vec<String>,

    /// Folder name patterns to skip, `;`-separated (can be specified multiple times)
    #[arg(long = "xd", value_name = "PATTERNS")]
    exclude_folders: Vec<String>,

    /// Delete destination entries missing from the source
    #[arg(short, long)]
    mirror: bool,

    /// Print the banner and every comparison
    #[arg(short, long)]
    verbose: bool,

    /// Report what would change without touching the destination
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Worker threads (0 picks one per CPU)
    #[arg(short = 'j', long, value_name = "N")]
    threads: Option<usize>,

    /// Run a profile saved in the configuration file
    #[arg(short, long, value_name = "NAME")]
    profile: Option<String>,

    /// Save this source/destination pair as a named profile before running
    #[arg(long, value_name = "NAME", conflicts_with = "profile")]
    save_profile: Option<String>,

    /// Configuration file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Prefer the configuration file next to the executable
    #[arg(long)]
    portable: bool,

    /// Print a JSON summary on stdout; progress lines move to stderr
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse_from(normalize_legacy_args(std::env::args_os()));

    // Initialize tracing to stderr (so progress lines and JSON own stdout)
    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("Sync failed: {:#}", e);
            EXIT_CONFIG_ERROR
        }
    };
    std::process::exit(code);
}

/// Rewrite the legacy `/xf`, `/xd`, `/mirror` and `/v` switches to their long forms
fn normalize_legacy_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let replacement = arg.to_str().and_then(|s| {
                match s.to_ascii_lowercase().as_str() {
                    "/xf" => Some("--xf"),
                    "/xd" => Some("--xd"),
                    "/mirror" => Some("--mirror"),
                    "/v" => Some("--verbose"),
                    _ => None,
                }
            });
            replacement.map(OsString::from).unwrap_or(arg)
        })
        .collect()
}

fn run(cli: Cli) -> Result<i32> {
    let loaded = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(cli.portable),
    }
    .context("Failed to load configuration")?;

    let mut config = build_sync_config(&cli, &loaded.config)?;

    if let Some(name) = &cli.save_profile {
        save_profile(&loaded, name, &config)?;
    }

    config.apply_defaults(&loaded.config);

    if config.verbose {
        print_banner(&config, cli.json);
    }

    let reporter: Arc<dyn Reporter> = if cli.json {
        Arc::new(ConsoleReporter::stderr())
    } else {
        Arc::new(ConsoleReporter::stdout())
    };

    let engine = SyncEngine::new(config)
        .context("Invalid sync configuration")?
        .with_reporter(reporter);
    let report = engine.run().context("Failed to start sync")?;

    if cli.json {
        let json = build_json_report(engine.config().settings(), &report);
        println!("{}", serde_json::to_string_pretty(&json)?);
    }

    if report.is_success() {
        Ok(EXIT_SUCCESS)
    } else {
        error!("{} operation(s) failed", report.failures.len());
        Ok(EXIT_OPERATIONS_FAILED)
    }
}

/// Combine the selected profile (or the positional folders) with the command line flags
fn build_sync_config(cli: &Cli, app: &AppConfig) -> Result<SyncConfig> {
    let base = match &cli.profile {
        Some(name) => app
            .profile(name)
            .with_context(|| format!("Profile '{}' not found", name))?
            .to_sync_config(),
        None => match (&cli.source, &cli.destination) {
            (Some(source), Some(destination)) => SyncConfig::new(source, destination),
            _ => bail!("Both a source and a destination folder are required"),
        },
    };

    let mirror = base.mirror || cli.mirror;
    Ok(base
        .exclude_files(&cli.exclude_files)
        .exclude_folders(&cli.exclude_folders)
        .with_mirror(mirror)
        .with_verbose(cli.verbose)
        .with_dry_run(cli.dry_run)
        .with_max_threads(cli.threads))
}

fn save_profile(loaded: &LoadedConfig, name: &str, config: &SyncConfig) -> Result<()> {
    let mut app = loaded.config.clone();
    app.upsert_profile(SyncProfile::from_sync_config(name, config));
    save_config(&loaded.path, &app)
        .with_context(|| format!("Failed to save profile to {}", loaded.path.display()))?;
    info!("Saved profile '{}' to {}", name, loaded.path.display());
    Ok(())
}

fn banner_lines(config: &SyncConfig) -> Vec<String> {
    vec![
        format!(
            "Sync Folders {} to {}",
            config.source.display(),
            config.destination.display()
        ),
        format!("Ignoring folders {}", config.exclude_folders.join(";")),
        format!("Ignoring files {}", config.exclude_files.join(";")),
    ]
}

fn print_banner(config: &SyncConfig, to_stderr: bool) {
    for line in banner_lines(config) {
        if to_stderr {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}

#[derive(Serialize)]
struct JsonReport {
    source: String,
    destination: String,
    mirror: bool,
    dry_run: bool,
    summary: SyncSummary,
    failures: Vec<String>,
}

fn build_json_report(config: &SyncConfig, report: &SyncReport) -> JsonReport {
    JsonReport {
        source: path_string(&config.source),
        destination: path_string(&config.destination),
        mirror: config.mirror,
        dry_run: config.dry_run,
        summary: report.summary,
        failures: report.failures.iter().map(|e| e.to_string()).collect(),
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
