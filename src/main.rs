use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use version_pruner::{
    RunCoordinator, RunOutcome, RunSummary,
    config::PrunerConfig,
    db::DbPool,
    observability, range,
    retention::start_retention_worker,
};

/// CLI arguments for the version pruner
#[derive(Parser, Debug)]
#[command(version, about = "Rule-driven pruning of historical item versions", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./version-pruner.toml, then
    /// ~/.config/version-pruner/version-pruner.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run a single prune pass and exit (default)
    Run {
        /// Item id or path to start from, overriding `pruner.root`
        #[arg(short, long)]
        root: Option<String>,
        /// Log what would be removed without changing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Run prune passes every `pruner.interval_hours` until interrupted
    Schedule,
    /// Run database migrations and exit
    Migrate,
    /// Initialize a new configuration file
    Init {
        /// Path to create the config file (defaults to
        /// ~/.config/version-pruner/version-pruner.toml)
        #[arg(short, long)]
        output: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Print the compact name of a set of version numbers, e.g. `1-3_5`
    Encode {
        #[arg(required = true)]
        versions: Vec<u32>,
    },
    /// Expand a compact version-set name back into version numbers
    Decode { name: String },
}

const CONFIG_FILE_NAME: &str = "version-pruner.toml";

/// Starting point for `init`.
fn default_config_toml() -> &'static str {
    r#"# Version Pruner Configuration

# Database holding the content and archive tables
[database]
type = "sqlite"
path = "~/.local/share/version-pruner/content.db"

[pruner]
# Item id or path the walk starts from
root = "/sitecore/content"
# Empty means every language present on an item
languages = []
# "mark_then_dispose" or "archive_or_delete"
policy = "mark_then_dispose"
archive_name = "VersionPruner"
archived_by = "version-pruner"
serialization_root = "~/.local/share/version-pruner/snapshots"
interval_hours = 24

[pruner.safety]
dry_run = true

# Every item is a candidate
[[rules.item_filter]]
name = "all items"
actions = [{ action = "item_valid_for_version_removal" }]

# Keep the newest 10 versions per language
[[rules.version_filter]]
name = "keep last 10"
when = { condition = "version_older_than", versions = 10 }
actions = [{ action = "mark_version_for_removal" }]

[observability.logging]
level = "info"
format = "compact"
"#
}

/// Get the default config directory path.
fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("version-pruner"))
}

/// Get the default config file path.
fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join(CONFIG_FILE_NAME))
}

/// Get the default data directory path.
fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("version-pruner"))
}

/// Resolve the config path: explicit, then the current directory, then the
/// default location.
fn resolve_config_path(explicit_path: Option<&str>) -> Result<PathBuf, String> {
    if let Some(path) = explicit_path {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()));
        }
        return Ok(path);
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Ok(cwd_config);
    }

    if let Some(default_path) = default_config_path()
        && default_path.exists()
    {
        return Ok(default_path);
    }

    Err(format!(
        "No {} found. Create one with `version-pruner init` or pass --config.",
        CONFIG_FILE_NAME
    ))
}

/// Load config and initialize logging, exiting on failure.
fn load_config(explicit_config_path: Option<&str>) -> (PathBuf, PrunerConfig) {
    let config_path = match resolve_config_path(explicit_config_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let config = match PrunerConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "Failed to load config from {}: {}",
                config_path.display(),
                e
            );
            std::process::exit(1);
        }
    };

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Failed to initialize tracing: {}", e);
        std::process::exit(1);
    }

    (config_path, config)
}

/// Connect to the database, running migrations if configured.
async fn connect(config: &PrunerConfig) -> DbPool {
    let db = match DbPool::from_config(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            eprintln!("Error: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db.health_check().await {
        tracing::error!(error = %e, "Database health check failed");
        eprintln!("Error: Database health check failed: {}", e);
        std::process::exit(1);
    }

    if config.database.run_migrations()
        && let Err(e) = db.run_migrations().await
    {
        tracing::error!(error = %e, "Database migrations failed");
        eprintln!("Error: Database migrations failed: {}", e);
        std::process::exit(1);
    }

    db
}

fn build_coordinator(db: &DbPool, config: &PrunerConfig) -> RunCoordinator {
    match RunCoordinator::from_config(db, config) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Init { output, force }) => {
            run_init(output, force);
        }
        Some(Command::Encode { versions }) => {
            println!("{}", range::encode_versions(&versions));
        }
        Some(Command::Decode { name }) => match range::decode_versions(&name) {
            Ok(versions) => {
                let versions: Vec<String> = versions.iter().map(u32::to_string).collect();
                println!("{}", versions.join(" "));
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Some(Command::Migrate) => {
            run_migrate(args.config.as_deref()).await;
        }
        Some(Command::Schedule) => {
            run_schedule(args.config.as_deref()).await;
        }
        Some(Command::Run { root, dry_run }) => {
            run_once(args.config.as_deref(), root, dry_run).await;
        }
        None => {
            run_once(args.config.as_deref(), None, false).await;
        }
    }
}

/// Create a default configuration file.
fn run_init(output: Option<String>, force: bool) {
    let Some(output_path) = output.map(PathBuf::from).or_else(default_config_path) else {
        eprintln!("Could not determine default config path. Please specify one with --output.");
        std::process::exit(1);
    };

    if output_path.exists() && !force {
        eprintln!(
            "Config file already exists: {}\nUse --force to overwrite.",
            output_path.display()
        );
        std::process::exit(1);
    }

    if let Some(parent) = output_path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create directory {}: {}", parent.display(), e);
        std::process::exit(1);
    }

    let data_dir = default_data_dir().unwrap_or_else(|| PathBuf::from("."));
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!(
            "Failed to create data directory {}: {}",
            data_dir.display(),
            e
        );
        std::process::exit(1);
    }

    let config_content = default_config_toml()
        .replace(
            "~/.local/share/version-pruner/content.db",
            &data_dir.join("content.db").to_string_lossy(),
        )
        .replace(
            "~/.local/share/version-pruner/snapshots",
            &data_dir.join("snapshots").to_string_lossy(),
        );

    if let Err(e) = std::fs::write(&output_path, config_content) {
        eprintln!("Failed to write config file: {}", e);
        std::process::exit(1);
    }

    println!("Created config file: {}", output_path.display());
    println!("Database will be stored at: {}", data_dir.display());
    println!();
    println!("The generated config starts in dry-run mode. To try it, run:");
    println!("  version-pruner run --config {}", output_path.display());
}

/// Run database migrations and exit.
///
/// Exits with code 0 on success, 1 on failure.
async fn run_migrate(explicit_config_path: Option<&str>) {
    let (config_path, config) = load_config(explicit_config_path);

    tracing::info!(
        config_file = %config_path.display(),
        "Running database migrations"
    );

    let db = match DbPool::from_config(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            eprintln!("Error: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    match db.run_migrations().await {
        Ok(()) => {
            tracing::info!("Database migrations completed successfully");
        }
        Err(e) => {
            tracing::error!(error = %e, "Database migrations failed");
            eprintln!("Error: Database migrations failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run one prune pass.
///
/// Exits with code 1 if the run fails.
async fn run_once(explicit_config_path: Option<&str>, root: Option<String>, dry_run: bool) {
    let (config_path, mut config) = load_config(explicit_config_path);
    if dry_run {
        config.pruner.safety.dry_run = true;
    }

    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        tracing::warn!(error = %e, "Failed to start metrics exporter");
    }

    tracing::info!(
        config_file = %config_path.display(),
        policy = %config.pruner.policy,
        dry_run = config.pruner.safety.dry_run,
        "Starting prune run"
    );

    let db = connect(&config).await;
    let coordinator = build_coordinator(&db, &config);
    let root = root.unwrap_or_else(|| config.pruner.root.clone());

    match coordinator.run_at(&root).await {
        Ok(RunOutcome::Completed(summary)) => print_summary(&summary),
        Ok(RunOutcome::AlreadyRunning) => {
            println!("A prune run is already in progress.");
        }
        Err(e) => {
            eprintln!("Error: Prune run failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run prune passes on the configured interval until Ctrl+C or SIGTERM.
async fn run_schedule(explicit_config_path: Option<&str>) {
    let (_, config) = load_config(explicit_config_path);

    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        tracing::warn!(error = %e, "Failed to start metrics exporter");
    }

    let db = connect(&config).await;
    let coordinator = Arc::new(build_coordinator(&db, &config));
    let worker = tokio::spawn(start_retention_worker(
        Arc::clone(&coordinator),
        config.pruner.clone(),
    ));

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping prune worker");
    if coordinator.is_running() {
        tracing::warn!("Stopping in the middle of a prune run; the current item is left as-is");
    }
    worker.abort();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_summary(summary: &RunSummary) {
    let prefix = if summary.dry_run { "[DRY RUN] " } else { "" };
    println!("{}Items visited:       {}", prefix, summary.items_visited);
    println!("{}Items matched:       {}", prefix, summary.items_matched);
    println!("{}Items unpublished:   {}", prefix, summary.items_unpublished);
    println!("{}Versions serialized: {}", prefix, summary.versions_serialized);
    println!("{}Versions archived:   {}", prefix, summary.versions_archived);
    println!("{}Versions deleted:    {}", prefix, summary.versions_deleted);
    println!("{}Snapshots written:   {}", prefix, summary.snapshots_written);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PrunerConfig::from_str(default_config_toml()).unwrap();
        assert!(config.pruner.safety.dry_run);
        assert_eq!(config.pruner.root, "/sitecore/content");
        assert_eq!(config.rules.version_filter.len(), 1);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["version-pruner", "run", "--root", "/content", "--dry-run"]);
        assert!(matches!(
            args.command,
            Some(Command::Run { root: Some(ref r), dry_run: true }) if r == "/content"
        ));

        let args = Args::parse_from(["version-pruner", "-c", "p.toml", "encode", "1", "2", "3"]);
        assert_eq!(args.config.as_deref(), Some("p.toml"));
        assert!(matches!(args.command, Some(Command::Encode { ref versions }) if versions == &[1, 2, 3]));
    }
}
