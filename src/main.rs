use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tokio_stream::StreamExt as _;
use tracing::{info, warn};

use lakesync::config::{Overrides, SyncConfig};
use lakesync::{flights, report, sync, SyncContext};

#[derive(Parser)]
#[command(
    name = "lakesync",
    about = "Workspace disaster-recovery replication toolkit",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to the config file (default: ./lakesync.toml when present)
    #[arg(long, env = "LAKESYNC_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Hostname of the primary (source) workspace
    #[arg(long, env = "LAKESYNC_SOURCE_HOST", global = true)]
    source_host: Option<String>,

    /// Admin access token for the source workspace
    #[arg(long, env = "LAKESYNC_SOURCE_TOKEN", hide_env_values = true, global = true)]
    source_token: Option<String>,

    /// Hostname of the secondary (target) workspace
    #[arg(long, env = "LAKESYNC_TARGET_HOST", global = true)]
    target_host: Option<String>,

    /// Admin access token for the target workspace
    #[arg(long, env = "LAKESYNC_TARGET_TOKEN", hide_env_values = true, global = true)]
    target_token: Option<String>,

    /// Concurrent jobs per fan-out batch
    #[arg(long, env = "LAKESYNC_WORKERS", global = true)]
    workers: Option<usize>,

    /// Seconds between statement-status polls
    #[arg(long, global = true)]
    poll_backoff: Option<u64>,

    /// Overall deadline for one SQL statement, in seconds
    #[arg(long, global = true)]
    statement_timeout: Option<u64>,

    /// SQL warehouse in the target workspace used for clone/view DDL
    #[arg(long, env = "LAKESYNC_WAREHOUSE_ID", global = true)]
    warehouse_id: Option<String>,

    /// Global metastore id of the source workspace
    #[arg(long, global = true)]
    source_metastore_id: Option<String>,

    /// Global metastore id of the target workspace
    #[arg(long, global = true)]
    target_metastore_id: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LAKESYNC_LOG", global = true)]
    log: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "LAKESYNC_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Write the status records as JSON to this path after the run
    #[arg(long, global = true)]
    write_results: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Replicate external volumes into the target workspace.
    Volumes,
    /// Create schemas present in the source but missing in the target.
    Schemas,
    /// Deep-clone managed tables through Delta Sharing.
    ManagedTables,
    /// Deep-clone external tables, remapping storage locations.
    ExternalTables,
    /// Recreate source views in the target.
    Views,
    /// Reconcile grants on catalogs, schemas, tables, and volumes.
    Grants,
    /// Flight-delay dataset utilities (batch / streaming readers).
    Flights {
        #[command(subcommand)]
        action: FlightsAction,
    },
}

#[derive(Subcommand)]
enum FlightsAction {
    /// Read every CSV file under a directory and print the record count.
    Count { dir: PathBuf },
    /// Stream records from existing and newly arriving CSV files as JSON lines.
    Watch { dir: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The flights utility runs without workspace configuration.
    if let Command::Flights { action } = &args.command {
        let level = args.log.as_deref().unwrap_or("info");
        let _guard = init_tracing(level, args.log_file.as_deref());
        return run_flights(action).await;
    }

    let overrides = Overrides {
        source_host: args.source_host.clone(),
        source_token: args.source_token.clone(),
        target_host: args.target_host.clone(),
        target_token: args.target_token.clone(),
        num_workers: args.workers,
        poll_backoff_secs: args.poll_backoff,
        statement_timeout_secs: args.statement_timeout,
        warehouse_id: args.warehouse_id.clone(),
        source_metastore_id: args.source_metastore_id.clone(),
        target_metastore_id: args.target_metastore_id.clone(),
        log: args.log.clone(),
    };
    let config = SyncConfig::load(args.config.as_deref(), overrides)?;
    let _guard = init_tracing(&config.log, args.log_file.as_deref());

    // Ctrl-C flips the shutdown signal; statement poll loops abort, in-flight
    // HTTP calls complete, and the batch reports whatever it has.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("shutdown requested — finishing in-flight jobs");
            let _ = shutdown_tx.send(true);
        }
    });

    let ctx = SyncContext::new(config, shutdown_rx)?;
    info!(
        source = %ctx.config.source_host,
        target = %ctx.config.target_host,
        workers = ctx.config.num_workers,
        "starting sync"
    );

    let (task, records) = match args.command {
        Command::Volumes => ("volumes", sync::volumes::run(&ctx).await?),
        Command::Schemas => ("schemas", sync::schemas::run(&ctx).await?),
        Command::ManagedTables => ("managed-tables", sync::managed_tables::run(&ctx).await?),
        Command::ExternalTables => ("external-tables", sync::external_tables::run(&ctx).await?),
        Command::Views => ("views", sync::views::run(&ctx).await?),
        Command::Grants => ("grants", sync::permissions::run(&ctx).await?),
        Command::Flights { .. } => unreachable!("handled above"),
    };

    report::print(task, &records);
    if let Some(path) = &args.write_results {
        report::write_json(path, &records)?;
    }
    Ok(())
}

async fn run_flights(action: &FlightsAction) -> Result<()> {
    match action {
        FlightsAction::Count { dir } => {
            let records = flights::read_batch(dir)?;
            println!("{} records in {}", records.len(), dir.display());
        }
        FlightsAction::Watch { dir } => {
            info!(dir = %dir.display(), "watching for flight files — Ctrl-C to stop");
            let mut stream = flights::stream(dir.clone());
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    next = stream.next() => match next {
                        Some(record) => println!("{}", serde_json::to_string(&record)?),
                        None => break,
                    },
                }
            }
        }
    }
    Ok(())
}

/// Initialise tracing; returns the appender guard when logging to a file.
fn init_tracing(
    level: &str,
    log_file: Option<&Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("lakesync.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(level))
                .compact()
                .init();
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(EnvFilter::new(level))
            .with(fmt::layer().compact())
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(level))
            .compact()
            .init();
        None
    }
}
