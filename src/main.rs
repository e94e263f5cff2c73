//! vital-sync CLI
//!
//! Reads health samples, normalizes them and syncs them to a vitals backend.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vital_sync::{
    backend::{ActivityMetric, HttpBackend},
    config::Config,
    connector::{for_platform_with, FixtureBridge, HealthConnector, NoopBridge, PlatformKind, QueryOptions},
    sample::{ConnectorStatus, ReadWindow},
    service::VitalsService,
    summary::summarize,
    sync::StorageMode,
    VERSION,
};

#[derive(Parser)]
#[command(name = "vital-sync")]
#[command(version = VERSION)]
#[command(about = "Health sample acquisition, normalization and backend sync", long_about = None)]
struct Cli {
    /// Health platform to read (healthkit or health-connect); detected when omitted
    #[arg(long, global = true)]
    platform: Option<PlatformKind>,

    /// Read records from a JSON fixture instead of a native health module
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Override the configured backend base URL
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show connector availability and backend reachability
    Status,

    /// Request read access for every category
    Permissions,

    /// Read the rolling window and print a summary
    Read {
        /// Window length in hours (defaults to the configured value)
        #[arg(long)]
        hours: Option<i64>,

        /// Print the full read outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read the rolling window and upload it to the backend
    Sync {
        /// Window length in hours (defaults to the configured value)
        #[arg(long)]
        hours: Option<i64>,

        /// Storage mode (raw, aggregated or local_only)
        #[arg(long)]
        storage_mode: Option<StorageMode>,

        /// User identifier sent with the upload
        #[arg(long)]
        user_id: Option<String>,
    },

    /// Fetch the 24h dashboard from the backend
    Dashboard {
        #[arg(long)]
        user_id: Option<String>,

        /// Activity series to correlate against (steps_per_min or exercise_minutes)
        #[arg(long)]
        metric: Option<ActivityMetric>,
    },

    /// Ask the backend to run spike/activity correlation
    Correlate {
        #[arg(long)]
        user_id: Option<String>,

        #[arg(long)]
        metric: Option<ActivityMetric>,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Run the local dev ingest server
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8001")]
        port: u16,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Set one configuration key
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vital_sync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(url) = &cli.backend_url {
        config.backend.base_url = url.clone();
    }

    match &cli.command {
        Commands::Status => cmd_status(&cli_service(&cli, &config)?, &config).await,
        Commands::Permissions => cmd_permissions(&cli_service(&cli, &config)?).await,
        Commands::Read { hours, json } => {
            cmd_read(&cli_service(&cli, &config)?, &config, *hours, *json).await
        }
        Commands::Sync {
            hours,
            storage_mode,
            user_id,
        } => {
            let service = cli_service(&cli, &config)?;
            let user_id = user_id.as_deref().unwrap_or(&config.user_id);
            let mode = storage_mode.unwrap_or(config.storage_mode);
            cmd_sync(&service, &config, *hours, user_id, mode).await
        }
        Commands::Dashboard { user_id, metric } => {
            let user_id = user_id.as_deref().unwrap_or(&config.user_id);
            cmd_dashboard(&config, user_id, metric.unwrap_or(config.activity_metric)).await
        }
        Commands::Correlate { user_id, metric } => {
            let user_id = user_id.as_deref().unwrap_or(&config.user_id);
            cmd_correlate(&config, user_id, metric.unwrap_or(config.activity_metric)).await
        }
        Commands::Config { action } => cmd_config(action.as_ref()),
        #[cfg(feature = "server")]
        Commands::Serve { port } => cmd_serve(*port).await,
    }
}

/// Build the service for the selected platform and bridge.
fn cli_service(cli: &Cli, config: &Config) -> anyhow::Result<VitalsService<HttpBackend>> {
    let platform = cli
        .platform
        .or_else(PlatformKind::detect)
        .unwrap_or(PlatformKind::HealthKit);
    let options = QueryOptions {
        limit: config.query_limit,
        ..QueryOptions::default()
    };

    let connector: Box<dyn HealthConnector> = match &cli.fixture {
        Some(path) => {
            let bridge = FixtureBridge::from_path(path)?;
            for_platform_with(platform, bridge, options)
        }
        None => for_platform_with(platform, NoopBridge, options),
    };

    let backend = HttpBackend::new(config.backend.clone())?;
    Ok(VitalsService::new(connector, backend))
}

fn read_window(config: &Config, hours: Option<i64>) -> anyhow::Result<ReadWindow> {
    Ok(ReadWindow::last_hours(
        Utc::now(),
        hours.unwrap_or(config.window_hours),
    )?)
}

async fn cmd_status(service: &VitalsService<HttpBackend>, config: &Config) -> anyhow::Result<()> {
    println!("vital-sync v{VERSION}");
    println!();

    let platform = service.connector().platform();
    match service.connector_status().await {
        ConnectorStatus::Available => println!("{}: available ✓", platform.display_name()),
        ConnectorStatus::Unavailable { reason } => {
            println!("{}: unavailable ✗ ({reason})", platform.display_name())
        }
    }

    println!();
    println!("Backend: {}", config.backend.base_url);
    match service.pipeline().backend().test_connection().await {
        Ok(true) => println!("  Connection: OK"),
        Ok(false) => println!("  Connection: health check failed"),
        Err(e) => println!("  Connection: {e}"),
    }
    println!("  Client ID: {}", service.pipeline().backend().client_id());
    println!();
    println!("User: {}", config.user_id);
    println!("Storage mode: {}", config.storage_mode);
    Ok(())
}

async fn cmd_permissions(service: &VitalsService<HttpBackend>) -> anyhow::Result<()> {
    let outcome = service.request_permissions().await;
    if outcome.granted {
        println!("Access granted for all categories.");
    } else {
        println!(
            "Access not granted: {}",
            outcome.reason.as_deref().unwrap_or("unknown reason")
        );
        if !outcome.granted_categories.is_empty() {
            let granted: Vec<&str> = outcome.granted_categories.iter().map(|c| c.as_str()).collect();
            println!("  Granted: {}", granted.join(", "));
        }
    }
    Ok(())
}

async fn cmd_read(
    service: &VitalsService<HttpBackend>,
    config: &Config,
    hours: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    let window = read_window(config, hours)?;
    let outcome = service.read_last_24h(&window).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if let Some(reason) = &outcome.unavailable {
        println!("Health data unavailable: {reason}");
        return Ok(());
    }

    println!(
        "Read {} samples between {} and {}",
        outcome.samples.len(),
        window.start().format("%Y-%m-%d %H:%M"),
        window.end().format("%Y-%m-%d %H:%M")
    );
    println!();
    for summary in summarize(&outcome.samples) {
        match (summary.mean, summary.min, summary.max) {
            (Some(mean), Some(min), Some(max)) => println!(
                "  {:<18} {:>5}  mean {:>8.2}  min {:>8.2}  max {:>8.2}",
                summary.category.as_str(),
                summary.count,
                mean,
                min,
                max
            ),
            _ => println!("  {:<18} {:>5}", summary.category.as_str(), summary.count),
        }
    }
    Ok(())
}

async fn cmd_sync(
    service: &VitalsService<HttpBackend>,
    config: &Config,
    hours: Option<i64>,
    user_id: &str,
    mode: StorageMode,
) -> anyhow::Result<()> {
    let window = read_window(config, hours)?;
    let outcome = service.sync_window(user_id, mode, &window).await;

    if let Some(reason) = &outcome.read.unavailable {
        println!("Health data unavailable: {reason}");
        println!("Nothing was uploaded.");
        return Ok(());
    }

    match outcome.upload {
        Some(Ok(result)) => {
            println!(
                "Synced {} samples ({mode}): {} uploaded, {} skipped",
                result.total(),
                result.uploaded,
                result.skipped
            );
            Ok(())
        }
        Some(Err(e)) => Err(e).context("upload failed"),
        None => Ok(()),
    }
}

async fn cmd_dashboard(config: &Config, user_id: &str, metric: ActivityMetric) -> anyhow::Result<()> {
    let backend = HttpBackend::new(config.backend.clone())?;
    let dashboard = backend.dashboard_24h(user_id, metric).await?;

    println!("Dashboard for {user_id}");
    println!("  Window: {} .. {}", dashboard.window.start, dashboard.window.end);
    for name in dashboard.series.keys() {
        println!("  {:<18} {:>5} points", name, dashboard.series_len(name));
    }
    println!("  Correlations: {}", dashboard.correlations.len());
    Ok(())
}

async fn cmd_correlate(config: &Config, user_id: &str, metric: ActivityMetric) -> anyhow::Result<()> {
    let backend = HttpBackend::new(config.backend.clone())?;
    let created = backend.run_correlation(user_id, metric).await?;
    println!("Correlation run for {user_id} ({}): {created} event(s) created", metric.as_str());
    Ok(())
}

fn cmd_config(action: Option<&ConfigAction>) -> anyhow::Result<()> {
    match action {
        None | Some(ConfigAction::Show) => {
            let config = Config::load()?;
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file: {:?}", Config::config_path());
            println!();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Some(ConfigAction::Set { key, value }) => {
            let mut config = Config::load()?;
            config.set(key, value)?;
            config.save()?;
            println!("Set {key} = {value}");
        }
    }
    Ok(())
}

#[cfg(feature = "server")]
async fn cmd_serve(port: u16) -> anyhow::Result<()> {
    use std::sync::{Arc, Mutex};
    use vital_sync::server::{run, SampleStore, ServerConfig};

    let (addr, shutdown_tx) = run(ServerConfig::new(port), Arc::new(SampleStore::new())).await?;
    println!("Dev ingest server listening on http://{addr}");
    println!("Press Ctrl+C to stop");

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let stop_tx = Mutex::new(Some(stop_tx));
    ctrlc::set_handler(move || {
        if let Ok(mut guard) = stop_tx.lock() {
            if let Some(tx) = guard.take() {
                let _ = tx.send(());
            }
        }
    })
    .context("error setting Ctrl+C handler")?;

    let _ = stop_rx.await;
    println!();
    println!("Stopping server...");
    let _ = shutdown_tx.send(());
    Ok(())
}
