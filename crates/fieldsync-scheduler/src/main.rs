//! fieldsync-scheduler - ingest and list-sync daemon.
//!
//! Runs the per-agency ingest pipeline and the stuck-job sweep on one
//! interval, and the list sync on another. Agencies come from `AGENCIES`
//! (inline JSON array) or `AGENCIES_FILE` (path to the same JSON).

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fieldsync_core::{AgencyConfig, FormsApi};
use fieldsync_db::Database;
use fieldsync_forms::{FormsClient, FormsConfig};
use fieldsync_ingest::{IngestPipeline, PipelineConfig};
use fieldsync_listsync::{SyncConfig, SyncRunner};

/// Default seconds between ingest runs.
const DEFAULT_INGEST_INTERVAL_SECS: u64 = 300;

/// Default seconds between list-sync runs.
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 3600;

fn env_secs(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn load_agencies() -> anyhow::Result<Vec<AgencyConfig>> {
    let raw = if let Ok(path) = std::env::var("AGENCIES_FILE") {
        std::fs::read_to_string(&path)?
    } else {
        std::env::var("AGENCIES")
            .map_err(|_| anyhow::anyhow!("set AGENCIES (inline JSON) or AGENCIES_FILE"))?
    };
    Ok(serde_json::from_str(&raw)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT - "json" or "text" (default: "text")
    //   RUST_LOG   - standard env filter (default: "fieldsync=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fieldsync=debug".into());
    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/fieldsync".to_string());
    let ingest_interval = env_secs("INGEST_INTERVAL_SECS", DEFAULT_INGEST_INTERVAL_SECS);
    let sync_interval = env_secs("SYNC_INTERVAL_SECS", DEFAULT_SYNC_INTERVAL_SECS);

    let agencies = load_agencies()?;
    info!(
        agencies = agencies.len(),
        ingest_interval_secs = ingest_interval,
        sync_interval_secs = sync_interval,
        "Starting fieldsync scheduler"
    );

    let db = Database::connect(&database_url).await?;
    fieldsync_db::MIGRATOR.run(db.pool()).await?;

    let forms: Arc<dyn FormsApi> = Arc::new(FormsClient::new(FormsConfig::from_env()?)?);

    let pipeline = IngestPipeline::new(
        forms.clone(),
        db.equipment.clone(),
        db.jobs.clone(),
        PipelineConfig::from_env(),
    );
    let sync = SyncRunner::new(
        forms,
        db.equipment.clone(),
        db.backups.clone(),
        SyncConfig::from_env(),
    );

    let sync_agencies: Vec<AgencyConfig> = agencies
        .iter()
        .filter(|a| a.list_id.is_some())
        .cloned()
        .collect();
    let _sync_task = tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(sync_interval));
        loop {
            tick.tick().await;
            for agency in &sync_agencies {
                if let Err(e) = sync.run_agency(agency).await {
                    error!(agency = %agency.code, error = %e, "List sync failed");
                }
            }
        }
    });

    let mut tick = tokio::time::interval(Duration::from_secs(ingest_interval));
    loop {
        tick.tick().await;
        for agency in &agencies {
            if let Err(e) = pipeline.run_agency(agency).await {
                error!(agency = %agency.code, error = %e, "Ingest run failed");
            }
        }
        if let Err(e) = pipeline.sweep_stuck_jobs().await {
            error!(error = %e, "Stuck-job sweep failed");
        }
    }
}
