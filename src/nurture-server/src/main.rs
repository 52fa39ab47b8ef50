//! Nurture — learner recovery and milestone messaging engine for the
//! coaching certification platform.
//!
//! Main entry point that initializes the stores, seeds the recovery
//! sequences, and starts the server.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::info;

use nurture_api::{ApiServer, AppState};
use nurture_core::config::AppConfig;
use nurture_engine::{EnrollmentManager, ExitEvaluator, TriggerEvaluator};
use nurture_milestones::MessageLibrary;
use nurture_store::{ActivityStore, EnrollmentStore, SequenceCatalog};

#[derive(Parser, Debug)]
#[command(name = "nurture-server")]
#[command(about = "Learner recovery and milestone messaging engine")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "NURTURE__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "NURTURE__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Shared secret for the scheduler endpoint (overrides config)
    #[arg(long, env = "NURTURE__CRON__SECRET")]
    cron_secret: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nurture=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Nurture starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(secret) = cli.cron_secret {
        config.cron.secret = Some(secret);
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        "Configuration loaded"
    );

    // Stores
    let activity = Arc::new(ActivityStore::new());
    let catalog = Arc::new(SequenceCatalog::new());
    catalog.seed_recovery_sequences();
    let enrollments = Arc::new(EnrollmentStore::new());

    // Engine
    let manager = Arc::new(EnrollmentManager::new(
        catalog.clone(),
        enrollments.clone(),
        activity.clone(),
        &config.recovery,
    ));
    let trigger = Arc::new(TriggerEvaluator::new(
        activity.clone(),
        catalog.clone(),
        manager.clone(),
        config.recovery.clone(),
    ));
    let exit = Arc::new(ExitEvaluator::new(
        activity.clone(),
        catalog.clone(),
        enrollments.clone(),
        manager,
        config.recovery.clone(),
    ));
    let milestones = Arc::new(MessageLibrary::builtin());

    let state = AppState {
        activity,
        catalog,
        enrollments,
        trigger,
        exit,
        milestones,
        cron_secret: config.cron.secret.clone(),
        node_id: config.node_id.clone(),
        start_time: Instant::now(),
    };

    let server = ApiServer::new(config, state);
    server.start_metrics().await?;
    server.start_http().await?;

    Ok(())
}
