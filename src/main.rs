//! replay-optimizer - runs one replay batch from a JSON request file.
//!
//! Usage: `replay-optimizer <request.json>`

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use replay_optimizer::audit::SqliteAuditStore;
use replay_optimizer::llm::HttpGateway;
use replay_optimizer::pricing::PortkeyPricing;
use replay_optimizer::replay::OrchestratorSettings;
use replay_optimizer::{Config, ReplayOrchestrator, ReplayRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: replay-optimizer <request.json>");
    };

    let config = Config::from_env()?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path))?;
    let request: ReplayRequest =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))?;

    let mut gateway = HttpGateway::new(&config.gateway_url, config.gateway_api_key.clone());
    if let Some(models) = &config.allowed_models {
        gateway = gateway.with_allowed_models(models.iter().cloned());
    }

    let mut orchestrator = ReplayOrchestrator::new(
        Arc::new(gateway),
        Arc::new(PortkeyPricing::new(&config.pricing_url)),
    )
    .with_settings(OrchestratorSettings::from(&config));

    if let Some(db) = &config.audit_db {
        let store = SqliteAuditStore::open(db)
            .with_context(|| format!("opening audit store {}", db.display()))?;
        orchestrator = orchestrator.with_audit_sink(Arc::new(store));
        info!("Audit trail enabled at {}", db.display());
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing in-flight calls");
            on_signal.cancel();
        }
    });

    let bundle = orchestrator.run_with_cancel(&request, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&bundle)?);
    Ok(())
}
