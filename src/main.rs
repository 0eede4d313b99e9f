use anyhow::Result;
use std::sync::Arc;

use fedgrid_aggregator::aggregation::{AggregationRoundEngine, RoundOutcome};
use fedgrid_aggregator::core::{logging, Config, HealthChecker};
use fedgrid_aggregator::ledger::{HttpLedgerGateway, LedgerGateway, LocalKeySigner, TransactionSigner};
use fedgrid_aggregator::reporting::{self, ReportingContext, SyntheticSource};
use fedgrid_aggregator::signature::ScaledCodec;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration; missing required settings abort here
    let config = Config::from_env()?;

    logging::init_logging(&config.reporting.log_level);

    tracing::info!("🚀 FedGrid aggregation service starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Ledger contract: {}", config.ledger.contract_address);

    let signer = Arc::new(LocalKeySigner::from_hex_key(&config.ledger.signer_key)?);
    tracing::info!("Signing identity: {}", signer.address());

    let gateway: Arc<dyn LedgerGateway> =
        Arc::new(HttpLedgerGateway::new(&config.ledger, signer)?);
    let health = HealthChecker::new();

    // Startup connectivity probe
    match gateway.read_global_signature().await {
        Ok(global) => {
            health.set_ledger_reachable(true).await;
            tracing::info!("Connected to ledger, global signature has {} components", global.len());
        }
        Err(e) => {
            health.set_ledger_reachable(false).await;
            tracing::warn!("Ledger not reachable at startup: {}", e);
        }
    }

    // Reporting surface
    let ctx = Arc::new(ReportingContext {
        gateway: gateway.clone(),
        codec: ScaledCodec::new(config.aggregation.scaling_factor),
        contract_address: config.ledger.contract_address.clone(),
        health: health.clone(),
        synthetic: SyntheticSource::new(),
    });
    let report_port = config.reporting.port;
    tokio::spawn(async move { reporting::serve(ctx, report_port).await });
    tracing::info!("✅ Reporting endpoint running on port {}", config.reporting.port);

    let engine = AggregationRoundEngine::new(gateway.clone(), config.aggregation.clone());

    if config.aggregation.round_interval_secs == 0 {
        // One-shot mode
        let result = engine.run_round().await;
        health.record_round(result.outcome.is_success()).await;
        match result.outcome {
            RoundOutcome::Failed { stage, error } => {
                anyhow::bail!("aggregation round failed at {}: {}", stage, error)
            }
            RoundOutcome::NoParticipants => {
                tracing::info!("No participants registered; nothing to aggregate");
            }
            RoundOutcome::Succeeded { .. } => {
                tracing::info!("✅ Aggregation round complete");
            }
        }
        return Ok(());
    }

    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(
        config.aggregation.round_interval_secs,
    ));
    loop {
        interval.tick().await;
        let result = engine.run_round().await;
        health.record_round(result.outcome.is_success()).await;
    }
}
