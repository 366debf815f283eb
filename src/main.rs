//! Crash Race Engine
//!
//! Runs the provably-fair round lifecycle for the lifetime of the process
//! and logs the event stream. The real-time transport and API layers attach
//! to the same broadcast channel in production.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crash_race::{EngineConfig, RoundCoordinator, RoundScheduler, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::from_env().context("loading engine configuration")?;

    info!("Crash Race Engine v{}", VERSION);
    info!(
        "betting {} ms, tick {} ms, end {} ms",
        config.scheduler.betting_ms, config.scheduler.tick_interval_ms, config.scheduler.end_ms
    );
    info!(
        "house edge {}, growth rate {}, multiplier range [{}, {}]",
        config.multiplier.house_edge,
        config.vehicle.growth_rate,
        config.multiplier.min_multiplier,
        config.multiplier.max_multiplier
    );

    let coordinator = RoundCoordinator::new(config.multiplier.clone(), config.vehicle.clone());
    let scheduler = Arc::new(RoundScheduler::new(coordinator, config.scheduler.clone()));

    // Stand-in for the real-time transport: log every event as a JSON line.
    let mut events = scheduler.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(target: "broadcast", "{json}"),
                    Err(err) => warn!("failed to encode event: {err}"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("event consumer lagged, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let lifecycle = scheduler
        .start()
        .context("round lifecycle already running")?;

    tokio::select! {
        result = lifecycle => {
            result.context("round lifecycle task panicked")??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received; shutting down");
            scheduler.shutdown();
        }
    }

    Ok(())
}
