use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use common::Contestant;
use moba_matching::config::env_or;
use moba_matching::{MatchEngine, MatchEvent, MatchingConfig};
use rand::Rng;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const EVENT_BUFFER: usize = 16_384;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = MatchingConfig::from_env()?;
    let contestant_count: usize = env_or("MOBA_MATCHING_DEMO_CONTESTANTS", 1000)?;
    let run_seconds: u64 = env_or("MOBA_MATCHING_DEMO_SECONDS", 5)?;
    info!(?config, contestant_count, run_seconds, "Starting matching demo");

    let (event_tx, event_rx) = broadcast::channel(EVENT_BUFFER);
    let engine = MatchEngine::new(config, Arc::new(event_tx)).context("Failed to create matching engine")?;
    let listener = tokio::spawn(log_events(BroadcastStream::new(event_rx)));

    engine.start()?;

    {
        let mut rng = rand::thread_rng();
        for i in 0..contestant_count {
            let contestant = Contestant::new(
                i as u64,
                rng.gen_range(900.0_f64..1000.0).floor(),
                4.0,
                rng.gen_range(1..=2),
            );
            if let Err(e) = engine.add_contestant(contestant) {
                warn!(error = %e, "Demo contestant rejected");
            }
        }
    }
    info!(queued = ?engine.queue_stats(), "Demo contestants queued");

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(run_seconds)) => {
            info!("Demo time elapsed");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Received shutdown signal");
        }
    }

    engine.stop()?;
    info!(remaining = ?engine.queue_stats(), "Matching stopped");
    engine.destroy()?;
    drop(engine);

    // The listener ends once the ticker task releases its engine handle
    if tokio::time::timeout(Duration::from_secs(1), listener).await.is_err() {
        warn!("Event listener did not drain in time");
    }

    info!("Matching demo finished");
    Ok(())
}

async fn log_events(mut events: BroadcastStream<MatchEvent>) {
    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Event listener lagged behind");
                continue;
            }
        };
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "Failed to serialize matching event");
                continue;
            }
        };
        match event {
            MatchEvent::AdmissionSucceeded { .. } | MatchEvent::WithdrawalSucceeded { .. } => {
                debug!(event = %json, "Matching event");
            }
            _ => info!(event = %json, "Matching event"),
        }
    }
}
