//! Fleetlease service entry point.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleetlease_events::AmqpBus;
use fleetlease_service::{open_store, AppState, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleetlease=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting fleetlease service");

    let config = ServiceConfig::from_env()?;

    tracing::info!(
        data_dir = ?config.data_dir,
        exchange = %config.amqp.topology.exchange,
        queue = %config.amqp.topology.queue,
        routing_key = %config.amqp.topology.routing_key,
        dead_letter_exchange = ?config.amqp.topology.dead_letter_exchange,
        trigger_model_year = config.consumer.trigger_model_year,
        max_delivery_attempts = ?config.consumer.max_delivery_attempts,
        plans = ?config.pricing.plan_lengths().collect::<Vec<_>>(),
        "Service configuration loaded"
    );

    let store = open_store(&config)?;
    let bus = Arc::new(AmqpBus::new(config.amqp.clone()));
    let state = AppState::new(store, bus, config);

    let shutdown = CancellationToken::new();
    let worker = state.spawn_worker(shutdown.clone());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    shutdown.cancel();
    worker.await?;

    tracing::info!("Fleetlease service stopped");
    Ok(())
}
