//! Service configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use fleetlease_core::{RentalPricing, DEFAULT_MAX_PROBES};
use fleetlease_events::{AmqpConfig, ConsumerConfig, Topology};

use crate::error::ServiceError;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Path to the `RocksDB` data directory. Without it (or without the
    /// `rocksdb-backend` feature) data is kept in memory.
    pub data_dir: Option<PathBuf>,

    /// Broker connection and topology.
    pub amqp: AmqpConfig,

    /// Notification consumer settings.
    pub consumer: ConsumerConfig,

    /// Probe bound of the id allocator (default: 1024).
    pub max_id_probes: u32,

    /// Rental plan table.
    pub pricing: RentalPricing,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparsable numbers fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `PRICING_FILE` is set but cannot be loaded.
    pub fn from_env() -> Result<Self, ServiceError> {
        let defaults = Self::default();

        let topology = Topology {
            exchange: env_or("AMQP_EXCHANGE", defaults.amqp.topology.exchange),
            queue: env_or("AMQP_QUEUE", defaults.amqp.topology.queue),
            routing_key: env_or("AMQP_ROUTING_KEY", defaults.amqp.topology.routing_key),
            dead_letter_exchange: std::env::var("AMQP_DEAD_LETTER_EXCHANGE").ok(),
        };

        let pricing = match std::env::var("PRICING_FILE") {
            Ok(path) => load_pricing(Path::new(&path))?,
            Err(_) => defaults.pricing,
        };

        Ok(Self {
            data_dir: std::env::var("DATA_DIR").ok().map(PathBuf::from),
            amqp: AmqpConfig {
                url: env_or("AMQP_URL", defaults.amqp.url),
                topology,
                prefetch: env_parse("AMQP_PREFETCH").unwrap_or(defaults.amqp.prefetch),
                publish_timeout: env_parse("AMQP_PUBLISH_TIMEOUT_MS")
                    .map_or(defaults.amqp.publish_timeout, Duration::from_millis),
            },
            consumer: ConsumerConfig {
                trigger_model_year: env_parse("NOTIFICATION_MODEL_YEAR")
                    .unwrap_or(defaults.consumer.trigger_model_year),
                max_delivery_attempts: env_parse("MAX_DELIVERY_ATTEMPTS"),
                reconnect_delay: env_parse("CONSUMER_RECONNECT_DELAY_MS")
                    .map_or(defaults.consumer.reconnect_delay, Duration::from_millis),
            },
            max_id_probes: env_parse("MAX_ID_PROBES").unwrap_or(defaults.max_id_probes),
            pricing,
        })
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            amqp: AmqpConfig::default(),
            consumer: ConsumerConfig::default(),
            max_id_probes: DEFAULT_MAX_PROBES,
            pricing: RentalPricing::default(),
        }
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Load a pricing table from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_pricing(path: &Path) -> Result<RentalPricing, ServiceError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ServiceError::PricingFile {
        path: path.to_owned(),
        source,
    })?;
    let pricing = serde_json::from_str(&contents).map_err(|source| ServiceError::PricingFormat {
        path: path.to_owned(),
        source,
    })?;
    tracing::info!(path = %path.display(), "loaded pricing table");
    Ok(pricing)
}
