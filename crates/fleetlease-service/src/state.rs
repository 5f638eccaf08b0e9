//! Application state.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fleetlease_core::IdAllocator;
use fleetlease_events::{MessageBus, NotificationProcessor, NotificationWorker, VehicleEventPublisher};
use fleetlease_store::{MemoryStore, Store};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::service::FleetService;

/// Everything the running service shares.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// The message bus.
    pub bus: Arc<dyn MessageBus>,

    /// Fleet operations.
    pub fleet: FleetService,

    /// Notification consumer logic.
    pub processor: Arc<NotificationProcessor>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Wire the service over a store and a bus.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, bus: Arc<dyn MessageBus>, config: ServiceConfig) -> Self {
        let allocator = IdAllocator::new(config.max_id_probes);
        let publisher = VehicleEventPublisher::new(
            Arc::clone(&bus),
            config.amqp.topology.routing_key.clone(),
        );
        let fleet = FleetService::new(
            Arc::clone(&store),
            publisher,
            allocator,
            config.pricing.clone(),
        );
        let processor = Arc::new(NotificationProcessor::new(
            Arc::clone(&store),
            allocator,
            &config.consumer,
        ));

        Self {
            store,
            bus,
            fleet,
            processor,
            config,
        }
    }

    /// Start the notification worker; it runs until `shutdown` is cancelled.
    #[must_use]
    pub fn spawn_worker(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        NotificationWorker::spawn(
            Arc::clone(&self.bus),
            Arc::clone(&self.processor),
            &self.config.consumer,
            shutdown,
        )
    }
}

/// Open the configured storage backend.
///
/// # Errors
///
/// Returns an error if the `RocksDB` directory cannot be opened.
pub fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, ServiceError> {
    #[cfg(feature = "rocksdb-backend")]
    if let Some(dir) = &config.data_dir {
        tracing::info!(path = %dir.display(), "opening RocksDB store");
        let store = fleetlease_store::RocksStore::open(dir)?;
        return Ok(Arc::new(store));
    }

    #[cfg(not(feature = "rocksdb-backend"))]
    if let Some(dir) = &config.data_dir {
        tracing::warn!(
            path = %dir.display(),
            "DATA_DIR ignored: built without rocksdb-backend"
        );
    }

    tracing::info!("using in-memory store");
    Ok(Arc::new(MemoryStore::new()))
}
