//! Common test utilities for fleetlease integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use fleetlease_core::{Driver, NewDriver, NewVehicle, Vehicle};
use fleetlease_events::{EventError, InMemoryBus, MessageBus, Subscription};
use fleetlease_service::{AppState, FleetService, ServiceConfig};
use fleetlease_store::MemoryStore;

/// Test harness with an in-memory store and bus.
pub struct TestHarness {
    /// The wired application.
    pub state: AppState,
    /// Handle to the bus for inspecting published messages.
    pub bus: InMemoryBus,
}

impl TestHarness {
    /// Create a harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    /// Create a harness with the given configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        let bus = InMemoryBus::new();
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(bus.clone()),
            config,
        );
        Self { state, bus }
    }

    /// The fleet service under test.
    pub fn fleet(&self) -> &FleetService {
        &self.state.fleet
    }

    /// Register a 2024 vehicle with the given plate.
    pub async fn vehicle(&self, plate: &str) -> Vehicle {
        self.fleet()
            .register_vehicle(NewVehicle::new(2024, "Sport 110i", plate))
            .await
            .expect("vehicle registers")
    }

    /// Register a driver with the given tax ID and category.
    pub fn driver(&self, tax_id: &str, category: &str) -> Driver {
        self.fleet()
            .register_driver(new_driver(tax_id, &format!("CNH-{tax_id}"), category))
            .expect("driver registers")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A driver registration.
pub fn new_driver(tax_id: &str, license_number: &str, category: &str) -> NewDriver {
    NewDriver::parse(
        "Maria Souza",
        tax_id,
        NaiveDate::from_ymd_opt(1992, 8, 14).unwrap(),
        license_number,
        category,
    )
    .unwrap()
}

/// 2025-03-10 15:42:07 UTC, a mid-day contract instant.
pub fn contract_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 15, 42, 7).unwrap()
}

/// A bus whose broker is always down.
pub struct UnreachableBus;

#[async_trait]
impl MessageBus for UnreachableBus {
    async fn publish(&self, _routing_key: &str, _payload: Vec<u8>) -> Result<(), EventError> {
        Err(EventError::Broker("connection refused".into()))
    }

    async fn subscribe(&self, _consumer_tag: &str) -> Result<Box<dyn Subscription>, EventError> {
        Err(EventError::Broker("connection refused".into()))
    }
}
