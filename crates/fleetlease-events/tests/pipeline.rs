//! Publisher, bus, processor and worker working together.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use fleetlease_core::ids::candidate_from_hash;
use fleetlease_core::{IdAllocator, Notification, NotificationId, VehicleId, VehicleRegistered};
use fleetlease_events::{
    ConsumerConfig, Disposition, InMemoryBus, MessageBus, NotificationProcessor, NotificationWorker,
    VehicleEventPublisher,
};
use fleetlease_store::{MemoryStore, Store};

fn event(vehicle_id: i32, model_year: i32) -> VehicleRegistered {
    VehicleRegistered {
        vehicle_id: VehicleId::new(vehicle_id),
        model_year,
        model_name: "Sport 110i".into(),
        plate: format!("TST{vehicle_id:04}"),
        registered_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
    }
}

fn processing_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 1).unwrap()
}

fn processor(store: &Arc<MemoryStore>, config: &ConsumerConfig) -> NotificationProcessor {
    NotificationProcessor::new(store.clone(), IdAllocator::default(), config)
}

/// Poll until `check` holds or a second has passed.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// =============================================================================
// Processor
// =============================================================================

#[test]
fn trigger_year_creates_notification() {
    let store = Arc::new(MemoryStore::new());
    let processor = processor(&store, &ConsumerConfig::default());
    let payload = event(7, 2024).to_json().unwrap();

    assert_eq!(processor.process_at(&payload, processing_instant()), Disposition::Ack);

    let notifications = store.list_notifications().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].vehicle_id, VehicleId::new(7));
    assert_eq!(notifications[0].model_year, 2024);
    assert_eq!(notifications[0].created_at, processing_instant());
    assert!(notifications[0].message.contains("TST0007"));
}

#[test]
fn other_years_are_acked_without_notification() {
    let store = Arc::new(MemoryStore::new());
    let processor = processor(&store, &ConsumerConfig::default());

    for year in [2023, 2025] {
        let payload = event(1, year).to_json().unwrap();
        assert_eq!(processor.process_at(&payload, processing_instant()), Disposition::Ack);
    }
    assert!(store.list_notifications().unwrap().is_empty());
}

#[test]
fn trigger_year_is_configurable() {
    let store = Arc::new(MemoryStore::new());
    let config = ConsumerConfig {
        trigger_model_year: 2025,
        ..ConsumerConfig::default()
    };
    let processor = processor(&store, &config);

    processor.process_at(&event(1, 2024).to_json().unwrap(), processing_instant());
    processor.process_at(&event(2, 2025).to_json().unwrap(), processing_instant());

    let notifications = store.list_notifications().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].vehicle_id, VehicleId::new(2));
}

#[test]
fn undecodable_payload_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let processor = processor(&store, &ConsumerConfig::default());

    assert_eq!(processor.process(b"not json"), Disposition::Reject);
    assert_eq!(processor.process(br#"{"vehicleId": 1}"#), Disposition::Reject);
    assert!(store.list_notifications().unwrap().is_empty());
}

#[test]
fn redelivery_creates_duplicate_notification() {
    let store = Arc::new(MemoryStore::new());
    let processor = processor(&store, &ConsumerConfig::default());
    let payload = event(7, 2024).to_json().unwrap();

    // Same processing instant: the second id is the next free slot.
    assert_eq!(processor.process_at(&payload, processing_instant()), Disposition::Ack);
    assert_eq!(processor.process_at(&payload, processing_instant()), Disposition::Ack);

    let notifications = store.list_notifications().unwrap();
    assert_eq!(notifications.len(), 2);
    assert_ne!(notifications[0].id, notifications[1].id);
}

/// Occupy the only id a one-probe allocator will try for `event`.
fn block_notification_id(store: &MemoryStore, registered: &VehicleRegistered) {
    let key = Notification::natural_key(registered, processing_instant());
    let id = NotificationId::new(candidate_from_hash(key.hash32()));
    store
        .insert_notification(&Notification::for_registration(
            id,
            &event(999, 2024),
            processing_instant(),
        ))
        .unwrap();
}

#[test]
fn persistence_failure_requeues_indefinitely_by_default() {
    let store = Arc::new(MemoryStore::new());
    let registered = event(7, 2024);
    block_notification_id(&store, &registered);

    let processor =
        NotificationProcessor::new(store.clone(), IdAllocator::new(1), &ConsumerConfig::default());
    let payload = registered.to_json().unwrap();

    for _ in 0..5 {
        assert_eq!(processor.process_at(&payload, processing_instant()), Disposition::Requeue);
    }
    assert_eq!(store.list_notifications().unwrap().len(), 1);
}

#[test]
fn persistence_failure_rejects_after_attempt_cap() {
    let store = Arc::new(MemoryStore::new());
    let registered = event(7, 2024);
    block_notification_id(&store, &registered);

    let config = ConsumerConfig {
        max_delivery_attempts: Some(3),
        ..ConsumerConfig::default()
    };
    let processor = NotificationProcessor::new(store.clone(), IdAllocator::new(1), &config);
    let payload = registered.to_json().unwrap();

    assert_eq!(processor.process_at(&payload, processing_instant()), Disposition::Requeue);
    assert_eq!(processor.process_at(&payload, processing_instant()), Disposition::Requeue);
    assert_eq!(processor.process_at(&payload, processing_instant()), Disposition::Reject);

    // The counter starts over for a later delivery of the same payload.
    assert_eq!(processor.process_at(&payload, processing_instant()), Disposition::Requeue);
}

// =============================================================================
// Worker
// =============================================================================

#[tokio::test]
async fn worker_consumes_published_events() {
    let bus = InMemoryBus::new();
    let store = Arc::new(MemoryStore::new());
    let config = ConsumerConfig::default();
    let processor = Arc::new(processor(&store, &config));
    let shutdown = CancellationToken::new();

    let handle = NotificationWorker::spawn(
        Arc::new(bus.clone()),
        processor,
        &config,
        shutdown.clone(),
    );

    let publisher = VehicleEventPublisher::new(Arc::new(bus.clone()), "vehicle.registered");
    publisher.publish(&event(1, 2024)).await.unwrap();
    publisher.publish(&event(2, 2023)).await.unwrap();
    bus.publish("vehicle.registered", b"garbage".to_vec())
        .await
        .unwrap();

    assert!(eventually(|| bus.acked().len() == 2 && bus.dead_letters().len() == 1).await);
    let notifications = store.list_notifications().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].vehicle_id, VehicleId::new(1));

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("worker stops after cancellation")
        .unwrap();
}

#[tokio::test]
async fn worker_stops_while_idle() {
    let bus = InMemoryBus::new();
    let store = Arc::new(MemoryStore::new());
    let config = ConsumerConfig::default();
    let shutdown = CancellationToken::new();

    let handle = NotificationWorker::spawn(
        Arc::new(bus),
        Arc::new(processor(&store, &config)),
        &config,
        shutdown.clone(),
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("worker stops after cancellation")
        .unwrap();
}
