//! Turning vehicle registration events into notifications.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use fleetlease_core::{IdAllocator, Notification, VehicleRegistered};
use fleetlease_store::Store;

use crate::bus::Disposition;
use crate::config::ConsumerConfig;
use crate::error::{EventError, Result};

type PayloadDigest = [u8; 32];

/// Decides the [`Disposition`] of each consumed message.
///
/// - undecodable payload: `Reject`
/// - trigger model year: persist a notification, then `Ack`
/// - any other model year: `Ack`
/// - persistence failure: `Requeue`, or `Reject` once
///   `max_delivery_attempts` failures were seen for the same payload
pub struct NotificationProcessor {
    store: Arc<dyn Store>,
    allocator: IdAllocator,
    trigger_model_year: i32,
    max_delivery_attempts: Option<u32>,
    failures: Mutex<HashMap<PayloadDigest, u32>>,
}

impl NotificationProcessor {
    /// Creates a processor writing to `store`.
    pub fn new(store: Arc<dyn Store>, allocator: IdAllocator, config: &ConsumerConfig) -> Self {
        Self {
            store,
            allocator,
            trigger_model_year: config.trigger_model_year,
            max_delivery_attempts: config.max_delivery_attempts,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Process a message received now.
    pub fn process(&self, payload: &[u8]) -> Disposition {
        self.process_at(payload, Utc::now())
    }

    /// Process a message with an explicit processing instant.
    pub fn process_at(&self, payload: &[u8], now: DateTime<Utc>) -> Disposition {
        let event = match VehicleRegistered::from_json(payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(error = %err, bytes = payload.len(), "undecodable vehicle event, rejecting");
                return Disposition::Reject;
            }
        };

        if event.model_year != self.trigger_model_year {
            tracing::debug!(
                vehicle_id = %event.vehicle_id,
                model_year = event.model_year,
                "no notification for model year"
            );
            return Disposition::Ack;
        }

        match self.notify(&event, now) {
            Ok(notification) => {
                self.clear_failures(payload);
                tracing::info!(
                    notification_id = %notification.id,
                    vehicle_id = %event.vehicle_id,
                    "notification created"
                );
                Disposition::Ack
            }
            Err(err) => {
                if self.attempts_exhausted(payload) {
                    tracing::error!(
                        error = %err,
                        vehicle_id = %event.vehicle_id,
                        "notification failed too often, rejecting"
                    );
                    Disposition::Reject
                } else {
                    tracing::warn!(
                        error = %err,
                        vehicle_id = %event.vehicle_id,
                        "notification failed, requeueing"
                    );
                    Disposition::Requeue
                }
            }
        }
    }

    fn notify(&self, event: &VehicleRegistered, now: DateTime<Utc>) -> Result<Notification> {
        let key = Notification::natural_key(event, now);
        let id = self
            .allocator
            .allocate(&key, |id| Ok::<_, EventError>(self.store.notification_exists(id)?))?;

        let notification = Notification::for_registration(id, event, now);
        self.store.insert_notification(&notification)?;
        Ok(notification)
    }

    /// Count a failed attempt; true once the cap is reached.
    fn attempts_exhausted(&self, payload: &[u8]) -> bool {
        let Some(max) = self.max_delivery_attempts else {
            return false;
        };

        let key = digest(payload);
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let attempts = failures.entry(key).or_insert(0);
        *attempts += 1;
        if *attempts >= max {
            failures.remove(&key);
            true
        } else {
            false
        }
    }

    fn clear_failures(&self, payload: &[u8]) {
        if self.max_delivery_attempts.is_some() {
            self.failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&digest(payload));
        }
    }
}

fn digest(payload: &[u8]) -> PayloadDigest {
    Sha256::digest(payload).into()
}
