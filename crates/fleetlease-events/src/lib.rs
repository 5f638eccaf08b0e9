//! Event pipeline for fleetlease.
//!
//! Vehicle registrations are published as [`VehicleRegistered`] JSON
//! messages on a topic exchange. A background [`NotificationWorker`]
//! consumes them and, for vehicles of the trigger model year, records a
//! [`Notification`](fleetlease_core::Notification) in the store.
//!
//! The broker sits behind the [`MessageBus`] trait:
//!
//! - [`AmqpBus`]: `RabbitMQ` via `lapin`, durable topology and persistent
//!   messages
//! - [`InMemoryBus`]: in-process queue with the same ack/requeue/reject
//!   semantics, used in tests
//!
//! Delivery is at-least-once. Every delivery is settled with exactly one
//! [`Disposition`].
//!
//! [`VehicleRegistered`]: fleetlease_core::VehicleRegistered

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod amqp;
pub mod bus;
pub mod config;
pub mod consumer;
pub mod error;
pub mod memory;
pub mod publisher;
pub mod worker;

pub use amqp::{AmqpBus, AmqpConfig};
pub use bus::{Delivery, Disposition, MessageBus, Subscription};
pub use config::{ConsumerConfig, Topology};
pub use consumer::NotificationProcessor;
pub use error::{EventError, Result};
pub use memory::{InMemoryBus, QueuedMessage};
pub use publisher::VehicleEventPublisher;
pub use worker::NotificationWorker;
