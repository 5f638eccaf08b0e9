//! Fleet leasing service.
//!
//! This crate wires the fleetlease building blocks into a running service:
//!
//! - [`FleetService`]: vehicle and driver registration, rentals and
//!   settlements
//! - [`AppState`]: store, bus, service and notification processor
//! - [`ServiceConfig`]: configuration from environment variables
//!
//! The binary starts the notification worker next to the service and stops
//! it on Ctrl-C.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod service;
pub mod state;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use service::FleetService;
pub use state::{open_store, AppState};
