//! Startup errors.

use std::path::PathBuf;

/// Errors raised while assembling the service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The pricing file could not be read.
    #[error("cannot read pricing file {path}: {source}")]
    PricingFile {
        /// The configured path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The pricing file is not a valid pricing table.
    #[error("invalid pricing file {path}: {source}")]
    PricingFormat {
        /// The configured path.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The storage backend could not be opened.
    #[error(transparent)]
    Store(#[from] fleetlease_store::StoreError),
}
