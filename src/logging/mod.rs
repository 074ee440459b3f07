//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - console output with configurable levels
//! - JSON file logging with daily or hourly rotation
//!
//! # Example
//!
//! ```no_run
//! use vellum::config::LoggingConfig;
//! use vellum::logging::init_logging;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(tenant = "acme", "Bundle received");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the outcome of a bundle transaction
///
/// # Example
///
/// ```no_run
/// use vellum::domain::BundleResponse;
/// use vellum::log_bundle_outcome;
///
/// let response = BundleResponse::committed(vec![]);
/// log_bundle_outcome!(&response, "default");
/// ```
#[macro_export]
macro_rules! log_bundle_outcome {
    ($response:expr, $tenant:expr) => {
        if $response.success {
            tracing::info!(
                tenant = %$tenant,
                entries = $response.entries.len(),
                "Bundle committed"
            );
        } else {
            tracing::warn!(
                tenant = %$tenant,
                error_kind = ?$response.error_kind,
                message = %$response.message,
                "Bundle failed"
            );
        }
    };
}

/// Log the completion of one projector phase
///
/// # Example
///
/// ```no_run
/// use vellum::log_projection_phase;
///
/// log_projection_phase!("upsert_available", 10, 1);
/// ```
#[macro_export]
macro_rules! log_projection_phase {
    ($phase:expr, $succeeded:expr, $failed:expr) => {
        tracing::debug!(
            phase = $phase,
            succeeded = $succeeded,
            failed = $failed,
            "Projection phase settled"
        );
    };
}
