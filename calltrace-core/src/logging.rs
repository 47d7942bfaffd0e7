//! Structured logging using **tracing**.
//!
//! The engine emits `debug!` per traversal level, `info!` when a snapshot is
//! loaded and when a trace finishes, and `warn!` for call targets without
//! binding information. Logs go to stderr as JSON so stdout stays clean for
//! trees and reports.

use tracing::{error, info, warn};

/// Initializes the global tracing collector (subscriber).
///
/// This should be called *once* at the beginning of the application's runtime.
///
/// # Environment Variables
/// - `RUST_LOG`: Controls log filtering (e.g., `RUST_LOG=calltrace_core=debug`)
pub fn init_structured_logging() {
    tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_level(true)
        .with_target(true)
        .with_current_span(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Logs a warning event.
pub fn log_warn(message: &str) {
    warn!(detail = %message);
}

/// Logs an info event.
pub fn log_info(message: &str) {
    info!(detail = %message);
}

/// Logs an error event.
pub fn log_error(message: &str) {
    error!(detail = %message);
}

/// Logs a named event, with the level picked from the name.
pub fn log_event(event: &str, detail: &str) {
    match event.to_uppercase().as_str() {
        "ERROR" | "CANCELLED" => error!(event = %event, detail = %detail),
        "WARN" | "WARNING" | "TRUNCATED" => warn!(event = %event, detail = %detail),
        _ => info!(event = %event, detail = %detail),
    }
}
