//! Error types for the GSLB control plane
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for GSLB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the GSLB control plane
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (fatal at startup)
    #[error("configuration error: {0}")]
    Config(String),

    /// Health probe failures (treated as "unhealthy this cycle")
    #[error("health probe error: {0}")]
    Probe(String),

    /// DNS backend failures (transient; the next cycle retries)
    #[error("DNS backend error: {0}")]
    Backend(String),

    /// Some stale records survived a record replacement. Creates succeeded,
    /// so state is advanced and the next cycle deletes the stragglers.
    #[error("failed to delete {failed} stale record(s): {details}")]
    PartialDelete {
        /// Number of records that could not be deleted
        failed: usize,
        /// Concatenated per-record failure messages
        details: String,
    },

    /// IP address that does not parse at all
    #[error("invalid IP address: {0}")]
    InvalidIp(String),

    /// IP address with the wrong family for an A record
    #[error("not a valid IPv4 address for A record: {0}")]
    InvalidIpv4(String),

    /// IP address with the wrong family for an AAAA record
    #[error("not a valid IPv6 address for AAAA record: {0}")]
    InvalidIpv6(String),

    /// Webhook delivery failures (logged, never retried)
    #[error("notification error: {0}")]
    Notification(String),

    /// Network-related errors
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Aggregate of per-origin failures from a one-shot run
    #[error("{}", joined_message(.0))]
    Joined(Vec<Error>),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a health probe error
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Create a DNS backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a notification error
    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }

    /// Join a set of per-origin errors into one aggregate.
    ///
    /// Returns `Ok(())` when the input is empty so callers can write
    /// `Error::join(errors)?` directly after collecting.
    pub fn join(errors: Vec<Error>) -> Result<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::Joined(errors))
        }
    }
}

fn joined_message(errors: &[Error]) -> String {
    let parts: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!(
        "one-shot check failed for {} origin(s): {}",
        errors.len(),
        parts.join("; ")
    )
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
