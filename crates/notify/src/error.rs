//! Notification error types.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while delivering a notification.
///
/// These never leave [`NotificationSink::send`](crate::NotificationSink::send);
/// the sink converts them into a [`NotificationOutcome`](crate::NotificationOutcome).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Host/endpoint, sender or recipient is not configured.
    #[error("missing mail configuration: {0}")]
    MissingConfig(&'static str),

    /// A sender or recipient address could not be parsed.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The transport could not be constructed from its configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),

    /// The transport accepted the request but delivery failed.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The delivery attempt did not finish in time.
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
