use std::time::Duration;

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    /// The bus refused or lost the message.
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed { topic: String, reason: String },

    /// The bus did not acknowledge the message in time.
    ///
    /// The publish is considered failed even if the message shows up later.
    #[error("Publish to topic '{topic}' timed out after {after:?}")]
    Timeout { topic: String, after: Duration },

    /// The subscription behind a redelivery handle is gone.
    #[error("Subscription to topic '{0}' is closed")]
    Closed(String),

    /// The envelope could not be encoded.
    #[error("Encoding error: {0}")]
    Encoding(#[from] DomainError),
}
