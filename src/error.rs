//! Error types for taskmon operations.

use thiserror::Error;

/// Result type used throughout taskmon.
pub type TaskmonResult<T> = Result<T, TaskmonError>;

/// Main error type for taskmon operations.
///
/// The projection functions themselves never fail. These variants cover the
/// edges around them: the engine query seam, strict derived-metric checks,
/// parsing and configuration.
#[derive(Error, Debug)]
pub enum TaskmonError {
    /// The engine does not know the requested queue
    #[error("Queue '{queue}' not found")]
    QueueNotFound {
        /// The queue name that was requested
        queue: String,
    },

    /// The engine query API failed
    #[error("Backend error: {message}")]
    Backend {
        /// Error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Source counters cannot produce a valid derived metric
    #[error(
        "Inconsistent counters for queue '{queue}': failed ({failed}) exceeds processed ({processed})"
    )]
    DataIntegrity {
        /// Queue the counters belong to
        queue: String,
        /// Processed count as reported by the engine
        processed: i64,
        /// Failed count as reported by the engine
        failed: i64,
    },

    /// A task state name could not be parsed
    #[error("Unknown task state '{0}'")]
    InvalidTaskState(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },
}

impl TaskmonError {
    /// Create a queue-not-found error
    pub fn queue_not_found(queue: impl Into<String>) -> Self {
        Self::QueueNotFound {
            queue: queue.into(),
        }
    }

    /// Create a new backend error wrapping an underlying cause
    pub fn backend<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}
