//! Error types for shard queries.
//!
//! [`ClientError`] is the single error type returned by the public API.
//! Transport implementations report failures with [`TransportError`], and
//! conversion functions in a [`MethodTable`](crate::MethodTable) report
//! failures with [`ConversionError`].

use thiserror::Error;

use crate::types::{TaskHandle, TaskKind};

/// Convenience alias used throughout the crate.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Errors that can occur while querying endpoints.
///
/// # Examples
///
/// ```
/// use shard_query::{ClientError, TaskKind};
///
/// let err = ClientError::UnknownTaskKind {
///     task: TaskKind::from("unsupported"),
/// };
/// assert!(err.to_string().contains("unsupported"));
/// assert!(!err.is_transport());
/// ```
#[derive(Debug, Error)]
pub enum ClientError {
    /// No conversion is registered for the client's task kind.
    ///
    /// Raised locally, before any connection is opened.
    #[error("unknown task: {task}")]
    UnknownTaskKind {
        /// The task kind that has no registered conversion.
        task: TaskKind,
    },

    /// The pack function rejected the request.
    #[error("invalid request for {task}: {message}")]
    InvalidRequest {
        /// The task kind whose pack function failed.
        task: TaskKind,
        /// Reason reported by the pack function.
        message: String,
    },

    /// Connecting to, or calling, the endpoint failed.
    #[error("transport failure on {endpoint}: {source}")]
    TransportFailure {
        /// The `host:port` of the endpoint.
        endpoint: String,
        /// The error reported by the transport.
        #[source]
        source: TransportError,
    },

    /// The unpack function rejected the endpoint's response.
    #[error("malformed response from {method}: {message}")]
    MalformedResponse {
        /// The remote method that produced the response.
        method: String,
        /// Reason reported by the unpack function.
        message: String,
    },

    /// A coordinator needs at least one shard.
    #[error("at least one shard is required")]
    NoShards,

    /// A shard call panicked or was aborted by the runtime.
    #[error("shard {shard} aborted: {message}")]
    ShardAborted {
        /// Index of the shard in the shard set.
        shard: usize,
        /// Description of the join failure.
        message: String,
    },

    /// The poll driving this task was dropped before the task finished.
    #[error("task {handle} was abandoned before completion")]
    Abandoned {
        /// The handle of the abandoned task.
        handle: TaskHandle,
    },

    /// Invalid or unreadable deployment configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The blocking facade could not start its runtime.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ClientError {
    /// Returns `true` for failures reported by the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::TransportFailure { .. })
    }

    /// Returns `true` if repeating the same call could succeed.
    ///
    /// Only transient transport conditions qualify; local misconfiguration
    /// and conversion failures never do.
    ///
    /// # Examples
    ///
    /// ```
    /// use shard_query::{ClientError, TransportError};
    ///
    /// let err = ClientError::TransportFailure {
    ///     endpoint: "localhost:50050".to_string(),
    ///     source: TransportError::Unavailable("warming up".to_string()),
    /// };
    /// assert!(err.is_retryable());
    ///
    /// let err = ClientError::NoShards;
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransportFailure { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Failures reported by a [`Transport`](crate::Transport) or
/// [`Connector`](crate::Connector).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The endpoint refused the connection.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// The call exceeded the transport's deadline.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The endpoint is temporarily unavailable.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The connection was closed.
    #[error("connection closed")]
    Closed,

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` for conditions that may clear up on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::DeadlineExceeded(_) | Self::Unavailable(_))
    }
}

/// Error returned by pack and unpack functions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConversionError {
    /// Human-readable reason.
    pub message: String,
}

impl ConversionError {
    /// Creates a conversion error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
