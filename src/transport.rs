//! Transport abstraction consumed by [`EndpointClient`](crate::EndpointClient).
//!
//! Connection establishment and wire framing are not implemented here.
//! A deployment plugs in a [`Connector`] that opens channels to
//! `host:port` endpoints, and every channel implements [`Transport`]: a
//! unary "invoke method with payload" call plus the `Terminate` control
//! call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::constants::MAX_MESSAGE_SIZE;
use crate::error::TransportError;

/// Network location of one endpoint.
///
/// # Examples
///
/// ```
/// use shard_query::EndpointAddress;
///
/// let address = EndpointAddress::new("localhost", 50051);
/// assert_eq!(address.to_string(), "localhost:50051");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointAddress {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl EndpointAddress {
    /// Creates an address from a host and a port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Channel settings handed to the [`Connector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOptions {
    /// Largest message the channel may send, in bytes.
    pub max_send_message_length: usize,
    /// Largest message the channel may receive, in bytes.
    pub max_receive_message_length: usize,
}

impl ChannelOptions {
    /// Uses the same limit for both directions.
    pub fn with_max_message_size(size: usize) -> Self {
        Self {
            max_send_message_length: size,
            max_receive_message_length: size,
        }
    }
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self::with_max_message_size(MAX_MESSAGE_SIZE)
    }
}

/// An established channel to one endpoint.
///
/// Implementations own their framing and deadline semantics. The
/// coordinator imposes no timeout of its own, so a transport that never
/// answers keeps the caller waiting.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Invokes `method` with a wire-format `payload` and returns the
    /// wire-format response.
    async fn invoke(&self, method: &str, payload: Value) -> Result<Value, TransportError>;

    /// Sends the `Terminate` control call and waits for its empty
    /// acknowledgment.
    async fn terminate(&self) -> Result<(), TransportError>;

    /// Short transport name used in log output.
    fn transport_type(&self) -> &'static str {
        "custom"
    }
}

/// Opens channels to endpoints.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    /// Establishes a channel to `address`.
    async fn connect(
        &self,
        address: &EndpointAddress,
        options: &ChannelOptions,
    ) -> Result<Arc<dyn Transport>, TransportError>;
}
