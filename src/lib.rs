//! Fan-out query client for inference endpoints serving one sharded model.
//!
//! A model split across several endpoints (for example the tensor-parallel
//! ranks of one deployment) is queried by sending the same request to every
//! shard. This crate coordinates that fan-out on the client side.
//!
//! # Overview
//!
//! - [`EndpointClient`] talks to one endpoint: it packs a request through
//!   the [`MethodTable`], invokes the remote method over a [`Transport`],
//!   and unpacks the response.
//! - [`FanoutCoordinator`] owns one `EndpointClient` per shard. Its
//!   [`query`](FanoutCoordinator::query) issues a request to all shards and
//!   answers with shard 0's result; [`submit`](FanoutCoordinator::submit)
//!   and [`poll`](FanoutCoordinator::poll) provide a non-blocking protocol
//!   on top of the [`PendingTaskRegistry`].
//! - [`query_handle`] builds the right client from a [`DeploymentConfig`].
//!
//! Connection establishment and wire framing are left to the caller's
//! [`Connector`] and [`Transport`] implementations.
//!
//! # Module Organization
//!
//! - [`client`] - endpoint client, fan-out coordinator, blocking facade
//! - [`registry`] - FIFO task queue and result cache behind `poll`
//! - [`method_table`] - task kind to remote method conversions
//! - [`transport`] - transport and connector traits
//! - [`config`] - deployment configuration
//! - [`error`] - error types

pub mod client;
pub mod config;
pub mod constants;
pub mod deployment;
pub mod error;
#[cfg(feature = "logging")]
pub mod logging;
pub mod method_table;
pub mod registry;
pub mod transport;
pub mod types;

pub use client::{BlockingCoordinator, EndpointClient, FanoutCoordinator};
pub use config::DeploymentConfig;
pub use deployment::{query_handle, QueryHandle};
pub use error::{ClientError, ConversionError, Result, TransportError};
#[cfg(feature = "logging")]
pub use logging::init_logging;
pub use method_table::{Conversion, MethodTable};
pub use registry::{FailurePolicy, PendingTaskRegistry, TaskFuture};
pub use transport::{ChannelOptions, Connector, EndpointAddress, Transport};
pub use types::{PollStatus, QueryOptions, TaskHandle, TaskKind, TaskOutcome, TaskState};
