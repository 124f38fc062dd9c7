//! Synchronous facade over [`FanoutCoordinator`].
//!
//! [`BlockingCoordinator`] owns a current-thread runtime and drives every
//! call to completion on the calling thread. All shard calls therefore
//! interleave on that single thread, and the calls of non-designated
//! shards only make progress while some method of the facade is running.
//!
//! Do not call these methods from inside an async runtime; use
//! [`FanoutCoordinator`] directly there.

use serde_json::Value;
use tokio::runtime::{Builder, Runtime};

use super::fanout::FanoutCoordinator;
use crate::error::{ClientError, Result};
use crate::types::{PollStatus, QueryOptions, TaskHandle};

/// Blocking wrapper around a [`FanoutCoordinator`].
///
/// Non-designated shard calls still in flight when a method returns only
/// advance during later calls on this facade. Dropping the facade drops its
/// runtime, which cancels those calls.
#[derive(Debug)]
pub struct BlockingCoordinator {
    inner: FanoutCoordinator,
    runtime: Runtime,
}

impl BlockingCoordinator {
    /// Wraps `inner` with a dedicated current-thread runtime.
    pub fn new(inner: FanoutCoordinator) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| ClientError::Runtime(err.to_string()))?;
        Ok(Self { inner, runtime })
    }

    /// The wrapped coordinator.
    pub fn coordinator(&self) -> &FanoutCoordinator {
        &self.inner
    }

    /// Blocks until shard 0 answers; see [`FanoutCoordinator::query`].
    pub fn query(&self, request: Value, options: QueryOptions) -> Result<Value> {
        self.runtime.block_on(self.inner.query(request, options))
    }

    /// Queues a query; see [`FanoutCoordinator::submit`].
    pub fn submit(&self, request: Value, options: QueryOptions) -> TaskHandle {
        self.inner.submit(request, options)
    }

    /// Polls a handle, blocking while it drives a queued task.
    pub fn poll(&self, handle: &TaskHandle) -> PollStatus {
        self.runtime.block_on(self.inner.poll(handle))
    }

    /// Terminates every shard; see [`FanoutCoordinator::terminate`].
    pub fn terminate(&self) -> Result<()> {
        self.runtime.block_on(self.inner.terminate())
    }
}
