//! Fan-out coordinator over a set of shard endpoints.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;

use super::endpoint::EndpointClient;
use crate::error::{ClientError, Result};
use crate::registry::{FailurePolicy, PendingTaskRegistry};
use crate::method_table::MethodTable;
use crate::transport::{ChannelOptions, Connector, EndpointAddress};
use crate::types::{PollStatus, QueryOptions, TaskHandle, TaskKind};

/// Index of the shard whose result answers a fan-out.
const DESIGNATED_SHARD: usize = 0;

/// Sends every query to all shards of one model.
///
/// Each query is issued to every shard concurrently, and the result of
/// shard 0 answers the caller. Shard 0 is always the designated shard, even
/// when another shard finishes first. The remaining shards' calls run to
/// completion in the background and their results are dropped.
///
/// Besides the direct [`query`](Self::query), work can be
/// [`submit`](Self::submit)ted without touching the network and collected
/// later with [`poll`](Self::poll). Submitted queries run one at a time, in
/// submission order, as callers poll.
///
/// # Example
///
/// ```rust,ignore
/// let coordinator = FanoutCoordinator::connect(
///     TaskKind::TextGeneration,
///     "localhost",
///     &[50050, 50051],
///     Arc::new(MethodTable::standard()),
///     connector,
///     ChannelOptions::default(),
/// )?;
///
/// let handle = coordinator.submit(json!({"query": ["hello"]}), QueryOptions::new());
/// loop {
///     match coordinator.poll(&handle).await {
///         PollStatus::Ready(reply) => break println!("{reply}"),
///         PollStatus::Failed(err) => return Err(err),
///         PollStatus::NotReady => continue,
///     }
/// }
/// ```
#[derive(Debug)]
pub struct FanoutCoordinator {
    task: TaskKind,
    shards: Arc<[Arc<EndpointClient>]>,
    registry: PendingTaskRegistry,
}

impl FanoutCoordinator {
    /// Builds a coordinator over `shards`, in shard-index order.
    ///
    /// # Errors
    ///
    /// [`ClientError::NoShards`] for an empty shard set, and
    /// [`ClientError::Configuration`] when the shards serve different task
    /// kinds.
    pub fn new(shards: Vec<EndpointClient>) -> Result<Self> {
        let task = shards.first().ok_or(ClientError::NoShards)?.task().clone();
        if let Some(other) = shards.iter().find(|shard| *shard.task() != task) {
            return Err(ClientError::Configuration(format!(
                "shard {} serves {} but shard 0 serves {}",
                other.address(),
                other.task(),
                task
            )));
        }

        let shards: Vec<Arc<EndpointClient>> = shards.into_iter().map(Arc::new).collect();
        Ok(Self {
            task,
            shards: shards.into(),
            registry: PendingTaskRegistry::new(),
        })
    }

    /// Builds a coordinator with one lazily connected shard per port on
    /// `host`.
    pub fn connect(
        task: TaskKind,
        host: &str,
        ports: &[u16],
        table: Arc<MethodTable>,
        connector: Arc<dyn Connector>,
        options: ChannelOptions,
    ) -> Result<Self> {
        let shards = ports
            .iter()
            .map(|&port| {
                EndpointClient::connect(
                    EndpointAddress::new(host, port),
                    task.clone(),
                    Arc::clone(&table),
                    Arc::clone(&connector),
                    options,
                )
            })
            .collect();
        Self::new(shards)
    }

    /// Sets the registry's failure policy.
    ///
    /// Tasks already submitted stay queued and resolve under the new policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.registry.set_policy(policy);
        self
    }

    /// The task kind served by every shard.
    pub fn task(&self) -> &TaskKind {
        &self.task
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The shard clients, in shard-index order.
    pub fn shards(&self) -> impl Iterator<Item = &EndpointClient> {
        self.shards.iter().map(|shard| &**shard)
    }

    /// The registry holding submitted tasks.
    pub fn registry(&self) -> &PendingTaskRegistry {
        &self.registry
    }

    /// Queries every shard and returns shard 0's result.
    ///
    /// # Errors
    ///
    /// Any error from shard 0's call. Failures of the other shards are
    /// logged and otherwise ignored.
    pub async fn query(&self, request: Value, options: QueryOptions) -> Result<Value> {
        fan_out(Arc::clone(&self.shards), request, options).await
    }

    /// Queues a query without sending it and returns its handle.
    pub fn submit(&self, request: Value, options: QueryOptions) -> TaskHandle {
        self.registry
            .enqueue(fan_out(Arc::clone(&self.shards), request, options))
    }

    /// Polls a submitted query; see [`PendingTaskRegistry::poll`].
    pub async fn poll(&self, handle: &TaskHandle) -> PollStatus {
        self.registry.poll(handle).await
    }

    /// Terminates every shard in index order.
    ///
    /// All shards are attempted; the first failure is returned.
    pub async fn terminate(&self) -> Result<()> {
        let mut first_error = None;
        for (index, shard) in self.shards.iter().enumerate() {
            if let Err(err) = shard.terminate().await {
                tracing::warn!(shard = index, endpoint = %shard.address(), error = %err, "terminate failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Issues `request` to every shard and resolves to the designated shard's
/// outcome.
///
/// Nothing happens until the returned future is first polled. All shard
/// calls are then spawned in index order before any of them is awaited.
fn fan_out(
    shards: Arc<[Arc<EndpointClient>]>,
    request: Value,
    options: QueryOptions,
) -> BoxFuture<'static, Result<Value>> {
    async move {
        tracing::debug!(shards = shards.len(), "fanning out query");
        let mut calls = Vec::with_capacity(shards.len());
        for (index, shard) in shards.iter().enumerate() {
            let shard = Arc::clone(shard);
            let request = request.clone();
            let options = options.clone();
            calls.push(tokio::spawn(async move {
                let outcome = shard.call(&request, &options).await;
                if index != DESIGNATED_SHARD {
                    if let Err(err) = &outcome {
                        tracing::warn!(
                            shard = index,
                            endpoint = %shard.address(),
                            error = %err,
                            "discarded shard call failed"
                        );
                    }
                }
                outcome
            }));
        }

        // Dropping the other join handles detaches their calls.
        let designated = calls
            .into_iter()
            .nth(DESIGNATED_SHARD)
            .ok_or(ClientError::NoShards)?;
        designated.await.map_err(|err| ClientError::ShardAborted {
            shard: DESIGNATED_SHARD,
            message: err.to_string(),
        })?
    }
    .boxed()
}
