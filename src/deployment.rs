//! Query handles built from a [`DeploymentConfig`].

use serde_json::Value;
use std::sync::Arc;

use crate::client::{EndpointClient, FanoutCoordinator};
use crate::config::DeploymentConfig;
use crate::error::Result;
use crate::method_table::MethodTable;
use crate::transport::Connector;
use crate::types::{QueryOptions, TaskKind};

/// Client for a deployment, shaped by its configuration.
#[derive(Debug)]
pub enum QueryHandle {
    /// A load-balanced deployment behind one endpoint.
    Single(EndpointClient),
    /// A deployment split across shards.
    Sharded(FanoutCoordinator),
}

impl QueryHandle {
    /// Sends `request` and returns the deployment's answer.
    pub async fn query(&self, request: Value, options: QueryOptions) -> Result<Value> {
        match self {
            Self::Single(client) => client.call(&request, &options).await,
            Self::Sharded(coordinator) => coordinator.query(request, options).await,
        }
    }

    /// Terminates every endpoint of the deployment.
    pub async fn terminate(&self) -> Result<()> {
        match self {
            Self::Single(client) => client.terminate().await,
            Self::Sharded(coordinator) => coordinator.terminate().await,
        }
    }

    /// The task kind served by the deployment.
    pub fn task(&self) -> &TaskKind {
        match self {
            Self::Single(client) => client.task(),
            Self::Sharded(coordinator) => coordinator.task(),
        }
    }

    /// The coordinator, for sharded deployments.
    ///
    /// Only sharded deployments support `submit` and `poll`.
    pub fn as_sharded(&self) -> Option<&FanoutCoordinator> {
        match self {
            Self::Sharded(coordinator) => Some(coordinator),
            Self::Single(_) => None,
        }
    }
}

/// Builds the query handle for a deployment.
///
/// Load-balanced deployments get a single [`EndpointClient`] on
/// `port_number`; all others get a [`FanoutCoordinator`] over
/// `tensor_parallel` consecutive ports. No connection is opened here.
///
/// # Errors
///
/// [`ClientError::Configuration`](crate::ClientError::Configuration) when
/// the configuration does not validate.
pub fn query_handle(
    config: &DeploymentConfig,
    table: Arc<MethodTable>,
    connector: Arc<dyn Connector>,
) -> Result<QueryHandle> {
    config.validate()?;
    let options = config.channel_options();

    if config.enable_load_balancing {
        tracing::debug!(endpoint = %config.address(), task = %config.task, "load-balanced deployment");
        return Ok(QueryHandle::Single(EndpointClient::connect(
            config.address(),
            config.task.clone(),
            table,
            connector,
            options,
        )));
    }

    let ports = config.shard_ports()?;
    tracing::debug!(host = %config.host, shards = ports.len(), task = %config.task, "sharded deployment");
    FanoutCoordinator::connect(
        config.task.clone(),
        &config.host,
        &ports,
        table,
        connector,
        options,
    )
    .map(QueryHandle::Sharded)
}
