//! Client for a single inference endpoint.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::{ClientError, Result, TransportError};
use crate::method_table::MethodTable;
use crate::transport::{ChannelOptions, Connector, EndpointAddress, Transport};
use crate::types::{QueryOptions, TaskKind};

/// Sends queries to one endpoint.
///
/// The client owns one channel to its endpoint. When built with
/// [`connect`](Self::connect) the channel is opened on the first call, so
/// a request that fails locally (for example an unknown task kind) never
/// touches the network.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use shard_query::{EndpointAddress, EndpointClient, MethodTable, TaskKind};
///
/// let client = EndpointClient::connect(
///     EndpointAddress::new("localhost", 50050),
///     TaskKind::TextGeneration,
///     Arc::new(MethodTable::standard()),
///     connector,
///     Default::default(),
/// );
/// let reply = client.call(&json!({"query": ["hello"]}), &Default::default()).await?;
/// ```
#[derive(Debug)]
pub struct EndpointClient {
    address: EndpointAddress,
    task: TaskKind,
    table: Arc<MethodTable>,
    connector: Option<Arc<dyn Connector>>,
    options: ChannelOptions,
    channel: OnceCell<Arc<dyn Transport>>,
}

impl EndpointClient {
    /// Creates a client whose channel is opened lazily through `connector`.
    pub fn connect(
        address: EndpointAddress,
        task: TaskKind,
        table: Arc<MethodTable>,
        connector: Arc<dyn Connector>,
        options: ChannelOptions,
    ) -> Self {
        Self {
            address,
            task,
            table,
            connector: Some(connector),
            options,
            channel: OnceCell::new(),
        }
    }

    /// Creates a client over an already established channel.
    pub fn with_transport(
        address: EndpointAddress,
        task: TaskKind,
        table: Arc<MethodTable>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            address,
            task,
            table,
            connector: None,
            options: ChannelOptions::default(),
            channel: OnceCell::new_with(Some(transport)),
        }
    }

    /// The endpoint this client talks to.
    pub fn address(&self) -> &EndpointAddress {
        &self.address
    }

    /// The task kind this client serves.
    pub fn task(&self) -> &TaskKind {
        &self.task
    }

    /// Returns `true` once the channel has been established.
    pub fn is_connected(&self) -> bool {
        self.channel.initialized()
    }

    /// Sends `request` to the endpoint and returns the converted response.
    ///
    /// # Errors
    ///
    /// - [`ClientError::UnknownTaskKind`] if the table has no conversion
    ///   for this client's task kind. Nothing is sent.
    /// - [`ClientError::InvalidRequest`] if packing fails.
    /// - [`ClientError::TransportFailure`] if connecting or invoking fails.
    /// - [`ClientError::MalformedResponse`] if unpacking fails.
    pub async fn call(&self, request: &Value, options: &QueryOptions) -> Result<Value> {
        let conversion = self
            .table
            .get(&self.task)
            .ok_or_else(|| ClientError::UnknownTaskKind {
                task: self.task.clone(),
            })?;

        let payload = conversion
            .pack(request, options)
            .map_err(|err| ClientError::InvalidRequest {
                task: self.task.clone(),
                message: err.message,
            })?;

        let channel = self.channel().await?;
        tracing::debug!(
            endpoint = %self.address,
            method = conversion.method(),
            transport = channel.transport_type(),
            "invoking endpoint"
        );
        let response = channel
            .invoke(conversion.method(), payload)
            .await
            .map_err(|source| self.transport_failure(source))?;

        conversion
            .unpack(response)
            .map_err(|err| ClientError::MalformedResponse {
                method: conversion.method().to_string(),
                message: err.message,
            })
    }

    /// Asks the endpoint to shut down and waits for the acknowledgment.
    pub async fn terminate(&self) -> Result<()> {
        let channel = self.channel().await?;
        channel
            .terminate()
            .await
            .map_err(|source| self.transport_failure(source))?;
        tracing::info!(endpoint = %self.address, "endpoint terminated");
        Ok(())
    }

    async fn channel(&self) -> Result<&Arc<dyn Transport>> {
        self.channel
            .get_or_try_init(|| async {
                let connector = self
                    .connector
                    .as_ref()
                    .ok_or_else(|| self.transport_failure(TransportError::Closed))?;
                tracing::debug!(endpoint = %self.address, "opening channel");
                connector
                    .connect(&self.address, &self.options)
                    .await
                    .map_err(|source| self.transport_failure(source))
            })
            .await
    }

    fn transport_failure(&self, source: TransportError) -> ClientError {
        ClientError::TransportFailure {
            endpoint: self.address.to_string(),
            source,
        }
    }
}
