//! Deployment configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{DEFAULT_HOST, DEFAULT_PORT, MAX_MESSAGE_SIZE};
use crate::error::{ClientError, Result};
use crate::transport::{ChannelOptions, EndpointAddress};
use crate::types::TaskKind;

/// Describes how a model deployment is reached.
///
/// A load-balanced deployment exposes a single endpoint at `port_number`.
/// Otherwise the model is split over `tensor_parallel` shards listening on
/// consecutive ports starting at `port_number`.
///
/// # Example Configuration File
///
/// ```toml
/// task = "text-generation"
/// host = "localhost"
/// port_number = 50050
/// tensor_parallel = 2
/// enable_load_balancing = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Task kind served by the deployment.
    pub task: TaskKind,

    /// Host running the endpoints.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the load balancer, or of shard 0.
    #[serde(default = "default_port")]
    pub port_number: u16,

    /// Number of shards.
    #[serde(default = "default_tensor_parallel")]
    pub tensor_parallel: usize,

    /// Route queries through a single load-balanced endpoint.
    #[serde(default = "default_load_balancing")]
    pub enable_load_balancing: bool,

    /// Send and receive limit for every channel, in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_tensor_parallel() -> usize {
    1
}

fn default_load_balancing() -> bool {
    true
}

fn default_max_message_size() -> usize {
    MAX_MESSAGE_SIZE
}

impl DeploymentConfig {
    /// Creates a load-balanced configuration with default host and port.
    pub fn new(task: TaskKind) -> Self {
        Self {
            task,
            host: default_host(),
            port_number: default_port(),
            tensor_parallel: default_tensor_parallel(),
            enable_load_balancing: default_load_balancing(),
            max_message_size: default_max_message_size(),
        }
    }

    /// Switches to a sharded deployment with `shards` consecutive ports.
    pub fn with_tensor_parallel(mut self, shards: usize) -> Self {
        self.tensor_parallel = shards;
        self.enable_load_balancing = false;
        self
    }

    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the base port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port_number = port;
        self
    }

    /// Loads and validates a configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ClientError::Configuration(format!("TOML serialize error: {e}")))
    }

    /// Checks host, shard count and port range.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::Configuration("host must not be empty".into()));
        }
        if self.tensor_parallel == 0 {
            return Err(ClientError::Configuration(
                "tensor_parallel must be at least 1".into(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(ClientError::Configuration(
                "max_message_size must be positive".into(),
            ));
        }
        let exceeds_range = u32::try_from(self.tensor_parallel)
            .map(|shards| {
                u32::from(self.port_number)
                    .checked_add(shards - 1)
                    .is_none_or(|last| last > u32::from(u16::MAX))
            })
            .unwrap_or(true);
        if exceeds_range {
            return Err(ClientError::Configuration(format!(
                "{} shards starting at port {} exceed the port range",
                self.tensor_parallel, self.port_number
            )));
        }
        Ok(())
    }

    /// Ports of the shards: `port_number, port_number + 1, ...`.
    ///
    /// # Examples
    ///
    /// ```
    /// use shard_query::{DeploymentConfig, TaskKind};
    ///
    /// let config = DeploymentConfig::new(TaskKind::TextGeneration).with_tensor_parallel(3);
    /// assert_eq!(config.shard_ports().unwrap(), vec![50050, 50051, 50052]);
    /// ```
    pub fn shard_ports(&self) -> Result<Vec<u16>> {
        self.validate()?;
        (0..self.tensor_parallel)
            .map(|offset| {
                u16::try_from(offset)
                    .ok()
                    .and_then(|offset| self.port_number.checked_add(offset))
                    .ok_or_else(|| {
                        ClientError::Configuration(format!(
                            "shard {offset} port overflows the port range"
                        ))
                    })
            })
            .collect()
    }

    /// Address of the load-balanced endpoint (or of shard 0).
    pub fn address(&self) -> EndpointAddress {
        EndpointAddress::new(self.host.clone(), self.port_number)
    }

    /// Channel options derived from `max_message_size`.
    pub fn channel_options(&self) -> ChannelOptions {
        ChannelOptions::with_max_message_size(self.max_message_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = DeploymentConfig::from_toml(r#"task = "fill-mask""#).unwrap();
        assert_eq!(config, DeploymentConfig::new(TaskKind::FillMask));
        assert!(config.enable_load_balancing);
        assert_eq!(config.max_message_size, 134_217_728);
    }

    #[test]
    fn parses_sharded_deployment() {
        let config = DeploymentConfig::from_toml(
            r#"
            task = "text-generation"
            host = "10.1.2.3"
            port_number = 6000
            tensor_parallel = 4
            enable_load_balancing = false
            "#,
        )
        .unwrap();
        assert_eq!(config.shard_ports().unwrap(), vec![6000, 6001, 6002, 6003]);
        assert_eq!(config.address().to_string(), "10.1.2.3:6000");
    }

    #[test]
    fn rejects_zero_shards() {
        let err = DeploymentConfig::from_toml("task = \"fill-mask\"\ntensor_parallel = 0").unwrap_err();
        assert!(err.to_string().contains("tensor_parallel"));
    }

    #[test]
    fn rejects_port_overflow() {
        let config = DeploymentConfig::new(TaskKind::TextGeneration)
            .with_port(65_534)
            .with_tensor_parallel(3);
        assert!(matches!(
            config.validate(),
            Err(ClientError::Configuration(_))
        ));
        assert!(config.shard_ports().is_err());
    }

    #[test]
    fn missing_task_is_an_error() {
        assert!(DeploymentConfig::from_toml("port_number = 1").is_err());
    }

    #[test]
    fn toml_round_trip_keeps_custom_task() {
        let config = DeploymentConfig::new(TaskKind::from("my-task")).with_tensor_parallel(2);
        let text = config.to_toml().unwrap();
        assert_eq!(DeploymentConfig::from_toml(&text).unwrap(), config);
    }
}
