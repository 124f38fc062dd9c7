//! Endpoint clients: one endpoint, a shard set, and a blocking facade.

pub mod blocking;
pub mod endpoint;
pub mod fanout;

pub use blocking::BlockingCoordinator;
pub use endpoint::EndpointClient;
pub use fanout::FanoutCoordinator;
