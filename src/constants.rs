//! Defaults shared by configuration and transports.

/// Maximum send and receive message size for endpoint channels (128 MiB).
pub const MAX_MESSAGE_SIZE: usize = 1 << 27;

/// Host used when a deployment does not name one.
pub const DEFAULT_HOST: &str = "localhost";

/// First port of a deployment when none is configured.
pub const DEFAULT_PORT: u16 = 50050;
