//! Configuration for coralkv sessions
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

/// Default device port
pub const DEFAULT_PORT: u16 = 8123;

/// Configuration for a session
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// How long to wait for the TCP connect and the handshake frame
    pub connect_timeout: Duration,

    // -------------------------------------------------------------------------
    // Request Configuration
    // -------------------------------------------------------------------------
    /// How long `send` waits for a response before returning `Timeout`.
    ///
    /// `None` waits indefinitely. The timeout bounds the local wait only; it
    /// does not cancel the operation on the device.
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            request_timeout: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the connect/handshake timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the default per-request timeout
    pub fn request_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.config.request_timeout = timeout.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
