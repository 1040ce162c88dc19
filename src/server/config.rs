use std::time::Duration;
use crate::protocol::{DEFAULT_OUT_CHUNK_SIZE, DEFAULT_PEER_BANDWIDTH, DEFAULT_WINDOW_SIZE};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Maximum connections
    pub max_connections: usize,

    /// Chunk size announced to peers after connect
    pub out_chunk_size: u32,

    /// Window acknowledgement size
    pub window_ack_size: u32,

    /// Peer bandwidth
    pub peer_bandwidth: u32,

    /// Keep-alive ping interval
    pub ping_interval: Duration,

    /// Enable GOP cache
    pub gop_cache_enabled: bool,

    /// Upper bound on cached frames per stream
    pub gop_cache_max_frames: usize,

    /// How long video frames are counted to estimate frame rate
    pub fps_sample_window: Duration,

    /// Period of inbound throughput sampling
    pub throughput_sample_interval: Duration,

    /// Events queued per player before it is cut off from its stream
    pub subscriber_queue_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 1935,
            max_connections: 1000,
            out_chunk_size: DEFAULT_OUT_CHUNK_SIZE,
            window_ack_size: DEFAULT_WINDOW_SIZE,
            peer_bandwidth: DEFAULT_PEER_BANDWIDTH,
            ping_interval: Duration::from_secs(60),
            gop_cache_enabled: true,
            gop_cache_max_frames: 8192,
            fps_sample_window: Duration::from_secs(5),
            throughput_sample_interval: Duration::from_secs(5),
            subscriber_queue_size: 1024,
        }
    }
}

impl ServerConfig {
    /// Create config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::config("Invalid port: 0"));
        }

        if self.max_connections == 0 {
            return Err(Error::config("Invalid max_connections: 0"));
        }

        if self.out_chunk_size < 128 {
            return Err(Error::config("Chunk size must be at least 128"));
        }

        if self.out_chunk_size > 65536 {
            return Err(Error::config("Chunk size must not exceed 65536"));
        }

        if self.window_ack_size == 0 {
            return Err(Error::config("Invalid window_ack_size: 0"));
        }

        if self.fps_sample_window.is_zero() || self.throughput_sample_interval.is_zero() {
            return Err(Error::config("Sampling periods must be non-zero"));
        }

        if self.subscriber_queue_size == 0 {
            return Err(Error::config("Invalid subscriber_queue_size: 0"));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for ServerConfig
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        ServerConfigBuilder::new()
    }
}

impl ServerConfigBuilder {
    /// Create new builder
    pub fn new() -> Self {
        ServerConfigBuilder {
            config: ServerConfig::default(),
        }
    }

    /// Set host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set max connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    /// Set outgoing chunk size
    pub fn out_chunk_size(mut self, size: u32) -> Self {
        self.config.out_chunk_size = size;
        self
    }

    pub fn window_ack_size(mut self, size: u32) -> Self {
        self.config.window_ack_size = size;
        self
    }

    pub fn peer_bandwidth(mut self, size: u32) -> Self {
        self.config.peer_bandwidth = size;
        self
    }

    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.config.ping_interval = interval;
        self
    }

    pub fn gop_cache(mut self, enabled: bool) -> Self {
        self.config.gop_cache_enabled = enabled;
        self
    }

    pub fn gop_cache_max_frames(mut self, max: usize) -> Self {
        self.config.gop_cache_max_frames = max;
        self
    }

    pub fn fps_sample_window(mut self, window: Duration) -> Self {
        self.config.fps_sample_window = window;
        self
    }

    pub fn throughput_sample_interval(mut self, interval: Duration) -> Self {
        self.config.throughput_sample_interval = interval;
        self
    }

    pub fn subscriber_queue_size(mut self, size: usize) -> Self {
        self.config.subscriber_queue_size = size;
        self
    }

    /// Build configuration
    pub fn build(self) -> Result<ServerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
