use std::time::Duration;

/// WebRTC transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec!["stun:stun.l.google.com:19302".to_owned()],
        }
    }
}

/// Client-side mesh configuration.
#[derive(Debug, Clone)]
pub struct MeshConfig {
    /// Relay websocket endpoint, e.g. `ws://127.0.0.1:3000/ws`.
    pub relay_url: String,

    pub transport: TransportConfig,

    /// A chunk stream with no terminal chunk within this window is
    /// finalized with a synthesized error chunk.
    pub stream_timeout: Duration,

    /// How often expired streams are swept.
    pub sweep_interval: Duration,

    /// Bound on the recently-seen job/chunk id windows used to collapse
    /// dual-path duplicates.
    pub dedup_capacity: usize,
}

impl MeshConfig {
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            transport: TransportConfig::default(),
            stream_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(1),
            dedup_capacity: 1024,
        }
    }
}
