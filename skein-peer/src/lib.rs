mod client;
mod config;
mod connection;
mod error;
mod events;
mod protocol;
mod signaling;
mod transport;

pub use client::{MeshClient, MeshCommand, MeshHandle};
pub use config::{MeshConfig, TransportConfig};
pub use connection::{ConnectionManager, PeerLink, TransportEvent};
pub use error::MeshError;
pub use events::MeshEvent;
pub use protocol::{DedupWindow, StreamTracker};
pub use signaling::RelayClient;
pub use transport::DirectTransport;
