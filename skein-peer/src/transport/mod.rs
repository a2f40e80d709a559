use dashmap::DashMap;
use skein_core::{ChannelFrame, PeerId};
use std::sync::Arc;
use tracing::{debug, error};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;

/// The set of open direct channels, one per connected peer. Sends to a
/// missing or non-open channel are dropped silently; there is no
/// buffering and no backpressure signal to the caller.
#[derive(Clone, Default)]
pub struct DirectTransport {
    channels: Arc<DashMap<PeerId, Arc<RTCDataChannel>>>,
}

impl DirectTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self, peer_id: PeerId, channel: Arc<RTCDataChannel>) {
        self.channels.insert(peer_id, channel);
    }

    /// Remove a peer from the ready set. Returns true if it was present.
    pub fn remove(&self, peer_id: &PeerId) -> bool {
        self.channels.remove(peer_id).is_some()
    }

    pub fn is_open(&self, peer_id: &PeerId) -> bool {
        self.channels
            .get(peer_id)
            .map(|c| c.ready_state() == RTCDataChannelState::Open)
            .unwrap_or(false)
    }

    pub fn open_peers(&self) -> Vec<PeerId> {
        self.channels
            .iter()
            .filter(|entry| entry.value().ready_state() == RTCDataChannelState::Open)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Serialize one frame as a single JSON message and write it, if the
    /// channel is open right now.
    pub async fn send(&self, peer_id: &PeerId, frame: &ChannelFrame) {
        let Some(channel) = self.channels.get(peer_id).map(|c| c.clone()) else {
            debug!("No direct channel to {}, dropping frame", peer_id);
            return;
        };

        if channel.ready_state() != RTCDataChannelState::Open {
            debug!("Channel to {} not open, dropping frame", peer_id);
            return;
        }

        let json = match serde_json::to_string(frame) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize channel frame: {}", e);
                return;
            }
        };

        if let Err(e) = channel.send_text(json).await {
            debug!("Direct send to {} failed: {}", peer_id, e);
        }
    }

    /// Parse an inbound frame. The caller logs and discards on error.
    pub fn decode(data: &[u8]) -> serde_json::Result<ChannelFrame> {
        serde_json::from_slice(data)
    }
}
