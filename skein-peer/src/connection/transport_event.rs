use bytes::Bytes;
use skein_core::{PeerId, SignalPayload};
use std::sync::Arc;
use webrtc::data_channel::RTCDataChannel;

/// Events surfaced by per-peer connections to the client event loop.
pub enum TransportEvent {
    /// A direct channel to this peer is open and writable.
    ChannelOpen(PeerId, Arc<RTCDataChannel>),

    /// The direct channel closed; the connection itself may still live.
    ChannelClosed(PeerId),

    /// One framed message from the peer's direct channel.
    Message(PeerId, Bytes),

    /// The connection reached a terminal state and must be dropped.
    Disconnected(PeerId),

    /// Trickle ICE: a local candidate to relay to the peer.
    CandidateGenerated(PeerId, SignalPayload),
}
