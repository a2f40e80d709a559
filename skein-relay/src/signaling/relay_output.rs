use async_trait::async_trait;
use skein_core::{Chunk, Job, PeerId, SignalPayload};

/// Delivery seam between the relay actor and whatever owns the peer
/// connections (the websocket service in production, a mock in tests).
/// Every method is fire-and-forget: implementations drop traffic for
/// unknown peers without reporting back.
#[async_trait]
pub trait RelayOutput: Send + Sync {
    /// Push a room roster to one peer (the recipient is already excluded).
    async fn send_roster(&self, peer_id: PeerId, peers: Vec<PeerId>);

    /// Forward an opaque negotiation payload.
    async fn send_signal(&self, peer_id: PeerId, from: PeerId, payload: SignalPayload);

    /// Forward a job from a room neighbour.
    async fn send_job(&self, peer_id: PeerId, from: PeerId, job: Job);

    /// Forward a result chunk.
    async fn send_chunk(&self, peer_id: PeerId, from: PeerId, chunk: Chunk);
}
