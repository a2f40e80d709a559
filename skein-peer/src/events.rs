use skein_core::{Chunk, Job, PeerId};

/// What the mesh surfaces to the UI layer. Jobs and chunks are already
/// deduplicated across the relay and direct-channel paths.
#[derive(Debug, Clone)]
pub enum MeshEvent {
    /// Current room members, self excluded.
    Roster { peers: Vec<PeerId> },

    /// A direct channel to this peer opened.
    PeerConnected { peer_id: PeerId },

    /// The direct channel to this peer is gone; traffic falls back to
    /// the relay until the next roster reconciliation.
    PeerDisconnected { peer_id: PeerId },

    Job(Job),

    Chunk(Chunk),
}
