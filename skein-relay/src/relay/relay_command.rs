use skein_core::{Chunk, Job, PeerId, SignalPayload};

/// Commands fed into the relay actor by the websocket layer.
#[derive(Debug)]
pub enum RelayCommand {
    /// A peer wants to enter a room (leaving its current one, if any).
    Join { peer_id: PeerId, room: String },

    /// Opaque negotiation payload to forward to one peer.
    Signal {
        from: PeerId,
        to: PeerId,
        payload: SignalPayload,
    },

    /// Job to fan out to every other member of the sender's room.
    Job { from: PeerId, job: Job },

    /// Result chunk to forward to one peer.
    Chunk {
        from: PeerId,
        to: PeerId,
        chunk: Chunk,
    },

    /// The peer's websocket closed.
    Disconnect { peer_id: PeerId },
}
