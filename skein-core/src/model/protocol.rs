use crate::model::chunk::Chunk;
use crate::model::job::Job;
use crate::model::peer::PeerId;
use crate::model::signaling::SignalPayload;
use serde::{Deserialize, Serialize};

/// Messages a client sends to the relay over the signaling websocket.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "op", content = "d")]
pub enum ClientMessage {
    Join { room: String },
    Signal { to: PeerId, payload: SignalPayload },
    Job { job: Job },
    Chunk { to: PeerId, chunk: Chunk },
}

/// Messages the relay pushes to a client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "op", content = "d")]
pub enum ServerMessage {
    Welcome { peer_id: PeerId },
    /// Current members of the recipient's room, recipient excluded.
    Roster { peers: Vec<PeerId> },
    Signal { from: PeerId, payload: SignalPayload },
    Job { from: PeerId, job: Job },
    Chunk { from: PeerId, chunk: Chunk },
}
