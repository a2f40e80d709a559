use crate::relay::RelayCommand;
use crate::signaling::RelayOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use skein_core::{Chunk, Job, PeerId, ServerMessage, SignalPayload};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

struct SignalingInner {
    peers: DashMap<PeerId, mpsc::UnboundedSender<Message>>,
}

/// Owns the websocket send-halves and serializes relay output onto them.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    pub(crate) relay_cmd_tx: mpsc::Sender<RelayCommand>,
}

impl SignalingService {
    pub fn new(relay_cmd_tx: mpsc::Sender<RelayCommand>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
            }),
            relay_cmd_tx,
        }
    }

    pub fn add_peer(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.peers.insert(peer_id, tx);
    }

    pub fn remove_peer(&self, peer_id: &PeerId) {
        self.inner.peers.remove(peer_id);
    }

    pub fn connected_peers(&self) -> usize {
        self.inner.peers.len()
    }

    /// Serialize and push one message. Unknown or closed peers are
    /// dropped here with a log line and nothing else.
    pub fn push(&self, peer_id: PeerId, msg: ServerMessage) {
        if let Some(peer) = self.inner.peers.get(&peer_id) {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if let Err(e) = peer.send(Message::Text(json.into())) {
                        error!("Failed to send WS message to {}: {:?}", peer_id, e);
                    }
                }
                Err(e) => error!("Failed to serialize server message: {}", e),
            }
        } else {
            warn!("Dropping message addressed to unknown peer {}", peer_id);
        }
    }
}

#[async_trait]
impl RelayOutput for SignalingService {
    async fn send_roster(&self, peer_id: PeerId, peers: Vec<PeerId>) {
        self.push(peer_id, ServerMessage::Roster { peers });
    }

    async fn send_signal(&self, peer_id: PeerId, from: PeerId, payload: SignalPayload) {
        self.push(peer_id, ServerMessage::Signal { from, payload });
    }

    async fn send_job(&self, peer_id: PeerId, from: PeerId, job: Job) {
        self.push(peer_id, ServerMessage::Job { from, job });
    }

    async fn send_chunk(&self, peer_id: PeerId, from: PeerId, chunk: Chunk) {
        self.push(peer_id, ServerMessage::Chunk { from, chunk });
    }
}
