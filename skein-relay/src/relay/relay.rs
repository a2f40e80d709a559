use crate::relay::registry::{JoinOutcome, RoomRegistry, RoomUpdate};
use crate::relay::relay_command::RelayCommand;
use crate::signaling::RelayOutput;
use skein_core::{Job, PeerId, SignalPayload};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// The relay actor: authoritative router for room membership and opaque
/// message forwarding. Commands are processed one at a time, so the
/// registry needs no locking. Delivery is fire-and-forget throughout; a
/// failure to reach a peer is never reported back to the sender.
pub struct Relay {
    registry: RoomRegistry,
    command_rx: mpsc::Receiver<RelayCommand>,
    output: Arc<dyn RelayOutput>,
}

impl Relay {
    pub fn new(command_rx: mpsc::Receiver<RelayCommand>, output: Arc<dyn RelayOutput>) -> Self {
        Self {
            registry: RoomRegistry::new(),
            command_rx,
            output,
        }
    }

    pub async fn run(mut self) {
        info!("Relay event loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;
        }

        info!("Relay event loop finished");
    }

    async fn handle_command(&mut self, cmd: RelayCommand) {
        match cmd {
            RelayCommand::Join { peer_id, room } => self.handle_join(peer_id, room).await,
            RelayCommand::Signal { from, to, payload } => {
                self.handle_signal(from, to, payload).await
            }
            RelayCommand::Job { from, job } => self.handle_job(from, job).await,
            RelayCommand::Chunk { from, to, chunk } => {
                self.output.send_chunk(to, from, chunk).await;
            }
            RelayCommand::Disconnect { peer_id } => self.handle_disconnect(peer_id).await,
        }
    }

    async fn handle_join(&mut self, peer_id: PeerId, room: String) {
        match self.registry.join(peer_id.clone(), &room) {
            JoinOutcome::Unchanged => {
                debug!(peer = %peer_id, room = %room, "Peer re-joined its current room");
            }
            JoinOutcome::Moved { previous, current } => {
                info!(peer = %peer_id, room = %room, "Peer joined room");

                if let Some(update) = previous {
                    self.push_roster(&update).await;
                }
                self.push_roster(&current).await;
            }
        }
    }

    async fn handle_signal(&mut self, from: PeerId, to: PeerId, payload: SignalPayload) {
        // No room-adjacency check: any peer id known to the relay is
        // addressable directly. Unknown targets are dropped at delivery.
        self.output.send_signal(to, from, payload).await;
    }

    async fn handle_job(&mut self, from: PeerId, job: Job) {
        let Some(room) = self.registry.room_of(&from) else {
            debug!(peer = %from, "Dropping job from peer with no room");
            return;
        };

        let members = self.registry.members(room);
        for member in members {
            if member == from {
                continue;
            }
            self.output.send_job(member, from.clone(), job.clone()).await;
        }
    }

    async fn handle_disconnect(&mut self, peer_id: PeerId) {
        match self.registry.session(&peer_id) {
            Some(session) => {
                info!(
                    peer = %peer_id,
                    connected_for = ?session.connected_at.elapsed(),
                    "Peer disconnected"
                );
            }
            None => info!(peer = %peer_id, "Peer disconnected before joining a room"),
        }

        if let Some(update) = self.registry.remove(&peer_id) {
            self.push_roster(&update).await;
        }
    }

    /// Push the room's roster to every member, excluding the recipient
    /// from its own copy.
    async fn push_roster(&self, update: &RoomUpdate) {
        for member in &update.members {
            let peers: Vec<PeerId> = update
                .members
                .iter()
                .filter(|id| *id != member)
                .cloned()
                .collect();
            self.output.send_roster(member.clone(), peers).await;
        }
    }
}
