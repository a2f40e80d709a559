use crate::config::MeshConfig;
use crate::connection::{ConnectionManager, TransportEvent};
use crate::error::MeshError;
use crate::events::MeshEvent;
use crate::protocol::{DedupWindow, StreamTracker};
use crate::signaling::RelayClient;
use crate::transport::DirectTransport;
use skein_core::{
    ChannelFrame, Chunk, ClientMessage, Job, JobId, MessageId, PeerId, ServerMessage,
};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Commands from the UI layer into the mesh event loop.
#[derive(Debug)]
pub enum MeshCommand {
    JoinRoom(String),
    BroadcastJob(Job),
    SendChunk(PeerId, Chunk),
    Shutdown,
}

/// Clonable front for the mesh event loop, handed to the UI layer.
#[derive(Clone)]
pub struct MeshHandle {
    peer_id: PeerId,
    cmd_tx: mpsc::Sender<MeshCommand>,
}

impl MeshHandle {
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub async fn join_room(&self, room: impl Into<String>) -> Result<(), MeshError> {
        self.send(MeshCommand::JoinRoom(room.into())).await
    }

    pub async fn broadcast_job(&self, job: Job) -> Result<(), MeshError> {
        self.send(MeshCommand::BroadcastJob(job)).await
    }

    pub async fn send_chunk(&self, to: PeerId, chunk: Chunk) -> Result<(), MeshError> {
        self.send(MeshCommand::SendChunk(to, chunk)).await
    }

    pub async fn shutdown(&self) -> Result<(), MeshError> {
        self.send(MeshCommand::Shutdown).await
    }

    async fn send(&self, cmd: MeshCommand) -> Result<(), MeshError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| MeshError::LoopClosed)
    }
}

/// The client-side mesh actor: one event loop over relay messages,
/// transport events, UI commands and the stream-deadline sweep. All mesh
/// state is owned here and touched by one event at a time.
pub struct MeshClient {
    self_id: PeerId,
    relay: RelayClient,
    manager: ConnectionManager,
    transport: DirectTransport,
    server_rx: mpsc::Receiver<ServerMessage>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    cmd_rx: mpsc::Receiver<MeshCommand>,
    event_tx: mpsc::Sender<MeshEvent>,
    job_dedup: DedupWindow<JobId>,
    chunk_dedup: DedupWindow<(MessageId, u64)>,
    streams: StreamTracker,
    sweep_interval: Duration,
}

impl MeshClient {
    /// Connect to the relay, wait for the assigned peer id, and spawn
    /// the event loop.
    pub async fn connect(
        config: MeshConfig,
    ) -> Result<(MeshHandle, mpsc::Receiver<MeshEvent>), MeshError> {
        let (relay, mut server_rx) = RelayClient::connect(&config.relay_url).await?;

        let self_id = loop {
            match server_rx.recv().await {
                Some(ServerMessage::Welcome { peer_id }) => break peer_id,
                Some(other) => debug!("Ignoring pre-welcome message: {:?}", other),
                None => return Err(MeshError::NoWelcome),
            }
        };
        info!("Relay assigned peer id {}", self_id);

        let (transport_tx, transport_rx) = mpsc::channel(256);
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(256);

        let manager = ConnectionManager::new(
            self_id.clone(),
            config.transport.clone(),
            relay.clone(),
            transport_tx,
        );

        let client = Self {
            self_id: self_id.clone(),
            relay,
            manager,
            transport: DirectTransport::new(),
            server_rx,
            transport_rx,
            cmd_rx,
            event_tx,
            job_dedup: DedupWindow::new(config.dedup_capacity),
            chunk_dedup: DedupWindow::new(config.dedup_capacity),
            streams: StreamTracker::new(config.stream_timeout, config.dedup_capacity),
            sweep_interval: config.sweep_interval,
        };
        tokio::spawn(client.run());

        Ok((
            MeshHandle {
                peer_id: self_id,
                cmd_tx,
            },
            event_rx,
        ))
    }

    pub async fn run(mut self) {
        info!("Mesh client event loop started");

        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                msg = self.server_rx.recv() => {
                    match msg {
                        Some(m) => self.handle_server_message(m).await,
                        None => {
                            info!("Relay connection closed, shutting down");
                            break;
                        }
                    }
                }

                evt = self.transport_rx.recv() => {
                    match evt {
                        Some(e) => self.handle_transport_event(e).await,
                        None => {
                            warn!("Transport channel closed unexpectedly");
                            break;
                        }
                    }
                }

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(MeshCommand::Shutdown) | None => break,
                        Some(c) => self.handle_command(c).await,
                    }
                }

                _ = sweep.tick() => self.sweep_streams().await,
            }
        }

        self.manager.shutdown().await;
        info!("Mesh client event loop finished");
    }

    async fn handle_server_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Welcome { peer_id } => {
                debug!("Duplicate welcome for {} ignored", peer_id);
            }
            ServerMessage::Roster { peers } => {
                debug!("Roster update: {} peers", peers.len());
                self.emit(MeshEvent::Roster {
                    peers: peers.clone(),
                })
                .await;
                self.manager.reconcile(&peers).await;
            }
            ServerMessage::Signal { from, payload } => {
                self.manager.handle_signal(from, payload).await;
            }
            ServerMessage::Job { from: _, job } => self.ingest_job(job).await,
            ServerMessage::Chunk { from: _, chunk } => self.ingest_chunk(chunk).await,
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::ChannelOpen(peer_id, channel) => {
                self.transport.mark_ready(peer_id.clone(), channel);
                self.emit(MeshEvent::PeerConnected { peer_id }).await;
            }
            TransportEvent::ChannelClosed(peer_id) => {
                if self.transport.remove(&peer_id) {
                    self.emit(MeshEvent::PeerDisconnected { peer_id }).await;
                }
            }
            TransportEvent::Message(peer_id, data) => match DirectTransport::decode(&data) {
                Ok(ChannelFrame::Job(job)) => self.ingest_job(job).await,
                Ok(ChannelFrame::Chunk(chunk)) => self.ingest_chunk(chunk).await,
                Err(e) => warn!("Malformed frame from {}: {}", peer_id, e),
            },
            TransportEvent::Disconnected(peer_id) => {
                self.manager.remove_link(&peer_id).await;
                if self.transport.remove(&peer_id) {
                    self.emit(MeshEvent::PeerDisconnected { peer_id }).await;
                }
            }
            TransportEvent::CandidateGenerated(peer_id, payload) => {
                self.relay.send(ClientMessage::Signal {
                    to: peer_id,
                    payload,
                });
            }
        }
    }

    async fn handle_command(&mut self, cmd: MeshCommand) {
        match cmd {
            MeshCommand::JoinRoom(room) => {
                info!("Joining room '{}' as {}", room, self.self_id);
                self.relay.send(ClientMessage::Join { room });
            }
            MeshCommand::BroadcastJob(job) => self.broadcast_job(job).await,
            MeshCommand::SendChunk(to, chunk) => self.send_chunk(to, chunk).await,
            MeshCommand::Shutdown => unreachable!("handled in the event loop"),
        }
    }

    /// Dual-path delivery: room fan-out through the relay plus a direct
    /// copy to every open channel. Receivers collapse the duplicates.
    async fn broadcast_job(&mut self, job: Job) {
        self.relay.send(ClientMessage::Job { job: job.clone() });

        for peer_id in self.transport.open_peers() {
            self.transport
                .send(&peer_id, &ChannelFrame::Job(job.clone()))
                .await;
        }
    }

    async fn send_chunk(&mut self, to: PeerId, chunk: Chunk) {
        self.relay.send(ClientMessage::Chunk {
            to: to.clone(),
            chunk: chunk.clone(),
        });

        self.transport.send(&to, &ChannelFrame::Chunk(chunk)).await;
    }

    async fn ingest_job(&mut self, job: Job) {
        if !self.job_dedup.insert(job.id.clone()) {
            debug!("Duplicate job {} suppressed", job.id);
            return;
        }
        self.emit(MeshEvent::Job(job)).await;
    }

    async fn ingest_chunk(&mut self, chunk: Chunk) {
        if !self.chunk_dedup.insert((chunk.message_id.clone(), chunk.id)) {
            debug!("Duplicate chunk {}/{} suppressed", chunk.message_id, chunk.id);
            return;
        }
        if !self.streams.observe(&chunk, Instant::now()) {
            debug!(
                "Chunk {}/{} for a finalized stream dropped",
                chunk.message_id, chunk.id
            );
            return;
        }
        self.emit(MeshEvent::Chunk(chunk)).await;
    }

    async fn sweep_streams(&mut self) {
        for chunk in self.streams.expire(Instant::now()) {
            warn!(
                "Stream {} timed out, synthesizing terminal chunk",
                chunk.message_id
            );
            self.emit(MeshEvent::Chunk(chunk)).await;
        }
    }

    async fn emit(&self, event: MeshEvent) {
        if self.event_tx.send(event).await.is_err() {
            debug!("Mesh event dropped: no consumer");
        }
    }
}
