use crate::config::TransportConfig;
use crate::connection::transport_event::TransportEvent;
use anyhow::{Context, Result};
use bytes::Bytes;
use skein_core::{PeerId, SignalPayload};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

const CHANNEL_LABEL: &str = "skein";

/// Negotiation state machine for exactly one remote peer.
///
/// Remote ICE candidates that arrive before the remote description are
/// queued and flushed once the description is applied; applying them
/// immediately fails silently inside the ICE agent.
pub struct PeerLink {
    pub peer_id: PeerId,
    peer_connection: Arc<RTCPeerConnection>,
    event_tx: mpsc::Sender<TransportEvent>,
    pending_candidates: Arc<Mutex<Vec<RTCIceCandidateInit>>>,
    has_remote_description: Arc<AtomicBool>,
}

impl PeerLink {
    pub async fn new(
        peer_id: PeerId,
        config: &TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: config.ice_servers.clone(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        // Failed and closed are terminal: the manager drops the link and
        // waits for the next roster to rebuild it.
        let state_tx = event_tx.clone();
        let state_peer = peer_id.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let peer = state_peer.clone();

                Box::pin(async move {
                    info!("Connection state for {}: {:?}", peer, state);
                    match state {
                        RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed => {
                            let _ = tx.send(TransportEvent::Disconnected(peer)).await;
                        }
                        _ => {}
                    }
                })
            },
        ));

        // Trickle ICE: relay local candidates as they are discovered.
        let ice_tx = event_tx.clone();
        let ice_peer = peer_id.clone();
        peer_connection.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let peer = ice_peer.clone();

            Box::pin(async move {
                let Some(candidate) = candidate else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let payload = SignalPayload::Candidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                };
                let _ = tx
                    .send(TransportEvent::CandidateGenerated(peer, payload))
                    .await;
            })
        }));

        // Responder side: the initiator opens the channel, we bind it.
        let dc_tx = event_tx.clone();
        let dc_peer = peer_id.clone();
        peer_connection.on_data_channel(Box::new(move |channel: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            let peer = dc_peer.clone();

            Box::pin(async move {
                debug!("Inbound channel '{}' from {}", channel.label(), peer);
                wire_channel(peer, channel, tx);
            })
        }));

        Ok(Self {
            peer_id,
            peer_connection,
            event_tx,
            pending_candidates: Arc::new(Mutex::new(Vec::new())),
            has_remote_description: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Initiator side: open the direct channel eagerly, before the offer
    /// is produced, so it rides the first negotiation.
    pub async fn open_channel(&self) -> Result<()> {
        let channel = self
            .peer_connection
            .create_data_channel(CHANNEL_LABEL, None)
            .await
            .context("Failed to create data channel")?;

        wire_channel(self.peer_id.clone(), channel, self.event_tx.clone());
        Ok(())
    }

    /// Produce a local offer and install it as the local description.
    pub async fn create_offer(&self) -> Result<String> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(offer.sdp)
    }

    /// Produce an answer for an already-applied remote offer.
    pub async fn create_answer(&self) -> Result<String> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(answer.sdp)
    }

    pub async fn set_remote_offer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::offer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        self.mark_remote_and_flush().await;
        Ok(())
    }

    pub async fn set_remote_answer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::answer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        self.mark_remote_and_flush().await;
        Ok(())
    }

    /// Add a remote candidate, queueing it if the remote description is
    /// not in place yet.
    pub async fn add_remote_candidate(&self, init: RTCIceCandidateInit) -> Result<()> {
        if !self.has_remote_description.load(Ordering::Acquire) {
            debug!("Queueing early candidate from {}", self.peer_id);
            self.pending_candidates.lock().await.push(init);
            return Ok(());
        }
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }

    pub fn connection_state(&self) -> RTCPeerConnectionState {
        self.peer_connection.connection_state()
    }

    async fn mark_remote_and_flush(&self) {
        self.has_remote_description.store(true, Ordering::Release);

        let queued: Vec<RTCIceCandidateInit> =
            self.pending_candidates.lock().await.drain(..).collect();
        for init in queued {
            if let Err(e) = self.peer_connection.add_ice_candidate(init).await {
                warn!("Failed to apply queued candidate for {}: {:?}", self.peer_id, e);
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn pending_candidate_count(&self) -> usize {
        self.pending_candidates.lock().await.len()
    }
}

/// Hook a data channel's lifecycle and traffic into the transport event
/// stream. Used for both the eagerly-opened and the inbound channel.
fn wire_channel(peer_id: PeerId, channel: Arc<RTCDataChannel>, tx: mpsc::Sender<TransportEvent>) {
    let open_channel = channel.clone();
    let open_tx = tx.clone();
    let open_peer = peer_id.clone();
    channel.on_open(Box::new(move || {
        let tx = open_tx.clone();
        let peer = open_peer.clone();
        let ready = open_channel.clone();

        Box::pin(async move {
            info!("Direct channel open for {}", peer);
            let _ = tx.send(TransportEvent::ChannelOpen(peer, ready)).await;
        })
    }));

    let close_tx = tx.clone();
    let close_peer = peer_id.clone();
    channel.on_close(Box::new(move || {
        let tx = close_tx.clone();
        let peer = close_peer.clone();

        Box::pin(async move {
            debug!("Direct channel closed for {}", peer);
            let _ = tx.send(TransportEvent::ChannelClosed(peer)).await;
        })
    }));

    let msg_tx = tx;
    let msg_peer = peer_id;
    channel.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = msg_tx.clone();
        let peer = msg_peer.clone();

        Box::pin(async move {
            let bytes = Bytes::from(msg.data.to_vec());
            let _ = tx.send(TransportEvent::Message(peer, bytes)).await;
        })
    }));
}
