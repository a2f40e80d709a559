use crate::config::TransportConfig;
use crate::connection::peer_link::PeerLink;
use crate::connection::transport_event::TransportEvent;
use crate::signaling::RelayClient;
use anyhow::Result;
use skein_core::{ClientMessage, PeerId, SignalPayload};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;

/// Converges the set of live peer links to the current room roster and
/// drives the negotiation handshake for each.
pub struct ConnectionManager {
    self_id: PeerId,
    config: TransportConfig,
    links: HashMap<PeerId, PeerLink>,
    event_tx: mpsc::Sender<TransportEvent>,
    relay: RelayClient,
}

impl ConnectionManager {
    pub fn new(
        self_id: PeerId,
        config: TransportConfig,
        relay: RelayClient,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Self {
        Self {
            self_id,
            config,
            links: HashMap::new(),
            event_tx,
            relay,
        }
    }

    /// Tie-break for simultaneous reconciliation: the lower peer id
    /// always initiates, the other side waits for the offer.
    pub fn initiates_to(&self, peer_id: &PeerId) -> bool {
        self.self_id < *peer_id
    }

    /// Bring the link set in line with the latest roster. Links to
    /// departed peers are closed; missing links where we are the
    /// initiator are opened and offered.
    pub async fn reconcile(&mut self, roster: &[PeerId]) {
        let stale: Vec<PeerId> = self
            .links
            .keys()
            .filter(|id| !roster.contains(id))
            .cloned()
            .collect();
        for peer_id in stale {
            info!("Dropping link to departed peer {}", peer_id);
            self.remove_link(&peer_id).await;
        }

        for peer_id in roster {
            if *peer_id == self.self_id || self.links.contains_key(peer_id) {
                continue;
            }
            if !self.initiates_to(peer_id) {
                debug!("Waiting for offer from {}", peer_id);
                continue;
            }
            if let Err(e) = self.initiate(peer_id.clone()).await {
                warn!("Failed to initiate link to {}: {:?}", peer_id, e);
                self.remove_link(peer_id).await;
            }
        }
    }

    /// Handle one inbound signal, creating a responder-side link on
    /// demand. Failures are logged and dropped; the next roster update
    /// repairs whatever is left inconsistent.
    pub async fn handle_signal(&mut self, from: PeerId, payload: SignalPayload) {
        let created_here = !self.links.contains_key(&from);
        if let Err(e) = self.apply_signal(from.clone(), payload).await {
            warn!("Dropping bad signal from {}: {:?}", from, e);
            // A link born from a signal that failed to apply never
            // negotiates, and reconcile would skip the peer while it
            // exists. Tear it down so the next roster can re-initiate.
            if created_here {
                self.remove_link(&from).await;
            }
        }
    }

    /// Close and forget the link to one peer. Idempotent.
    pub async fn remove_link(&mut self, peer_id: &PeerId) {
        if let Some(link) = self.links.remove(peer_id) {
            let _ = link.close().await;
        }
    }

    pub async fn shutdown(&mut self) {
        let peers: Vec<PeerId> = self.links.keys().cloned().collect();
        for peer_id in peers {
            self.remove_link(&peer_id).await;
        }
    }

    pub fn linked_peers(&self) -> Vec<PeerId> {
        self.links.keys().cloned().collect()
    }

    pub fn has_link(&self, peer_id: &PeerId) -> bool {
        self.links.contains_key(peer_id)
    }

    async fn initiate(&mut self, peer_id: PeerId) -> Result<()> {
        info!("Initiating connection to {}", peer_id);

        let link = PeerLink::new(peer_id.clone(), &self.config, self.event_tx.clone()).await?;
        link.open_channel().await?;
        let sdp = link.create_offer().await?;
        self.links.insert(peer_id.clone(), link);

        self.relay.send(ClientMessage::Signal {
            to: peer_id,
            payload: SignalPayload::Offer { sdp },
        });
        Ok(())
    }

    async fn apply_signal(&mut self, from: PeerId, payload: SignalPayload) -> Result<()> {
        if !self.links.contains_key(&from) {
            debug!("Creating responder link for {}", from);
            let link = PeerLink::new(from.clone(), &self.config, self.event_tx.clone()).await?;
            self.links.insert(from.clone(), link);
        }
        let Some(link) = self.links.get(&from) else {
            return Ok(());
        };

        match payload {
            SignalPayload::Offer { sdp } => {
                link.set_remote_offer(sdp).await?;
                let answer = link.create_answer().await?;
                self.relay.send(ClientMessage::Signal {
                    to: from,
                    payload: SignalPayload::Answer { sdp: answer },
                });
            }
            SignalPayload::Answer { sdp } => {
                link.set_remote_answer(sdp).await?;
            }
            SignalPayload::Candidate {
                candidate,
                sdp_mid,
                sdp_m_line_index,
            } => {
                let init = RTCIceCandidateInit {
                    candidate,
                    sdp_mid,
                    sdp_mline_index: sdp_m_line_index,
                    username_fragment: None,
                };
                link.add_remote_candidate(init).await?;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn link(&self, peer_id: &PeerId) -> Option<&PeerLink> {
        self.links.get(peer_id)
    }
}
