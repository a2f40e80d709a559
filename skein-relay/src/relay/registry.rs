use skein_core::PeerId;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Relay-side record for one connected peer. Lives only while the peer's
/// websocket is open and it has joined a room.
#[derive(Debug)]
pub struct PeerSession {
    pub room: String,
    pub connected_at: Instant,
}

/// Membership snapshot of one room after a change.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomUpdate {
    pub room: String,
    pub members: Vec<PeerId>,
}

/// Result of a join: where the peer left from and where it landed.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// The peer re-joined the room it was already in; no membership change.
    Unchanged,
    Moved {
        /// Previous room, only if other members remain in it.
        previous: Option<RoomUpdate>,
        /// Target room including the peer that just joined.
        current: RoomUpdate,
    },
}

/// Room membership state, owned by the relay actor. Rooms are created
/// implicitly on first join and discarded when the last member leaves.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, HashSet<PeerId>>,
    sessions: HashMap<PeerId, PeerSession>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a peer into `room`, atomically leaving its previous room.
    pub fn join(&mut self, peer_id: PeerId, room: &str) -> JoinOutcome {
        if let Some(session) = self.sessions.get(&peer_id) {
            if session.room == room {
                return JoinOutcome::Unchanged;
            }
        }

        // Room moves keep the original connection timestamp.
        let connected_at = self
            .sessions
            .get(&peer_id)
            .map(|s| s.connected_at)
            .unwrap_or_else(Instant::now);

        let previous = self.leave_current(&peer_id);

        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(peer_id.clone());
        self.sessions.insert(
            peer_id,
            PeerSession {
                room: room.to_string(),
                connected_at,
            },
        );

        JoinOutcome::Moved {
            previous,
            current: RoomUpdate {
                room: room.to_string(),
                members: self.members(room),
            },
        }
    }

    /// Remove a peer entirely (websocket closed). Returns the update for
    /// its former room if other members remain there.
    pub fn remove(&mut self, peer_id: &PeerId) -> Option<RoomUpdate> {
        let previous = self.leave_current(peer_id);
        self.sessions.remove(peer_id);
        previous
    }

    pub fn room_of(&self, peer_id: &PeerId) -> Option<&str> {
        self.sessions.get(peer_id).map(|s| s.room.as_str())
    }

    pub fn session(&self, peer_id: &PeerId) -> Option<&PeerSession> {
        self.sessions.get(peer_id)
    }

    pub fn members(&self, room: &str) -> Vec<PeerId> {
        self.rooms
            .get(room)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn leave_current(&mut self, peer_id: &PeerId) -> Option<RoomUpdate> {
        let room = self.sessions.get(peer_id)?.room.clone();

        let emptied = match self.rooms.get_mut(&room) {
            Some(members) => {
                members.remove(peer_id);
                members.is_empty()
            }
            None => return None,
        };

        if emptied {
            self.rooms.remove(&room);
            return None;
        }

        Some(RoomUpdate {
            members: self.members(&room),
            room,
        })
    }
}
