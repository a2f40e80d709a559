use crate::protocol::DedupWindow;
use skein_core::{Chunk, MessageId, PeerId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct OpenStream {
    from: PeerId,
    last_chunk_id: u64,
    deadline: Instant,
}

/// Tracks in-flight chunk streams by message id. A sender can disconnect
/// mid-stream without ever sending `done`; the tracker's deadline sweep
/// synthesizes an error-marked terminal chunk so the consumer's message
/// is not left incomplete forever.
///
/// Terminated streams stay in a bounded finalized window so a straggler
/// chunk cannot reopen one or produce a second terminal marker.
pub struct StreamTracker {
    streams: HashMap<MessageId, OpenStream>,
    finalized: DedupWindow<MessageId>,
    timeout: Duration,
}

impl StreamTracker {
    pub fn new(timeout: Duration, finalized_capacity: usize) -> Self {
        Self {
            streams: HashMap::new(),
            finalized: DedupWindow::new(finalized_capacity),
            timeout,
        }
    }

    /// Account for one delivered chunk. Terminal chunks close the
    /// stream; any other chunk opens or refreshes it. Returns false for
    /// a chunk belonging to an already-finalized stream, which the
    /// caller must drop.
    pub fn observe(&mut self, chunk: &Chunk, now: Instant) -> bool {
        if self.finalized.contains(&chunk.message_id) {
            return false;
        }

        if chunk.done {
            self.streams.remove(&chunk.message_id);
            self.finalized.insert(chunk.message_id.clone());
            return true;
        }

        let deadline = now + self.timeout;
        self.streams
            .entry(chunk.message_id.clone())
            .and_modify(|s| {
                s.last_chunk_id = s.last_chunk_id.max(chunk.id);
                s.deadline = deadline;
            })
            .or_insert(OpenStream {
                from: chunk.from.clone(),
                last_chunk_id: chunk.id,
                deadline,
            });
        true
    }

    /// Close every stream whose deadline has passed, returning one
    /// synthesized terminal chunk per expired stream.
    pub fn expire(&mut self, now: Instant) -> Vec<Chunk> {
        let expired: Vec<MessageId> = self
            .streams
            .iter()
            .filter(|(_, s)| s.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|message_id| {
                let stream = self.streams.remove(&message_id)?;
                self.finalized.insert(message_id.clone());
                Some(Chunk {
                    id: stream.last_chunk_id + 1,
                    from: stream.from,
                    text: String::new(),
                    done: true,
                    message_id,
                    error: Some("stream timed out before completion".to_string()),
                })
            })
            .collect()
    }

    pub fn open_streams(&self) -> usize {
        self.streams.len()
    }
}
