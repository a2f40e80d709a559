use crate::model::job::MessageId;
use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};

/// One fragment of a streamed inference result.
///
/// Chunks for the same `message_id` are emitted in order; `done = true`
/// marks the terminal chunk. `error` is set only on synthesized terminal
/// chunks (stream deadline expiry on the receiving side).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: u64,
    pub from: PeerId,
    pub text: String,
    pub done: bool,
    pub message_id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Chunk {
    pub fn text(from: PeerId, message_id: MessageId, id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            from,
            text: text.into(),
            done: false,
            message_id,
            error: None,
        }
    }

    pub fn terminal(from: PeerId, message_id: MessageId, id: u64) -> Self {
        Self {
            id,
            from,
            text: String::new(),
            done: true,
            message_id,
            error: None,
        }
    }
}
