use crate::model::chunk::Chunk;
use crate::model::job::Job;
use serde::{Deserialize, Serialize};

/// Direct-channel wire format: one JSON message per frame.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum ChannelFrame {
    Job(Job),
    Chunk(Chunk),
}
