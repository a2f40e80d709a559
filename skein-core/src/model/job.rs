use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlates a job and its result chunks to one UI message.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generation parameters passed through to the inference engine untouched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct JobParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A unit of inference work. Immutable once created.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub prompt: String,
    #[serde(default)]
    pub params: JobParams,
    pub message_id: MessageId,
    pub origin: PeerId,
}

impl Job {
    pub fn new(prompt: impl Into<String>, params: JobParams, origin: PeerId) -> Self {
        Self {
            id: JobId::new(),
            prompt: prompt.into(),
            params,
            message_id: MessageId::new(),
            origin,
        }
    }
}
