mod chunk;
mod frame;
mod job;
mod peer;
mod protocol;
mod signaling;

pub use chunk::Chunk;
pub use frame::ChannelFrame;
pub use job::{Job, JobId, JobParams, MessageId};
pub use peer::PeerId;
pub use protocol::{ClientMessage, ServerMessage};
pub use signaling::SignalPayload;
