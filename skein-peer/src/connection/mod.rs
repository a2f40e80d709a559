mod manager;
mod peer_link;
mod transport_event;

pub use manager::*;
pub use peer_link::*;
pub use transport_event::*;
