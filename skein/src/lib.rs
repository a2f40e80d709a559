pub use skein_core::PeerId;

pub mod model {
    pub use skein_core::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use skein_relay::*;
}

#[cfg(feature = "peer")]
pub mod peer {
    pub use skein_peer::*;
}
