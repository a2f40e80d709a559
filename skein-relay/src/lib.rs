mod relay;
mod signaling;

pub use relay::{JoinOutcome, Relay, RelayCommand, RoomRegistry, RoomUpdate};
pub use signaling::{AppState, RelayOutput, SignalingService, router, ws_handler};

use std::sync::Arc;
use tokio::sync::mpsc;

/// Wire up a relay actor and its websocket service, ready to serve.
///
/// The returned service is already connected to a spawned [`Relay`] event
/// loop; drop every clone of it to shut the relay down.
pub fn bootstrap() -> (axum::Router, SignalingService) {
    let (cmd_tx, cmd_rx) = mpsc::channel(256);
    let signaling = SignalingService::new(cmd_tx);

    let relay = Relay::new(cmd_rx, Arc::new(signaling.clone()));
    tokio::spawn(relay.run());

    let state = Arc::new(AppState {
        signaling: signaling.clone(),
    });

    (router(state), signaling)
}
