use crate::relay::RelayCommand;
use crate::signaling::SignalingService;
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use skein_core::{ClientMessage, PeerId, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

pub struct AppState {
    pub signaling: SignalingService,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // Peer ids are relay-assigned; clients learn theirs from Welcome.
    let peer_id = PeerId::new();

    ws.on_upgrade(move |socket| handle_socket(socket, peer_id, state.signaling.clone()))
}

async fn handle_socket(socket: WebSocket, peer_id: PeerId, service: SignalingService) {
    info!("New WebSocket connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    service.add_peer(peer_id.clone(), tx);
    service.push(
        peer_id.clone(),
        ServerMessage::Welcome {
            peer_id: peer_id.clone(),
        },
    );

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let peer_id = peer_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(client_msg) => {
                            let cmd = to_command(peer_id.clone(), client_msg);
                            if service.relay_cmd_tx.send(cmd).await.is_err() {
                                warn!("Relay actor is gone, closing socket for {}", peer_id);
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid message from {}: {:?}", peer_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }

            let _ = service
                .relay_cmd_tx
                .send(RelayCommand::Disconnect {
                    peer_id: peer_id.clone(),
                })
                .await;
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.remove_peer(&peer_id);
    info!("WebSocket disconnected: {}", peer_id);
}

fn to_command(peer_id: PeerId, msg: ClientMessage) -> RelayCommand {
    match msg {
        ClientMessage::Join { room } => RelayCommand::Join { peer_id, room },
        ClientMessage::Signal { to, payload } => RelayCommand::Signal {
            from: peer_id,
            to,
            payload,
        },
        ClientMessage::Job { job } => RelayCommand::Job { from: peer_id, job },
        ClientMessage::Chunk { to, chunk } => RelayCommand::Chunk {
            from: peer_id,
            to,
            chunk,
        },
    }
}
