use futures::{SinkExt, StreamExt};
use skein_core::{ClientMessage, PeerId, ServerMessage, SignalPayload};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::init_tracing;

struct WsClient {
    peer_id: PeerId,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Connect and consume the Welcome frame.
    async fn connect(addr: SocketAddr) -> Self {
        let (stream, _) = connect_async(format!("ws://{addr}/ws"))
            .await
            .expect("websocket connect failed");
        let mut client = Self {
            peer_id: PeerId::new(),
            stream,
        };

        match client.recv().await {
            ServerMessage::Welcome { peer_id } => client.peer_id = peer_id,
            other => panic!("expected Welcome, got {other:?}"),
        }
        client
    }

    async fn send(&mut self, msg: ClientMessage) {
        let json = serde_json::to_string(&msg).unwrap();
        self.stream.send(Message::Text(json)).await.unwrap();
    }

    async fn recv(&mut self) -> ServerMessage {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), self.stream.next())
                .await
                .expect("timed out waiting for server message")
                .expect("websocket closed")
                .expect("websocket error");
            if let Message::Text(text) = msg {
                return serde_json::from_str(&text).expect("unparsable server message");
            }
        }
    }

    async fn recv_roster(&mut self) -> Vec<PeerId> {
        loop {
            if let ServerMessage::Roster { peers } = self.recv().await {
                return peers;
            }
        }
    }
}

async fn start_relay() -> SocketAddr {
    let (app, _signaling) = skein_relay::bootstrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn welcome_join_and_roster_flow() {
    init_tracing();
    let addr = start_relay().await;

    let mut a = WsClient::connect(addr).await;
    let mut b = WsClient::connect(addr).await;
    assert_ne!(a.peer_id, b.peer_id, "relay must assign unique ids");

    a.send(ClientMessage::Join {
        room: "global".to_string(),
    })
    .await;
    assert!(a.recv_roster().await.is_empty());

    b.send(ClientMessage::Join {
        room: "global".to_string(),
    })
    .await;

    assert_eq!(a.recv_roster().await, vec![b.peer_id.clone()]);
    assert_eq!(b.recv_roster().await, vec![a.peer_id.clone()]);
}

#[tokio::test]
async fn signal_round_trip_between_members() {
    init_tracing();
    let addr = start_relay().await;

    let mut a = WsClient::connect(addr).await;
    let mut b = WsClient::connect(addr).await;

    for client in [&mut a, &mut b] {
        client
            .send(ClientMessage::Join {
                room: "global".to_string(),
            })
            .await;
        client.recv_roster().await;
    }
    // a's second roster carries b.
    a.recv_roster().await;

    a.send(ClientMessage::Signal {
        to: b.peer_id.clone(),
        payload: SignalPayload::Offer {
            sdp: "v=0".to_string(),
        },
    })
    .await;

    loop {
        if let ServerMessage::Signal { from, payload } = b.recv().await {
            assert_eq!(from, a.peer_id);
            assert!(matches!(payload, SignalPayload::Offer { .. }));
            break;
        }
    }
}

#[tokio::test]
async fn signal_to_unknown_peer_is_dropped_silently() {
    init_tracing();
    let addr = start_relay().await;

    let mut a = WsClient::connect(addr).await;
    a.send(ClientMessage::Join {
        room: "global".to_string(),
    })
    .await;
    a.recv_roster().await;

    // Nobody owns this id; the relay must swallow the send and keep going.
    a.send(ClientMessage::Signal {
        to: PeerId::new(),
        payload: SignalPayload::Answer {
            sdp: "v=0".to_string(),
        },
    })
    .await;

    let mut b = WsClient::connect(addr).await;
    b.send(ClientMessage::Join {
        room: "global".to_string(),
    })
    .await;

    assert_eq!(a.recv_roster().await, vec![b.peer_id.clone()]);
}

#[tokio::test]
async fn malformed_text_frame_is_dropped_and_the_socket_survives() {
    init_tracing();
    let addr = start_relay().await;

    let mut a = WsClient::connect(addr).await;
    a.stream
        .send(Message::Text("definitely not json".to_string()))
        .await
        .unwrap();

    // The relay dropped the garbage; the same socket still works.
    a.send(ClientMessage::Join {
        room: "global".to_string(),
    })
    .await;
    assert!(a.recv_roster().await.is_empty());

    let mut b = WsClient::connect(addr).await;
    b.send(ClientMessage::Join {
        room: "global".to_string(),
    })
    .await;
    assert_eq!(a.recv_roster().await, vec![b.peer_id.clone()]);
}

#[tokio::test]
async fn closing_a_socket_rebroadcasts_the_roster() {
    init_tracing();
    let addr = start_relay().await;

    let mut a = WsClient::connect(addr).await;
    let mut b = WsClient::connect(addr).await;

    for client in [&mut a, &mut b] {
        client
            .send(ClientMessage::Join {
                room: "global".to_string(),
            })
            .await;
        client.recv_roster().await;
    }
    a.recv_roster().await;

    a.stream.close(None).await.unwrap();
    drop(a);

    assert!(b.recv_roster().await.is_empty());
}
