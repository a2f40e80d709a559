use crate::error::MeshError;
use futures::{SinkExt, StreamExt};
use skein_core::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

/// Client side of the relay websocket. Outbound sends are fire-and-forget;
/// the relay never acknowledges delivery.
#[derive(Clone)]
pub struct RelayClient {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl RelayClient {
    /// Connect to the relay. Inbound server messages arrive on the
    /// returned receiver; the channel closes when the socket does.
    pub async fn connect(
        relay_url: &str,
    ) -> Result<(Self, mpsc::Receiver<ServerMessage>), MeshError> {
        let url = Url::parse(relay_url)?;
        let (socket, _) = connect_async(url.as_str()).await?;
        info!("Connected to relay at {}", url);

        let (mut sink, mut stream) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (in_tx, in_rx) = mpsc::channel::<ServerMessage>(256);

        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize client message: {}", e);
                        continue;
                    }
                };
                if sink.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(Ok(msg)) = stream.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(server_msg) => {
                            if in_tx.send(server_msg).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Unparsable relay message: {:?}", e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            debug!("Relay socket reader finished");
        });

        Ok((Self { tx: out_tx }, in_rx))
    }

    /// Queue a message for the relay. Dropped silently if the socket is
    /// already gone, matching the relay's own at-most-effort semantics.
    pub fn send(&self, msg: ClientMessage) {
        if self.tx.send(msg).is_err() {
            debug!("Dropping message: relay socket is closed");
        }
    }

    #[cfg(test)]
    pub(crate) fn from_sender(tx: mpsc::UnboundedSender<ClientMessage>) -> Self {
        Self { tx }
    }
}
