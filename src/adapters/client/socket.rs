//! tokio-tungstenite adapter for the persistent chat socket.
//!
//! `open` connects and spawns one pump task per socket. The pump writes
//! outbound frames as JSON text, decodes inbound text into `ServerFrame`s and
//! ends with exactly one `SocketEvent::Closed`.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::domain::chat::{ClientFrame, ServerFrame};
use crate::ports::{ChatClientError, CredentialProvider, SocketChannel, SocketConnector, SocketEvent};

/// Opens sockets to `ws(s)://host/ws/chat`.
pub struct TungsteniteConnector {
    socket_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl TungsteniteConnector {
    pub fn new(socket_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            socket_url: socket_url.into(),
            credentials,
        }
    }

    /// The socket URL with the bearer credential appended as `token`.
    fn request_url(&self) -> Result<String, ChatClientError> {
        let mut url = reqwest::Url::parse(&self.socket_url)
            .map_err(|e| ChatClientError::transport(format!("invalid socket url: {}", e)))?;
        if let Some(token) = self.credentials.bearer_token() {
            url.query_pairs_mut()
                .append_pair("token", token.expose_secret());
        }
        Ok(url.into())
    }
}

#[async_trait]
impl SocketConnector for TungsteniteConnector {
    async fn open(&self) -> Result<SocketChannel, ChatClientError> {
        let url = self.request_url()?;

        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| ChatClientError::transport(format!("socket connect failed: {}", e)))?;

        let (mut write_half, mut read_half) = ws_stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientFrame>();
        let (inbound_tx, inbound) = mpsc::unbounded_channel::<SocketEvent>();

        tokio::spawn(async move {
            let reason = loop {
                tokio::select! {
                    frame = outbound_rx.recv() => match frame {
                        Some(frame) => {
                            let text = match serde_json::to_string(&frame) {
                                Ok(text) => text,
                                Err(e) => {
                                    tracing::warn!(error = %e, "dropping unencodable frame");
                                    continue;
                                }
                            };
                            if let Err(e) = write_half.send(Message::Text(text)).await {
                                break Some(e.to_string());
                            }
                        }
                        None => {
                            // Owner released the socket.
                            let _ = write_half.send(Message::Close(None)).await;
                            break None;
                        }
                    },
                    msg = read_half.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ServerFrame>(&text) {
                                Ok(frame) => {
                                    if inbound_tx.send(SocketEvent::Frame(frame)).is_err() {
                                        break None;
                                    }
                                }
                                Err(e) => tracing::debug!(error = %e, "unrecognised server frame"),
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            break frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break Some(e.to_string()),
                        None => break None,
                    },
                }
            };

            tracing::debug!(reason = ?reason, "chat socket pump ended");
            let _ = inbound_tx.send(SocketEvent::Closed(reason));
        });

        Ok(SocketChannel { outbound, inbound })
    }
}
