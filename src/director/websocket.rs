//! Director WebSocket connection handle

use anyhow::Result;
use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

use super::types::{ConnectionStatus, PromptRequest, TransportEvent};

/// Capacity of the per-connection event channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// One streaming connection to the scene director.
///
/// Each handle owns a single I/O task. The task connects, sends the prompt as
/// the only outbound frame, then forwards inbound frames until the socket
/// closes or the handle is closed.
pub struct DirectorWebSocket {
    url: String,
    status_tx: watch::Sender<ConnectionStatus>,
    status_rx: watch::Receiver<ConnectionStatus>,
    event_tx: mpsc::Sender<TransportEvent>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl DirectorWebSocket {
    /// Create a new, unopened connection handle
    pub fn new(url: impl Into<String>) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);

        let ws = Self {
            url: url.into(),
            status_tx,
            status_rx,
            event_tx,
            shutdown_tx: None,
            task: None,
        };

        (ws, event_rx)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get current connection status
    pub fn status(&self) -> ConnectionStatus {
        self.status_rx.borrow().clone()
    }

    /// Spawn the I/O task. Returns immediately; progress arrives as
    /// [`TransportEvent`]s on the receiver returned by [`DirectorWebSocket::new`].
    pub fn open(&mut self, request: PromptRequest) -> Result<()> {
        if self.task.is_some() {
            return Err(anyhow::anyhow!(
                "Connection to {} was already opened",
                self.url
            ));
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.shutdown_tx = Some(shutdown_tx);
        self.status_tx.send_replace(ConnectionStatus::Connecting);

        let url = self.url.clone();
        let event_tx = self.event_tx.clone();
        let status_tx = self.status_tx.clone();

        self.task = Some(tokio::spawn(async move {
            Self::run_connection(url, request, event_tx, status_tx, shutdown_rx).await;
        }));

        Ok(())
    }

    /// Ask the I/O task to close the socket. Does not wait for completion.
    pub fn close(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            if let Err(e) = shutdown_tx.try_send(()) {
                debug!("Shutdown signal not delivered to {}: {}", self.url, e);
            }
            if matches!(
                self.status(),
                ConnectionStatus::Connecting | ConnectionStatus::Connected
            ) {
                self.status_tx.send_replace(ConnectionStatus::Closing);
            }
            info!("Close requested for {}", self.url);
        }
    }

    async fn run_connection(
        url: String,
        request: PromptRequest,
        event_tx: mpsc::Sender<TransportEvent>,
        status_tx: watch::Sender<ConnectionStatus>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let connected = tokio::select! {
            result = connect_async(url.as_str()) => result,
            _ = shutdown_rx.recv() => {
                info!("Connection to {} cancelled before it opened", url);
                status_tx.send_replace(ConnectionStatus::Disconnected);
                return;
            }
        };

        let mut ws_stream = match connected {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                let error_msg = format!("Failed to connect to {}: {}", url, e);
                error!("{}", error_msg);
                status_tx.send_replace(ConnectionStatus::Error(error_msg.clone()));
                let _ = event_tx.send(TransportEvent::OpenFailed(error_msg)).await;
                return;
            }
        };

        info!("Connected to scene director at {}", url);
        status_tx.send_replace(ConnectionStatus::Connected);

        let frame = match request.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize prompt: {}", e);
                let _ = ws_stream.close(None).await;
                status_tx.send_replace(ConnectionStatus::Error(e.to_string()));
                let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                return;
            }
        };

        if let Err(e) = ws_stream.send(Message::Text(frame)).await {
            let error_msg = format!("Failed to send prompt: {}", e);
            error!("{}", error_msg);
            status_tx.send_replace(ConnectionStatus::Error(error_msg.clone()));
            let _ = event_tx.send(TransportEvent::Error(error_msg)).await;
            return;
        }
        debug!("Prompt sent ({} chars)", request.prompt.chars().count());

        if event_tx.send(TransportEvent::Opened).await.is_err() {
            debug!("Session dropped before the connection opened, closing");
            let _ = ws_stream.close(None).await;
            return;
        }

        loop {
            tokio::select! {
                message = ws_stream.next() => {
                    let event = match message {
                        Some(Ok(msg)) => match Self::process_message(msg) {
                            Some(event) => event,
                            None => continue,
                        },
                        Some(Err(e)) => {
                            let error_msg = format!("WebSocket message error: {}", e);
                            error!("{}", error_msg);
                            status_tx.send_replace(ConnectionStatus::Error(error_msg.clone()));
                            let _ = event_tx.send(TransportEvent::Error(error_msg)).await;
                            let _ = event_tx
                                .send(TransportEvent::Closed {
                                    code: None,
                                    reason: "transport error".to_string(),
                                })
                                .await;
                            break;
                        }
                        None => TransportEvent::Closed {
                            code: None,
                            reason: "stream ended".to_string(),
                        },
                    };

                    let closed = matches!(event, TransportEvent::Closed { .. });
                    if event_tx.send(event).await.is_err() {
                        debug!("Session receiver dropped, closing {}", url);
                        let _ = ws_stream.close(None).await;
                        break;
                    }
                    if closed {
                        info!("Scene director connection closed");
                        status_tx.send_replace(ConnectionStatus::Disconnected);
                        break;
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal for {}", url);
                    if let Err(e) = ws_stream.close(None).await {
                        warn!("Error closing WebSocket connection: {}", e);
                    }
                    status_tx.send_replace(ConnectionStatus::Disconnected);
                    break;
                }
            }
        }
    }

    /// Map a WebSocket frame to a transport event. Control frames yield nothing.
    fn process_message(msg: Message) -> Option<TransportEvent> {
        match msg {
            Message::Text(text) => {
                debug!("Received WebSocket message: {}", text);
                Some(TransportEvent::Message(text))
            }
            Message::Binary(data) => match String::from_utf8(data) {
                Ok(text) => Some(TransportEvent::Message(text)),
                Err(e) => {
                    warn!("Binary frame is not valid UTF-8, decoding lossily: {}", e);
                    Some(TransportEvent::Message(
                        String::from_utf8_lossy(e.as_bytes()).into_owned(),
                    ))
                }
            },
            Message::Close(frame) => {
                info!("WebSocket close frame received: {:?}", frame);
                let (code, reason) = match frame {
                    Some(frame) => (Some(u16::from(frame.code)), frame.reason.into_owned()),
                    None => (None, String::new()),
                };
                Some(TransportEvent::Closed { code, reason })
            }
            Message::Ping(_) => {
                debug!("Received ping");
                None
            }
            Message::Pong(_) => {
                debug!("Received pong");
                None
            }
            Message::Frame(_) => None,
        }
    }
}

impl Drop for DirectorWebSocket {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    #[test]
    fn test_websocket_creation() {
        let (ws, _rx) = DirectorWebSocket::new("ws://localhost:8000/ws/scene");
        assert_eq!(ws.url(), "ws://localhost:8000/ws/scene");
        assert_eq!(ws.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_close_marks_live_connection_closing() {
        let (mut ws, _rx) = DirectorWebSocket::new("ws://localhost:8000/ws/scene");

        block_on(async {
            let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
            ws.shutdown_tx = Some(shutdown_tx);
            ws.status_tx.send_replace(ConnectionStatus::Connected);

            ws.close();
            assert_eq!(ws.status(), ConnectionStatus::Closing);
            assert_eq!(ws.status().to_string(), "closing");
            assert_eq!(shutdown_rx.recv().await, Some(()));

            // Second close is a no-op
            ws.close();
            assert_eq!(ws.status(), ConnectionStatus::Closing);
        });
    }

    #[test]
    fn test_process_message_text() {
        let event = DirectorWebSocket::process_message(Message::Text("{}".to_string()));
        assert_eq!(event, Some(TransportEvent::Message("{}".to_string())));
    }

    #[test]
    fn test_process_message_control_frames() {
        assert_eq!(
            DirectorWebSocket::process_message(Message::Ping(b"x".to_vec())),
            None
        );
        assert_eq!(
            DirectorWebSocket::process_message(Message::Pong(b"x".to_vec())),
            None
        );
    }

    #[test]
    fn test_process_message_close() {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "done".into(),
        };
        let event = DirectorWebSocket::process_message(Message::Close(Some(frame)));
        assert_eq!(
            event,
            Some(TransportEvent::Closed {
                code: Some(1000),
                reason: "done".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_open_twice_is_rejected() {
        let (mut ws, _rx) = DirectorWebSocket::new("ws://127.0.0.1:9/ws/scene");
        ws.open(PromptRequest::new("first")).unwrap();
        assert!(ws.open(PromptRequest::new("second")).is_err());
        ws.close();
    }

    #[tokio::test]
    async fn test_open_failure_is_reported() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (mut ws, mut rx) = DirectorWebSocket::new(format!("ws://127.0.0.1:{}/ws/scene", port));
        ws.open(PromptRequest::new("hello")).unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert!(matches!(event, Some(TransportEvent::OpenFailed(_))));
        assert!(matches!(ws.status(), ConnectionStatus::Error(_)));
    }
}
