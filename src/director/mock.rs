//! Loopback scene director used by the `demo` command and integration tests
//!
//! Accepts WebSocket connections on a local port, records the first frame of
//! every connection as the prompt, then replays a fixed script.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, error, info, warn};

use super::types::{PromptRequest, Utterance};

/// Path the mock serves, matching the real backend
pub const SCENE_PATH: &str = "/ws/scene";

/// One step of a scripted reply
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Send a JSON value as a text frame
    Json(serde_json::Value),
    /// Send a raw text frame (may be invalid JSON)
    Raw(String),
    /// Wait before the next step
    Pause(Duration),
    /// Send a close frame and end the connection
    Close,
}

impl ScriptStep {
    pub fn director(message: &str) -> Self {
        ScriptStep::Json(serde_json::json!({
            "panel": "director",
            "content": { "title": "Director's Vision", "message": message }
        }))
    }

    pub fn status(message: &str) -> Self {
        ScriptStep::Json(serde_json::json!({ "panel": "status", "message": message }))
    }

    pub fn scene(utterances: &[Utterance]) -> Self {
        ScriptStep::Json(serde_json::json!({ "panel": "scene", "content": utterances }))
    }
}

#[derive(Debug, Default)]
struct MockStats {
    prompts: Mutex<Vec<String>>,
    connections: AtomicUsize,
    disconnects: AtomicUsize,
}

/// Scripted director server bound to 127.0.0.1
pub struct MockDirectorServer {
    addr: SocketAddr,
    stats: Arc<MockStats>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl MockDirectorServer {
    /// Bind an ephemeral port and start serving `script` to every connection
    pub async fn start(script: Vec<ScriptStep>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind mock director listener")?;
        let addr = listener.local_addr()?;
        let stats = Arc::new(MockStats::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!("Mock director listening on {}", addr);

        let task_stats = stats.clone();
        let script = Arc::new(script);
        let task = tokio::spawn(async move {
            let mut shutdown_rx = shutdown_rx;
            loop {
                tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!("Mock director accepted {}", peer);
                            tokio::spawn(Self::handle_connection(
                                stream,
                                script.clone(),
                                task_stats.clone(),
                                shutdown_rx.clone(),
                            ));
                        }
                        Err(e) => {
                            error!("Mock director accept failed: {}", e);
                            break;
                        }
                    },
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        Ok(Self {
            addr,
            stats,
            shutdown_tx,
            task: Some(task),
        })
    }

    /// WebSocket endpoint clients should connect to
    pub fn endpoint(&self) -> String {
        format!("ws://{}{}", self.addr, SCENE_PATH)
    }

    /// Prompts received so far, one per connection, in connection order
    pub fn received_prompts(&self) -> Vec<String> {
        self.stats
            .prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.stats.connections.load(Ordering::SeqCst)
    }

    /// Connections that the client side has closed or dropped
    pub fn disconnect_count(&self) -> usize {
        self.stats.disconnects.load(Ordering::SeqCst)
    }

    /// Stop accepting and end every open connection
    pub fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        script: Arc<Vec<ScriptStep>>,
        stats: Arc<MockStats>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                error!("Mock director handshake failed: {}", e);
                return;
            }
        };
        stats.connections.fetch_add(1, Ordering::SeqCst);

        // The first text frame carries the prompt
        let prompt = loop {
            match ws_stream.next().await {
                Some(Ok(Message::Text(text))) => break Some(text),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break None,
                Some(Ok(_)) => continue,
            }
        };

        let Some(prompt) = prompt else {
            stats.disconnects.fetch_add(1, Ordering::SeqCst);
            return;
        };

        match serde_json::from_str::<PromptRequest>(&prompt) {
            Ok(request) => info!("Mock director received prompt: {}", request.prompt),
            Err(e) => warn!("Mock director received non-prompt frame: {}", e),
        }
        if let Ok(mut prompts) = stats.prompts.lock() {
            prompts.push(prompt);
        }

        for step in script.iter() {
            let sent = match step {
                ScriptStep::Json(value) => ws_stream.send(Message::Text(value.to_string())).await,
                ScriptStep::Raw(text) => ws_stream.send(Message::Text(text.clone())).await,
                ScriptStep::Pause(duration) => {
                    tokio::select! {
                        _ = tokio::time::sleep(*duration) => Ok(()),
                        message = ws_stream.next() => {
                            if Self::is_client_gone(message) {
                                stats.disconnects.fetch_add(1, Ordering::SeqCst);
                                return;
                            }
                            Ok(())
                        }
                        _ = shutdown_rx.changed() => return,
                    }
                }
                ScriptStep::Close => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "scene complete".into(),
                    };
                    let _ = ws_stream.close(Some(frame)).await;
                    return;
                }
            };

            if let Err(e) = sent {
                debug!("Mock director send failed, client gone: {}", e);
                stats.disconnects.fetch_add(1, Ordering::SeqCst);
                return;
            }
        }

        // Script done: hold the connection open until the client leaves
        loop {
            tokio::select! {
                message = ws_stream.next() => {
                    if Self::is_client_gone(message) {
                        stats.disconnects.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                }
                _ = shutdown_rx.changed() => return,
            }
        }
    }

    fn is_client_gone(
        message: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
    ) -> bool {
        matches!(message, None | Some(Err(_)) | Some(Ok(Message::Close(_))))
    }
}

impl Drop for MockDirectorServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The sequence the real backend produces for one prompt
pub fn demo_script(line_delay: Duration) -> Vec<ScriptStep> {
    let lines = [
        Utterance::new(
            "Narrator",
            "Mist hangs over the field. Two figures face each other.",
            None,
        ),
        Utterance::new("Alice", "Draw your sword.", None),
        Utterance::new(
            "Bruno",
            "Not before you take back what you said.",
            Some("Bruno steps off the marked path".to_string()),
        ),
        Utterance::new("Alice", "Then we settle it at dawn.", None),
    ];

    let mut script = vec![
        ScriptStep::director(
            "Tense standoff. Keep the pacing slow and let silences land between lines.",
        ),
        ScriptStep::status("Agents generated and saved."),
    ];
    for line in &lines {
        script.push(ScriptStep::Pause(line_delay));
        script.push(ScriptStep::scene(std::slice::from_ref(line)));
    }
    script.push(ScriptStep::Close);
    script
}
