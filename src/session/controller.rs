//! Session controller: the streaming-session state machine
//!
//! Owns at most one [`Session`] at a time. A session wraps the connection
//! handle for one prompt and the receiver of its transport events. Every
//! operation returns the [`SceneUpdate`]s the presentation layer should apply.

use anyhow::Result;
use chrono::{DateTime, Local};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::director::types::{
    DirectorError, PanelEvent, PromptRequest, TransportEvent, Utterance,
};
use crate::director::websocket::DirectorWebSocket;

use super::scene::SceneState;

/// Lifecycle of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Receiving,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Open => "open",
            SessionState::Receiving => "receiving",
            SessionState::Closed => "closed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State changes for the presentation layer, in the order they happened
#[derive(Debug, Clone, PartialEq)]
pub enum SceneUpdate {
    SessionStarted { id: SessionId, prompt: String },
    Lifecycle { id: SessionId, state: SessionState },
    DirectorNote(String),
    Status(Option<String>),
    SceneAppended(Vec<Utterance>),
    Loading(bool),
    /// Scene log emptied at session start, director note kept
    SceneLogCleared,
    /// Director note and scene log both reset
    SceneCleared,
    PayloadRejected(String),
    TransportFailed(String),
}

/// Counters kept across sessions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerStats {
    pub sessions_started: u64,
    pub panels_applied: u64,
    pub utterances_received: u64,
    pub malformed_payloads: u64,
    pub ignored_events: u64,
    pub transport_errors: u64,
}

/// One prompt's connection and its lifecycle
pub struct Session {
    id: SessionId,
    state: SessionState,
    request: PromptRequest,
    started_at: DateTime<Local>,
    connection: DirectorWebSocket,
    events: mpsc::Receiver<TransportEvent>,
    listening: bool,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn prompt(&self) -> &str {
        &self.request.prompt
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn connection(&self) -> &DirectorWebSocket {
        &self.connection
    }
}

/// Streaming-session state machine
pub struct SessionController {
    endpoint: String,
    clear_scene_on_start: bool,
    scene: SceneState,
    session: Option<Session>,
    next_session_id: u64,
    stats: ControllerStats,
}

impl SessionController {
    pub fn new(endpoint: impl Into<String>, clear_scene_on_start: bool) -> Self {
        Self {
            endpoint: endpoint.into(),
            clear_scene_on_start,
            scene: SceneState::new(),
            session: None,
            next_session_id: 1,
            stats: ControllerStats::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.director.endpoint(),
            config.session.clear_scene_on_start,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Takes effect from the next session on
    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.endpoint = endpoint.into();
    }

    pub fn set_clear_scene_on_start(&mut self, enabled: bool) {
        self.clear_scene_on_start = enabled;
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Idle, |session| session.state)
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// Replace any current session with a new one for `prompt`.
    ///
    /// The previous connection is closed without waiting and its pending
    /// events are discarded. The new connection opens in the background.
    pub fn start_session(&mut self, prompt: impl Into<String>) -> Result<Vec<SceneUpdate>> {
        let mut updates = Vec::new();

        if let Some(mut previous) = self.session.take() {
            info!(
                "Replacing session {} ({}) with a new one",
                previous.id, previous.state
            );
            previous.connection.close();
            if previous.state != SessionState::Closed {
                updates.push(SceneUpdate::Lifecycle {
                    id: previous.id,
                    state: SessionState::Closed,
                });
            }
        }

        if self.clear_scene_on_start && !self.scene.scene_log().is_empty() {
            self.scene.clear_scene_log();
            updates.push(SceneUpdate::SceneLogCleared);
        }

        let id = SessionId(self.next_session_id);
        self.next_session_id += 1;

        let request = PromptRequest::new(prompt);
        let (mut connection, events) = DirectorWebSocket::new(self.endpoint.clone());
        connection.open(request.clone())?;

        info!("Session {} connecting to {}", id, self.endpoint);
        self.stats.sessions_started += 1;

        updates.push(SceneUpdate::SessionStarted {
            id,
            prompt: request.prompt.clone(),
        });

        self.session = Some(Session {
            id,
            state: SessionState::Connecting,
            request,
            started_at: Local::now(),
            connection,
            events,
            listening: true,
        });

        updates.push(SceneUpdate::Lifecycle {
            id,
            state: SessionState::Connecting,
        });
        if self.scene.set_loading(true) {
            updates.push(SceneUpdate::Loading(true));
        }

        Ok(updates)
    }

    /// Close the current session on request; later events of it are dropped
    pub fn close_session(&mut self) -> Vec<SceneUpdate> {
        let mut updates = Vec::new();

        if let Some(session) = self.session.as_mut() {
            session.connection.close();
            session.listening = false;
            info!("Session {} closed on request", session.id);
        }
        updates.extend(self.transition(SessionState::Closed));
        if self.scene.set_loading(false) {
            updates.push(SceneUpdate::Loading(false));
        }

        updates
    }

    /// Reset the director note and scene log
    pub fn clear_scene(&mut self) -> Vec<SceneUpdate> {
        self.scene.clear();
        vec![SceneUpdate::SceneCleared]
    }

    /// Wait for the next transport event of the current session.
    ///
    /// Never resolves while there is no session to listen to, so it can sit
    /// in a `select!` next to other event sources. Cancel safe.
    pub async fn next_transport_event(&mut self) -> Option<TransportEvent> {
        match self.session.as_mut() {
            Some(session) if session.listening => {
                let event = session.events.recv().await;
                if event.is_none() {
                    session.listening = false;
                }
                event
            }
            _ => std::future::pending().await,
        }
    }

    /// Apply one transport event of the current session
    pub fn handle_transport_event(&mut self, event: TransportEvent) -> Vec<SceneUpdate> {
        match event {
            TransportEvent::Opened => {
                debug!("Prompt delivered, session open");
                self.transition(SessionState::Open).into_iter().collect()
            }
            TransportEvent::Message(text) => self.on_inbound_event(&text),
            TransportEvent::OpenFailed(reason) => {
                let error = DirectorError::TransportOpenFailure {
                    url: self.endpoint.clone(),
                    reason,
                };
                self.on_transport_error(error.to_string())
            }
            TransportEvent::Error(reason) => {
                self.on_transport_error(DirectorError::Transport(reason).to_string())
            }
            TransportEvent::Closed { code, reason } => self.on_transport_close(code, &reason),
        }
    }

    /// Classify and apply one inbound frame
    pub fn on_inbound_event(&mut self, raw: &str) -> Vec<SceneUpdate> {
        let mut updates = Vec::new();

        if matches!(
            self.session_state(),
            SessionState::Connecting | SessionState::Open
        ) {
            updates.extend(self.transition(SessionState::Receiving));
        }

        match PanelEvent::parse(raw) {
            Ok(PanelEvent::Director { message }) => {
                debug!("Director update ({} chars)", message.len());
                self.stats.panels_applied += 1;
                self.scene.set_director_note(message.clone());
                updates.push(SceneUpdate::DirectorNote(message));
            }
            Ok(PanelEvent::Status { message }) => {
                info!(
                    "Status update: {}",
                    message.as_deref().unwrap_or("(no message)")
                );
                self.stats.panels_applied += 1;
                updates.push(SceneUpdate::Status(message));
            }
            Ok(PanelEvent::Scene { utterances }) => {
                debug!("Scene update with {} utterances", utterances.len());
                self.stats.panels_applied += 1;
                self.stats.utterances_received += utterances.len() as u64;
                self.scene.append_utterances(&utterances);
                updates.push(SceneUpdate::SceneAppended(utterances));
                if self.scene.set_loading(false) {
                    updates.push(SceneUpdate::Loading(false));
                }
            }
            Ok(PanelEvent::Ignored { panel }) => {
                debug!("Ignoring {} panel with unexpected content", panel.as_str());
                self.stats.ignored_events += 1;
            }
            Err(DirectorError::UnknownPanel(panel)) => {
                debug!("Ignoring unknown panel: {}", panel);
                self.stats.ignored_events += 1;
            }
            Err(e) => {
                warn!("Error parsing message: {}", e);
                self.stats.malformed_payloads += 1;
                updates.push(SceneUpdate::PayloadRejected(e.to_string()));
                if self.scene.set_loading(false) {
                    updates.push(SceneUpdate::Loading(false));
                }
            }
        }

        updates
    }

    /// Transport fault or failed open: stop loading, keep the scene
    pub fn on_transport_error(&mut self, reason: impl Into<String>) -> Vec<SceneUpdate> {
        let reason = reason.into();
        warn!("WebSocket error: {}", reason);
        self.stats.transport_errors += 1;

        let mut updates = vec![SceneUpdate::TransportFailed(reason)];
        updates.extend(self.transition(SessionState::Closed));
        if self.scene.set_loading(false) {
            updates.push(SceneUpdate::Loading(false));
        }
        updates
    }

    /// Peer or network closed the connection: stop loading, keep the scene
    pub fn on_transport_close(&mut self, code: Option<u16>, reason: &str) -> Vec<SceneUpdate> {
        info!(
            "WebSocket connection closed (code {:?}, reason {:?})",
            code, reason
        );

        let mut updates: Vec<SceneUpdate> =
            self.transition(SessionState::Closed).into_iter().collect();
        if self.scene.set_loading(false) {
            updates.push(SceneUpdate::Loading(false));
        }
        updates
    }

    fn transition(&mut self, state: SessionState) -> Option<SceneUpdate> {
        let session = self.session.as_mut()?;
        if session.state == state || session.state == SessionState::Closed {
            return None;
        }

        debug!("Session {}: {} -> {}", session.id, session.state, state);
        session.state = state;
        Some(SceneUpdate::Lifecycle {
            id: session.id,
            state,
        })
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.connection.close();
        }
    }
}
