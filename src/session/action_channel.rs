//! Action Channel for asynchronous event processing

use anyhow::Result;
use chrono::{DateTime, Local};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::director::types::ConnectionStatus;
use crate::session::command_router::InteractiveCommand;
use crate::session::controller::{SceneUpdate, SessionState};

/// Session events for communication between components
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Shutdown request
    ShutdownRequested,
    /// Error event
    Error { message: String },
    /// Informational notice for the user
    Notice { message: String },
    /// State change produced by the session controller
    Scene(SceneUpdate),
    /// Status information
    StatusInfo { info: StatusInfo },
    /// Configuration information
    ConfigInfo { config: Config },
    /// Interactive help lines
    HelpInfo { lines: Vec<String> },
    /// Logs information
    LogsInfo { info: LogsInfo },
    /// User command from interactive input
    UserCommand { command: InteractiveCommand },
}

/// Status information for session
#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub version: String,
    pub endpoint: String,
    pub state: SessionState,
    /// Transport status of the current session's connection
    pub connection: Option<ConnectionStatus>,
    pub started_at: Option<DateTime<Local>>,
    pub prompt: Option<String>,
    pub loading: bool,
    pub utterances: usize,
    pub session_stats: super::session_manager::SessionStats,
}

/// Logs information for session
#[derive(Debug, Clone)]
pub struct LogsInfo {
    pub recent_logs: Vec<String>,
    pub log_file_path: String,
    pub log_level: String,
}

/// Action channel for event processing
pub struct ActionChannel {
    /// Event sender
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Event receiver
    event_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
}

impl Clone for ActionChannel {
    fn clone(&self) -> Self {
        Self {
            event_tx: self.event_tx.clone(),
            event_rx: None, // Receivers cannot be cloned
        }
    }
}

impl ActionChannel {
    /// Create a new ActionChannel
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Send event to channel
    pub fn send_event(&self, event: SessionEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|e| anyhow::anyhow!("Failed to send event: {}", e))
    }

    /// Get next event from channel
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if let Some(event_rx) = &mut self.event_rx {
            event_rx.recv().await
        } else {
            None
        }
    }

    /// Get event sender for external use
    pub fn event_tx(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.event_tx.clone()
    }

    /// Send error event
    pub fn send_error(&self, message: String) -> Result<()> {
        self.send_event(SessionEvent::Error { message })
    }

    /// Send shutdown request
    pub fn request_shutdown(&self) -> Result<()> {
        self.send_event(SessionEvent::ShutdownRequested)
    }

    /// Check if channel is closed
    pub fn is_closed(&self) -> bool {
        self.event_tx.is_closed()
    }
}

impl Default for ActionChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let mut channel = ActionChannel::new();
        channel.send_error("first".to_string()).unwrap();
        channel.request_shutdown().unwrap();

        assert!(matches!(
            channel.next_event().await,
            Some(SessionEvent::Error { message }) if message == "first"
        ));
        assert!(matches!(
            channel.next_event().await,
            Some(SessionEvent::ShutdownRequested)
        ));
    }

    #[tokio::test]
    async fn test_clone_has_no_receiver() {
        let channel = ActionChannel::new();
        let mut clone = channel.clone();
        clone.send_error("via clone".to_string()).unwrap();
        assert!(clone.next_event().await.is_none());
        assert!(!clone.is_closed());
    }
}
