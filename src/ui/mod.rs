//! User Interface module
//!
//! Provides both TUI (Terminal User Interface) and simple CLI output capabilities.

/// TUI application state and rendering
pub mod tui;

/// Simple CLI output functions
pub mod cli;

/// Interactive UI loop driving the TUI
pub mod ui_manager;

use std::collections::VecDeque;

use crate::session::controller::{SceneUpdate, SessionId, SessionState};
use crate::session::scene::SceneState;

pub use cli::display_welcome_page;

/// Which widget owns the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing a scene prompt
    Editing,
    /// Typing a `/` command
    Command,
}

/// Application state for UI components
#[derive(Debug, Clone)]
pub struct AppState {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub prompt_buffer: String,
    pub command_buffer: String,
    pub scene: SceneState,
    pub session_id: Option<SessionId>,
    pub session_state: SessionState,
    pub active_prompt: Option<String>,
    pub last_status: Option<String>,
    pub log_messages: VecDeque<String>,
    pub log_history: usize,
    pub log_scroll_offset: usize,
    pub scene_scroll_offset: usize,
}

impl AppState {
    /// Create new application state
    pub fn new(log_history: usize) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            prompt_buffer: String::new(),
            command_buffer: String::new(),
            scene: SceneState::new(),
            session_id: None,
            session_state: SessionState::Idle,
            active_prompt: None,
            last_status: None,
            log_messages: VecDeque::new(),
            log_history: log_history.max(1),
            log_scroll_offset: 0,
            scene_scroll_offset: 0,
        }
    }

    /// Mirror one controller update into the rendered state
    pub fn apply_update(&mut self, update: &SceneUpdate) {
        match update {
            SceneUpdate::SessionStarted { id, prompt } => {
                self.session_id = Some(*id);
                self.active_prompt = Some(prompt.clone());
                self.last_status = None;
                self.push_log(format!("Session {} started: {}", id, prompt));
            }
            SceneUpdate::Lifecycle { id, state } => {
                if self.session_id == Some(*id) {
                    self.session_state = *state;
                }
                self.push_log(format!("Session {} {}", id, state));
            }
            SceneUpdate::DirectorNote(message) => {
                self.scene.set_director_note(message.clone());
            }
            SceneUpdate::Status(message) => {
                let text = message.clone().unwrap_or_else(|| "(no message)".to_string());
                self.push_log(format!("[status] {}", text));
                self.last_status = Some(text);
            }
            SceneUpdate::SceneAppended(utterances) => {
                self.scene.append_utterances(utterances);
                // Stay pinned to the newest line unless the user scrolled away
                if self.scene_scroll_offset > 0 {
                    self.scene_scroll_offset += utterances.len();
                }
            }
            SceneUpdate::Loading(loading) => {
                self.scene.set_loading(*loading);
            }
            SceneUpdate::SceneLogCleared => {
                self.scene.clear_scene_log();
                self.scene_scroll_offset = 0;
            }
            SceneUpdate::SceneCleared => {
                self.scene.clear();
                self.scene_scroll_offset = 0;
                self.push_log("Scene cleared");
            }
            SceneUpdate::PayloadRejected(reason) => {
                self.push_log(format!("Rejected payload: {}", reason));
            }
            SceneUpdate::TransportFailed(reason) => {
                self.push_log(format!("Connection error: {}", reason));
            }
        }
    }

    /// Append a line to the log pane, trimming history
    pub fn push_log(&mut self, message: impl Into<String>) {
        self.log_messages.push_back(message.into());
        while self.log_messages.len() > self.log_history {
            self.log_messages.pop_front();
        }
        if self.log_scroll_offset > 0 {
            self.log_scroll_offset = (self.log_scroll_offset + 1)
                .min(self.log_messages.len().saturating_sub(1));
        }
    }

    pub fn scroll_logs_up(&mut self) {
        let max_offset = self.log_messages.len().saturating_sub(1);
        self.log_scroll_offset = (self.log_scroll_offset + 1).min(max_offset);
    }

    pub fn scroll_logs_down(&mut self) {
        self.log_scroll_offset = self.log_scroll_offset.saturating_sub(1);
    }

    pub fn scroll_scene_up(&mut self) {
        let max_offset = self.scene.scene_log().len().saturating_sub(1);
        self.scene_scroll_offset = (self.scene_scroll_offset + 1).min(max_offset);
    }

    pub fn scroll_scene_down(&mut self) {
        self.scene_scroll_offset = self.scene_scroll_offset.saturating_sub(1);
    }

    /// Start typing a prompt
    pub fn activate_editing(&mut self) {
        self.input_mode = InputMode::Editing;
    }

    /// Open the command line, optionally prefilled
    pub fn activate_command_mode(&mut self, preset: Option<&str>) {
        self.input_mode = InputMode::Command;
        self.command_buffer = preset.unwrap_or("/").to_string();
    }

    pub fn clear_command(&mut self) {
        self.command_buffer.clear();
    }

    /// Take the typed prompt, leaving the buffer empty
    pub fn take_prompt(&mut self) -> Option<String> {
        let prompt = self.prompt_buffer.trim().to_string();
        self.prompt_buffer.clear();
        if prompt.is_empty() { None } else { Some(prompt) }
    }

    /// A session is running and not yet closed
    pub fn session_active(&self) -> bool {
        matches!(
            self.session_state,
            SessionState::Connecting | SessionState::Open | SessionState::Receiving
        )
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::director::types::Utterance;

    #[test]
    fn test_apply_updates_mirror_scene() {
        let mut app = AppState::new(10);
        app.apply_update(&SceneUpdate::SessionStarted {
            id: SessionId(1),
            prompt: "A duel at dawn".to_string(),
        });
        app.apply_update(&SceneUpdate::Lifecycle {
            id: SessionId(1),
            state: SessionState::Connecting,
        });
        app.apply_update(&SceneUpdate::Loading(true));
        app.apply_update(&SceneUpdate::DirectorNote("Vision".to_string()));
        app.apply_update(&SceneUpdate::SceneAppended(vec![Utterance::new(
            "Knight", "En garde!", None,
        )]));
        app.apply_update(&SceneUpdate::Loading(false));

        assert!(app.session_active());
        assert_eq!(app.scene.director_note(), Some("Vision"));
        assert_eq!(app.scene.scene_log().len(), 1);
        assert!(!app.scene.is_loading());
        assert_eq!(app.active_prompt.as_deref(), Some("A duel at dawn"));
    }

    #[test]
    fn test_stale_lifecycle_does_not_override_current_session() {
        let mut app = AppState::new(10);
        app.apply_update(&SceneUpdate::SessionStarted {
            id: SessionId(2),
            prompt: "second".to_string(),
        });
        app.apply_update(&SceneUpdate::Lifecycle {
            id: SessionId(2),
            state: SessionState::Open,
        });
        app.apply_update(&SceneUpdate::Lifecycle {
            id: SessionId(1),
            state: SessionState::Closed,
        });
        assert_eq!(app.session_state, SessionState::Open);
    }

    #[test]
    fn test_log_history_is_bounded() {
        let mut app = AppState::new(3);
        for i in 0..5 {
            app.push_log(format!("line {}", i));
        }
        assert_eq!(app.log_messages.len(), 3);
        assert_eq!(app.log_messages.front().map(String::as_str), Some("line 2"));
    }

    #[test]
    fn test_scroll_clamps() {
        let mut app = AppState::new(10);
        app.scroll_logs_up();
        assert_eq!(app.log_scroll_offset, 0);

        app.push_log("a");
        app.push_log("b");
        app.scroll_logs_up();
        app.scroll_logs_up();
        assert_eq!(app.log_scroll_offset, 1);
        app.scroll_logs_down();
        app.scroll_logs_down();
        assert_eq!(app.log_scroll_offset, 0);
    }

    #[test]
    fn test_take_prompt() {
        let mut app = AppState::new(10);
        app.prompt_buffer = "   ".to_string();
        assert_eq!(app.take_prompt(), None);

        app.prompt_buffer = " Two knights ".to_string();
        assert_eq!(app.take_prompt().as_deref(), Some("Two knights"));
        assert!(app.prompt_buffer.is_empty());
    }
}
