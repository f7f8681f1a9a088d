//! UI Manager for interactive terminal interface

use anyhow::Result;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crossterm::event::{self, Event, MouseEventKind};

use crate::config::Config;
use crate::session::action_channel::SessionEvent;
use crate::session::command_router::{CommandRouter, InteractiveCommand};

use super::AppState;
use super::tui::{Tui, UiAction, handle_key_event};

const MAX_PENDING_MESSAGES: usize = 32;

/// UI Manager for managing the terminal interface
pub struct UIManager {
    /// Event sender for session events (UI -> Session)
    session_event_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Event sender for UI events (Session -> UI)
    ui_event_tx: mpsc::UnboundedSender<SessionEvent>,
    /// Event receiver for UI events
    event_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    /// Application state
    app_state: AppState,
    /// UI rendering state
    render_state: RenderState,
    /// Active configuration snapshot
    config: Config,
    /// TUI terminal handle
    tui: Option<Tui>,
    /// Desired refresh cadence
    refresh_interval: Duration,
    /// Time of the last successful render
    last_render: Instant,
}

/// UI rendering state
#[derive(Debug, Clone)]
pub struct RenderState {
    pub should_quit: bool,
    pub should_redraw: bool,
    pub render_count: u64,
    pub error_message: Option<String>,
    pub pending_messages: Vec<String>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            should_quit: false,
            should_redraw: true,
            render_count: 0,
            error_message: None,
            pending_messages: Vec::new(),
        }
    }
}

impl RenderState {
    fn queue_message(&mut self, message: impl Into<String>) {
        self.pending_messages.push(message.into());
        if self.pending_messages.len() > MAX_PENDING_MESSAGES {
            self.pending_messages.remove(0);
        }
        self.should_redraw = true;
    }
}

fn refresh_interval(config: &Config) -> Duration {
    Duration::from_millis(1000 / u64::from(config.ui.update_rate_fps.max(1))).clamp(
        Duration::from_millis(16),
        Duration::from_millis(1000),
    )
}

impl UIManager {
    /// Create a new UIManager
    pub fn new(session_event_tx: mpsc::UnboundedSender<SessionEvent>, config: Config) -> Self {
        let (ui_event_tx, ui_event_rx) = mpsc::unbounded_channel();

        Self {
            session_event_tx,
            ui_event_tx,
            event_rx: Some(ui_event_rx),
            app_state: AppState::new(config.ui.log_history),
            render_state: RenderState::default(),
            refresh_interval: refresh_interval(&config),
            config,
            tui: None,
            last_render: Instant::now(),
        }
    }

    /// Get UI event sender (Session -> UI)
    pub fn ui_event_sender(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.ui_event_tx.clone()
    }

    /// Run the UI manager
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting UI manager");

        let message = "Interactive mode ready. Press 'i' to write a prompt, '/' for commands.";
        self.render_state.queue_message(message);
        self.app_state.push_log(message);

        self.run_ui_loop().await?;

        info!("UI manager stopped");
        Ok(())
    }

    /// Main UI rendering loop
    async fn run_ui_loop(&mut self) -> Result<()> {
        info!("Starting UI rendering loop");

        let ui_shutdown_tx = self.ui_event_tx.clone();
        let session_shutdown_tx = self.session_event_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                return;
            }

            tracing::info!("Ctrl+C received, initiating shutdown");
            let _ = ui_shutdown_tx.send(SessionEvent::ShutdownRequested);
            let _ = session_shutdown_tx.send(SessionEvent::ShutdownRequested);
        });

        self.tui =
            Some(Tui::new().map_err(|e| anyhow::anyhow!("Failed to initialise terminal: {}", e))?);
        self.render_state.should_redraw = true;

        while !self.render_state.should_quit && !self.app_state.should_quit {
            // Process async events from the session layer
            self.process_events();

            // Handle terminal input (non-blocking)
            self.poll_terminal_events()?;

            // Render on dirty state or cadence tick
            let now = Instant::now();
            if self.render_state.should_redraw
                || now.duration_since(self.last_render) >= self.refresh_interval
            {
                if let Some(tui) = self.tui.as_mut() {
                    self.render_state.render_count += 1;
                    tui.draw(
                        &self.app_state,
                        &self.render_state,
                        self.config.ui.enable_colors,
                    )
                    .map_err(|e| anyhow::anyhow!("Failed to render frame: {}", e))?;
                }
                self.render_state.should_redraw = false;
                self.last_render = now;
            }

            // Prevent busy loop
            tokio::time::sleep(Duration::from_millis(16)).await;
        }

        if let Some(tui) = self.tui.as_mut() {
            tui.restore()
                .map_err(|e| anyhow::anyhow!("Failed to restore terminal state: {}", e))?;
        }

        Ok(())
    }

    /// Poll for keyboard/terminal events and translate into session actions
    fn poll_terminal_events(&mut self) -> Result<()> {
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key_event) => {
                    let action = handle_key_event(&mut self.app_state, key_event);
                    self.render_state.should_redraw = true;
                    self.apply_action(action);
                }
                Event::Resize(_, _) => {
                    self.render_state.should_redraw = true;
                }
                Event::Mouse(mouse_event) => match mouse_event.kind {
                    MouseEventKind::ScrollUp => {
                        self.app_state.scroll_logs_up();
                        self.render_state.should_redraw = true;
                    }
                    MouseEventKind::ScrollDown => {
                        self.app_state.scroll_logs_down();
                        self.render_state.should_redraw = true;
                    }
                    _ => {}
                },
                Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
            }
        }

        if self.app_state.should_quit {
            self.render_state.should_quit = true;
        }

        Ok(())
    }

    fn apply_action(&mut self, action: UiAction) {
        match action {
            UiAction::None => {}
            UiAction::QuitRequested => {
                self.render_state.should_quit = true;
                let _ = self.session_event_tx.send(SessionEvent::ShutdownRequested);
            }
            UiAction::SubmitPrompt(prompt) => {
                self.render_state.error_message = None;
                self.forward_command(InteractiveCommand::Start { prompt });
            }
            UiAction::SubmitCommand(cmd) => self.process_user_command(&cmd),
        }
    }

    fn forward_command(&mut self, command: InteractiveCommand) {
        if let Err(e) = self
            .session_event_tx
            .send(SessionEvent::UserCommand { command })
        {
            let message = format!("Failed to send user command: {}", e);
            error!("{}", message);
            self.render_state.error_message = Some(message.clone());
            self.app_state.push_log(message);
        }
    }

    /// Process user command from input
    fn process_user_command(&mut self, input: &str) {
        debug!("Processing user command: {}", input);

        match CommandRouter::parse_interactive_command(input) {
            Ok(Some(InteractiveCommand::Quit)) => {
                info!("User requested quit");
                self.render_state.should_quit = true;
                let _ = self.session_event_tx.send(SessionEvent::ShutdownRequested);
                self.app_state.push_log("Shutdown requested via command");
            }
            Ok(Some(command)) => self.forward_command(command),
            Ok(None) => {
                debug!("Empty command");
            }
            Err(e) => {
                let message = format!("Command error: {}", e);
                self.render_state.error_message = Some(message.clone());
                self.render_state.queue_message(message.clone());
                self.app_state.push_log(message);
                warn!("Command parsing error: {}", e);
            }
        }
    }

    /// Drain events queued by the session layer
    fn process_events(&mut self) {
        let mut events_to_process = Vec::new();
        if let Some(event_rx) = &mut self.event_rx {
            while let Ok(event) = event_rx.try_recv() {
                events_to_process.push(event);
            }
        }

        if !events_to_process.is_empty() {
            self.render_state.should_redraw = true;
        }
        for event in events_to_process {
            self.handle_event(event);
        }
    }

    /// Handle session event
    pub fn handle_event(&mut self, event: SessionEvent) {
        debug!("Handling UI event: {:?}", event);
        self.render_state.should_redraw = true;

        match event {
            SessionEvent::ShutdownRequested => {
                self.render_state
                    .queue_message("Shutdown requested. Exiting interactive session...");
                self.render_state.should_quit = true;
                info!("UI received shutdown request");
            }
            SessionEvent::Error { message } => {
                let formatted = format!("Error: {}", message);
                self.render_state.error_message = Some(formatted.clone());
                self.render_state.queue_message(formatted.clone());
                self.app_state.push_log(formatted);
            }
            SessionEvent::Notice { message } => {
                self.render_state.queue_message(message.clone());
                self.app_state.push_log(message);
            }
            SessionEvent::Scene(update) => {
                self.app_state.apply_update(&update);
            }
            SessionEvent::StatusInfo { info } => {
                let connection = info
                    .connection
                    .as_ref()
                    .map(|status| status.to_string())
                    .unwrap_or_else(|| "none".to_string());
                let message = format!(
                    "Status → {} | session {} | connection {} | {} scene lines | loading {}",
                    info.endpoint,
                    info.state,
                    connection,
                    info.utterances,
                    if info.loading { "yes" } else { "no" }
                );
                self.render_state.queue_message(message.clone());
                self.app_state.push_log(message);
                if let Some(started_at) = info.started_at {
                    self.app_state
                        .push_log(format!("Session started at {}", started_at.format("%H:%M:%S")));
                }
                self.app_state.push_log(format!(
                    "Commands {} | Events {} | Errors {}",
                    info.session_stats.commands_processed,
                    info.session_stats.events_processed,
                    info.session_stats.errors_encountered
                ));
            }
            SessionEvent::ConfigInfo { config } => {
                self.refresh_interval = refresh_interval(&config);
                self.app_state.log_history = config.ui.log_history.max(1);
                let message = format!(
                    "Config → endpoint {}, {} fps, colors {}",
                    config.director.endpoint(),
                    config.ui.update_rate_fps,
                    if config.ui.enable_colors { "on" } else { "off" }
                );
                self.config = config;
                self.render_state.queue_message(message.clone());
                self.app_state.push_log(message);
            }
            SessionEvent::HelpInfo { lines } => {
                if !lines.is_empty() {
                    self.render_state
                        .queue_message("Help listed in log panel (PgUp/PgDn to scroll)");
                }
                for line in lines {
                    self.app_state.push_log(format!("[help] {}", line));
                }
            }
            SessionEvent::LogsInfo { info } => {
                self.render_state.queue_message(format!(
                    "Recent logs ({}) written to {}",
                    info.log_level, info.log_file_path
                ));
                for log in info.recent_logs {
                    self.app_state.push_log(format!("[log] {}", log));
                }
            }
            SessionEvent::UserCommand { command } => {
                debug!("Ignoring user command routed to UI: {:?}", command);
            }
        }
    }

    /// Get application state
    pub fn app_state(&self) -> &AppState {
        &self.app_state
    }

    /// Get render statistics
    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::director::types::Utterance;
    use crate::session::controller::SceneUpdate;

    fn manager() -> (UIManager, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (UIManager::new(tx, Config::default()), rx)
    }

    #[test]
    fn test_scene_events_update_app_state() {
        let (mut ui, _rx) = manager();
        ui.handle_event(SessionEvent::Scene(SceneUpdate::DirectorNote(
            "Vision".to_string(),
        )));
        ui.handle_event(SessionEvent::Scene(SceneUpdate::SceneAppended(vec![
            Utterance::new("A", "line", None),
        ])));

        assert_eq!(ui.app_state().scene.director_note(), Some("Vision"));
        assert_eq!(ui.app_state().scene.scene_log().len(), 1);
    }

    #[test]
    fn test_prompt_is_forwarded_as_start_command() {
        let (mut ui, mut rx) = manager();
        ui.apply_action(UiAction::SubmitPrompt("A duel at dawn".to_string()));

        match rx.try_recv() {
            Ok(SessionEvent::UserCommand {
                command: InteractiveCommand::Start { prompt },
            }) => assert_eq!(prompt, "A duel at dawn"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_bad_command_reports_error() {
        let (mut ui, mut rx) = manager();
        ui.process_user_command("/dance");

        assert!(ui.render_state().error_message.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_quit_command_requests_shutdown() {
        let (mut ui, mut rx) = manager();
        ui.process_user_command("/quit");

        assert!(ui.render_state().should_quit);
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::ShutdownRequested)));
    }

    #[test]
    fn test_status_info_shows_connection() {
        use crate::director::types::ConnectionStatus;
        use crate::session::action_channel::StatusInfo;
        use crate::session::controller::SessionState;
        use crate::session::session_manager::SessionStats;

        let (mut ui, _rx) = manager();
        ui.handle_event(SessionEvent::StatusInfo {
            info: StatusInfo {
                version: "0.1.0".to_string(),
                endpoint: "ws://localhost:8000/ws/scene".to_string(),
                state: SessionState::Receiving,
                connection: Some(ConnectionStatus::Connected),
                started_at: Some(chrono::Local::now()),
                prompt: Some("A duel at dawn".to_string()),
                loading: true,
                utterances: 0,
                session_stats: SessionStats::default(),
            },
        });

        let logs = &ui.app_state().log_messages;
        assert!(logs.iter().any(|line| line.contains("connection connected")));
        assert!(logs.iter().any(|line| line.starts_with("Session started at")));
    }

    #[test]
    fn test_refresh_interval_follows_fps() {
        let mut config = Config::default();
        config.ui.update_rate_fps = 10;
        assert_eq!(refresh_interval(&config), Duration::from_millis(100));
        config.ui.update_rate_fps = 1000;
        assert_eq!(refresh_interval(&config), Duration::from_millis(16));
    }
}
