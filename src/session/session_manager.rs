//! Session Manager for interactive terminal session lifecycle management

use anyhow::Result;
use chrono::{DateTime, Local};
use std::io::BufRead;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::cli::{Cli, ConfigAction};
use crate::config::Config;
use crate::ui::cli as line_ui;
use crate::ui::ui_manager::UIManager;

use super::action_channel::{ActionChannel, LogsInfo, SessionEvent, StatusInfo};
use super::command_router::{CommandRouter, InteractiveCommand};
use super::controller::{SceneUpdate, SessionController, SessionState};
use super::scene::SceneState;

/// Lifecycle of the interactive application itself
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Starting,
    Running,
    ShuttingDown,
    Terminated,
}

/// Session configuration for interactive mode
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Full-screen TUI instead of line output
    pub enable_tui: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { enable_tui: true }
    }
}

/// Session statistics for monitoring
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub start_time: DateTime<Local>,
    pub commands_processed: u64,
    pub events_processed: u64,
    pub errors_encountered: u64,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            start_time: Local::now(),
            commands_processed: 0,
            events_processed: 0,
            errors_encountered: 0,
        }
    }
}

/// Main session manager for interactive terminal
pub struct SessionManager {
    /// Session configuration
    config: SessionConfig,
    /// Application configuration
    app_config: Config,
    /// CLI arguments
    cli: Cli,
    /// Application state
    state: RunState,
    /// Session statistics
    stats: SessionStats,
    /// Streaming-session state machine
    controller: SessionController,
    /// UI task handle (optional)
    ui_task: Option<tokio::task::JoinHandle<()>>,
    /// UI event sender (Session -> UI)
    ui_event_tx: Option<mpsc::UnboundedSender<SessionEvent>>,
    /// Command router
    command_router: CommandRouter,
    /// Action channel
    action_channel: ActionChannel,
    /// Shutdown signal sender
    shutdown_tx: mpsc::Sender<()>,
    /// Shutdown signal receiver
    shutdown_rx: Option<mpsc::Receiver<()>>,
}

impl SessionManager {
    /// Create a new SessionManager
    pub fn new(cli: &Cli, app_config: Config) -> Result<Self> {
        info!("Creating new SessionManager");

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let mut controller = SessionController::from_config(&app_config);
        if let Some(endpoint) = &cli.endpoint {
            info!("Using endpoint override {}", endpoint);
            controller.set_endpoint(endpoint.clone());
        }

        let session_config = SessionConfig {
            enable_tui: cli.uses_tui(),
        };

        Ok(Self {
            config: session_config,
            app_config,
            cli: cli.clone(),
            state: RunState::Starting,
            stats: SessionStats::default(),
            controller,
            ui_task: None,
            ui_event_tx: None,
            command_router: CommandRouter::new(),
            action_channel: ActionChannel::new(),
            shutdown_tx,
            shutdown_rx: Some(shutdown_rx),
        })
    }

    /// Initialize the session
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing interactive session");

        if self.config.enable_tui {
            self.initialize_ui().await?;
            let lines = help_lines();
            self.forward_to_ui(SessionEvent::HelpInfo { lines });
        } else {
            self.spawn_input_reader();
        }

        self.state = RunState::Running;
        info!("Session initialized successfully");

        Ok(())
    }

    /// Start the session using the appropriate execution mode
    pub async fn start(&mut self) -> Result<()> {
        if self.cli.is_dry_run_mode() {
            return self.run_dry_run_mode();
        }

        if !self.config.enable_tui {
            self.display_welcome_page()?;
        } else {
            info!("TUI mode enabled, deferring welcome message to UI");
        }

        self.initialize().await?;

        self.run().await
    }

    fn run_dry_run_mode(&mut self) -> Result<()> {
        info!("Running in dry-run mode - showing welcome page and configuration");

        self.state = RunState::Running;

        self.display_welcome_page()?;
        self.print_dry_run_summary()?;

        self.state = RunState::Terminated;
        info!("Dry-run mode completed");
        Ok(())
    }

    fn print_dry_run_summary(&self) -> Result<()> {
        println!();
        println!("Dry-run mode configuration:");
        println!("Config file: {}", self.cli.config_file);
        println!("Log level: {}", self.cli.effective_log_level());
        println!("Effective endpoint: {}", self.controller.endpoint());
        self.app_config.display_summary()
    }

    /// Display welcome page for interactive mode
    pub fn display_welcome_page(&self) -> Result<()> {
        line_ui::display_welcome_page().map_err(|e| anyhow::anyhow!(e))
    }

    /// Initialize UI manager
    async fn initialize_ui(&mut self) -> Result<()> {
        info!("Initializing UI manager");

        let mut ui_manager = UIManager::new(self.action_channel.event_tx(), self.app_config.clone());

        self.ui_event_tx = Some(ui_manager.ui_event_sender());

        self.ui_task = Some(tokio::spawn(async move {
            if let Err(e) = ui_manager.run().await {
                error!("UI manager error: {}", e);
            }
        }));

        Ok(())
    }

    /// Read commands from stdin on a detached thread (line mode)
    fn spawn_input_reader(&mut self) {
        let command_tx = self.command_router.command_sender();

        let spawned = std::thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    match line {
                        Ok(line) => match CommandRouter::parse_interactive_command(&line) {
                            Ok(Some(command)) => {
                                if command_tx.send(command).is_err() {
                                    return;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => line_ui::display_error(&e.to_string()),
                        },
                        Err(e) => {
                            error!("Failed to read stdin: {}", e);
                            break;
                        }
                    }
                }
                debug!("Stdin closed, quitting");
                let _ = command_tx.send(InteractiveCommand::Quit);
            });

        if let Err(e) = spawned {
            error!("Failed to start stdin reader: {}", e);
        }
    }

    /// Run the main session loop
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting interactive session loop");

        let mut shutdown_rx = self
            .shutdown_rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("Session loop already started"))?;
        let line_mode = !self.config.enable_tui;

        while self.state != RunState::Terminated {
            tokio::select! {
                // Handle shutdown signal
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    self.shutdown().await?;
                }

                // Handle commands from command router
                Some(command) = self.command_router.next_command() => {
                    self.handle_command(command).await?;
                }

                // Handle events from action channel (including user commands)
                Some(event) = self.action_channel.next_event() => {
                    self.handle_event(event).await?;
                }

                // Transport events of the current scene session
                Some(event) = self.controller.next_transport_event() => {
                    self.stats.events_processed += 1;
                    let updates = self.controller.handle_transport_event(event);
                    self.publish(updates);
                }

                // The TUI handles Ctrl+C itself
                result = tokio::signal::ctrl_c(), if line_mode => {
                    if let Err(e) = result {
                        error!("Failed to listen for Ctrl+C: {}", e);
                    }
                    info!("Ctrl+C received, initiating shutdown");
                    self.shutdown().await?;
                }
            }
        }

        info!("Session loop terminated");
        Ok(())
    }

    /// Drive a single scene to its end and return the final scene.
    ///
    /// Ends when the connection closes, when no event arrived for
    /// `idle_timeout`, or on Ctrl+C.
    pub async fn run_prompt(
        &mut self,
        prompt: &str,
        idle_timeout: Option<Duration>,
    ) -> Result<SceneState> {
        self.state = RunState::Running;

        let updates = self.controller.start_session(prompt)?;
        self.publish(updates);

        loop {
            let idle = async {
                match idle_timeout {
                    Some(timeout) => tokio::time::sleep(timeout).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                event = self.controller.next_transport_event() => match event {
                    Some(event) => {
                        self.stats.events_processed += 1;
                        let updates = self.controller.handle_transport_event(event);
                        self.publish(updates);
                        if self.controller.session_state() == SessionState::Closed {
                            break;
                        }
                    }
                    None => break,
                },
                _ = idle => {
                    info!("No director events for {:?}, closing session", idle_timeout);
                    let updates = self.controller.close_session();
                    self.publish(updates);
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, closing session");
                    let updates = self.controller.close_session();
                    self.publish(updates);
                    break;
                }
            }
        }

        self.state = RunState::Terminated;
        Ok(self.controller.scene().clone())
    }

    /// Handle user command
    async fn handle_command(&mut self, command: InteractiveCommand) -> Result<()> {
        debug!("Handling command: {:?}", command);

        self.stats.commands_processed += 1;

        match command {
            InteractiveCommand::Start { prompt } => self.handle_start(prompt),
            InteractiveCommand::Close => self.handle_close(),
            InteractiveCommand::Clear => {
                let updates = self.controller.clear_scene();
                self.publish(updates);
                Ok(())
            }
            InteractiveCommand::Status => self.handle_status(),
            InteractiveCommand::Logs => self.handle_logs(),
            InteractiveCommand::Config { action } => self.handle_config(action),
            InteractiveCommand::Help => self.handle_help(),
            InteractiveCommand::Quit => self.handle_quit().await,
        }
    }

    /// Handle start command
    fn handle_start(&mut self, prompt: String) -> Result<()> {
        match self.controller.start_session(prompt) {
            Ok(updates) => self.publish(updates),
            Err(e) => {
                error!("Failed to start session: {}", e);
                self.action_channel.send_event(SessionEvent::Error {
                    message: format!("Failed to start session: {}", e),
                })?;
            }
        }
        Ok(())
    }

    /// Handle close command
    fn handle_close(&mut self) -> Result<()> {
        match self.controller.session_state() {
            SessionState::Idle | SessionState::Closed => {
                self.action_channel.send_event(SessionEvent::Notice {
                    message: "No active session to close".to_string(),
                })?;
            }
            _ => {
                let updates = self.controller.close_session();
                self.publish(updates);
            }
        }
        Ok(())
    }

    /// Handle status command
    fn handle_status(&mut self) -> Result<()> {
        let scene = self.controller.scene();
        let session = self.controller.session();
        let status_info = StatusInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            endpoint: self.controller.endpoint().to_string(),
            state: self.controller.session_state(),
            connection: session.map(|s| s.connection().status()),
            started_at: session.map(|s| s.started_at()),
            prompt: session.map(|s| s.prompt().to_string()),
            loading: scene.is_loading(),
            utterances: scene.scene_log().len(),
            session_stats: self.stats.clone(),
        };

        self.action_channel
            .send_event(SessionEvent::StatusInfo { info: status_info })?;

        Ok(())
    }

    /// Handle logs command
    fn handle_logs(&mut self) -> Result<()> {
        info!("User requested logs");

        let mut recent_logs = crate::recent_logs(100);
        if recent_logs.is_empty() {
            recent_logs.push("(no log entries captured yet)".to_string());
        }

        let logs_info = LogsInfo {
            recent_logs,
            log_file_path: self.app_config.log.file_path.clone(),
            log_level: self.cli.effective_log_level(),
        };

        self.action_channel
            .send_event(SessionEvent::LogsInfo { info: logs_info })?;

        Ok(())
    }

    /// Handle config command; changes apply in memory from the next session on
    fn handle_config(&mut self, action: Option<ConfigAction>) -> Result<()> {
        match action {
            Some(ConfigAction::Show) => {
                self.action_channel.send_event(SessionEvent::ConfigInfo {
                    config: self.app_config.clone(),
                })?;
            }
            Some(ConfigAction::Set { key, value }) => match self.app_config.set_value(&key, &value) {
                Ok(()) => {
                    info!("Updated {} to {}", key, value);
                    self.apply_config_to_controller();
                    self.action_channel.send_event(SessionEvent::ConfigInfo {
                        config: self.app_config.clone(),
                    })?;
                }
                Err(e) => {
                    warn!("Config update rejected: {}", e);
                    self.action_channel.send_event(SessionEvent::Error {
                        message: e.to_string(),
                    })?;
                }
            },
            Some(ConfigAction::Reset) => {
                self.app_config = Config::default();
                info!("Configuration reset to defaults");
                self.apply_config_to_controller();
                self.action_channel.send_event(SessionEvent::Notice {
                    message: "Configuration reset to defaults".to_string(),
                })?;
                self.action_channel.send_event(SessionEvent::ConfigInfo {
                    config: self.app_config.clone(),
                })?;
            }
            None => {
                self.action_channel.send_event(SessionEvent::Notice {
                    message: "Config commands: /config show | /config set <key> <value> | /config reset"
                        .to_string(),
                })?;
            }
        }

        Ok(())
    }

    fn apply_config_to_controller(&mut self) {
        if self.cli.endpoint.is_none() {
            self.controller
                .set_endpoint(self.app_config.director.endpoint());
        }
        self.controller
            .set_clear_scene_on_start(self.app_config.session.clear_scene_on_start);
    }

    /// Handle help command
    fn handle_help(&mut self) -> Result<()> {
        info!("User requested interactive help");
        self.action_channel
            .send_event(SessionEvent::HelpInfo { lines: help_lines() })
    }

    /// Handle quit command
    async fn handle_quit(&mut self) -> Result<()> {
        info!("User requested quit");
        self.shutdown().await
    }

    /// Handle session event
    async fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        debug!("Handling session event: {:?}", event);

        self.stats.events_processed += 1;

        match event {
            SessionEvent::ShutdownRequested => {
                self.shutdown().await?;
            }
            SessionEvent::Error { message } => {
                error!("Session error: {}", message);
                self.stats.errors_encountered += 1;
                self.present(SessionEvent::Error { message });
            }
            SessionEvent::UserCommand { command } => {
                self.handle_command(command).await?;
            }
            other => {
                self.present(other);
            }
        }

        Ok(())
    }

    /// Hand controller updates to the presentation layer in order
    fn publish(&self, updates: Vec<SceneUpdate>) {
        if self.config.enable_tui {
            for update in updates {
                self.forward_to_ui(SessionEvent::Scene(update));
            }
        } else {
            line_ui::print_updates(&updates);
        }
    }

    /// Show an event in the TUI, or print it in line mode
    fn present(&self, event: SessionEvent) {
        if self.config.enable_tui {
            self.forward_to_ui(event);
            return;
        }

        let result = match &event {
            SessionEvent::Error { message } => {
                line_ui::display_error(message);
                Ok(())
            }
            SessionEvent::Notice { message } => {
                line_ui::display_notice(message);
                Ok(())
            }
            SessionEvent::Scene(update) => {
                line_ui::print_updates(std::slice::from_ref(update));
                Ok(())
            }
            SessionEvent::StatusInfo { info } => line_ui::display_status(info),
            SessionEvent::ConfigInfo { config } => line_ui::display_config(config),
            SessionEvent::HelpInfo { lines } => {
                line_ui::display_lines(lines);
                Ok(())
            }
            SessionEvent::LogsInfo { info } => line_ui::display_logs(info),
            SessionEvent::ShutdownRequested | SessionEvent::UserCommand { .. } => Ok(()),
        };

        if let Err(e) = result {
            error!("Failed to print {:?}: {}", event, e);
        }
    }

    /// Forward an event to the UI if the channel is available
    fn forward_to_ui(&self, event: SessionEvent) {
        if let Some(ui_event_tx) = &self.ui_event_tx {
            if let Err(e) = ui_event_tx.send(event) {
                error!("Failed to forward event to UI: {}", e);
            }
        }
    }

    /// Graceful shutdown
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Initiating graceful shutdown");

        self.state = RunState::ShuttingDown;

        if !matches!(
            self.controller.session_state(),
            SessionState::Idle | SessionState::Closed
        ) {
            self.controller.close_session();
        }

        // Notify UI to shutdown and wait for task completion
        if let Some(ui_event_tx) = self.ui_event_tx.take() {
            if let Err(e) = ui_event_tx.send(SessionEvent::ShutdownRequested) {
                debug!("UI already gone during shutdown: {}", e);
            }
        }
        if let Some(ui_task) = self.ui_task.take() {
            if let Err(e) = ui_task.await {
                error!("UI task terminated with error: {}", e);
            }
        }

        self.state = RunState::Terminated;
        info!("Shutdown completed");

        Ok(())
    }

    /// Get session statistics
    pub fn get_stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Get application state
    pub fn get_state(&self) -> &RunState {
        &self.state
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Request shutdown
    pub fn request_shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .try_send(())
            .map_err(|e| anyhow::anyhow!("Failed to send shutdown signal: {}", e))
    }
}

fn help_lines() -> Vec<String> {
    CommandRouter::help_messages()
        .iter()
        .map(|line| (*line).to_string())
        .collect()
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if self.state != RunState::Terminated {
            warn!("SessionManager dropped without proper shutdown");
        }
    }
}
