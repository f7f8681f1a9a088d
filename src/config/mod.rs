//! Configuration management module
//!
//! Handles loading, validation, and management of application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Logging level
    pub log_level: String,

    /// File-based logging configuration
    pub log: LogConfig,

    /// Director service configuration
    pub director: DirectorConfig,

    /// Session behaviour
    #[serde(default)]
    pub session: SessionSettings,

    /// UI-specific configuration
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectorConfig {
    /// WebSocket base URL
    pub ws_url: String,

    /// Streaming endpoint path
    pub scene_path: String,

    /// HTTP base URL for the health check
    pub http_url: String,

    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Clear the scene log whenever a new session starts
    pub clear_scene_on_start: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    /// Enable colors in line output and TUI
    pub enable_colors: bool,

    /// TUI update rate in FPS
    pub update_rate_fps: u32,

    /// Log lines kept for the log pane
    pub log_history: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Absolute or relative path to the log file used while the TUI runs
    pub file_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log: LogConfig::default(),
            director: DirectorConfig::default(),
            session: SessionSettings::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8000".to_string(),
            scene_path: "/ws/scene".to_string(),
            http_url: "http://localhost:8000".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            clear_scene_on_start: false,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            enable_colors: true,
            update_rate_fps: 20,
            log_history: 200,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: "logs/playdirector.log".to_string(),
        }
    }
}

impl DirectorConfig {
    /// Full WebSocket URL of the streaming endpoint
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.ws_url.trim_end_matches('/'),
            self.scene_path.trim_start_matches('/')
        )
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides.
    ///
    /// A missing file means defaults; overrides and validation apply either way.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Config::default()
        };

        // Apply environment variable overrides
        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides, or plain defaults if the overrides are invalid
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        match config.validate() {
            Ok(()) => config,
            Err(e) => {
                tracing::warn!("Ignoring invalid environment overrides: {}", e);
                Config::default()
            }
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        // PLAYDIRECTOR_LOG_LEVEL - logging level
        if let Ok(log_level) = env::var("PLAYDIRECTOR_LOG_LEVEL") {
            self.log_level = log_level;
        }

        // PLAYDIRECTOR_LOG_FILE_PATH - logging destination file
        if let Ok(file_path) = env::var("PLAYDIRECTOR_LOG_FILE_PATH") {
            if !file_path.trim().is_empty() {
                self.log.file_path = file_path;
            }
        }

        // PLAYDIRECTOR_WS_URL - WebSocket base URL
        if let Ok(ws_url) = env::var("PLAYDIRECTOR_WS_URL") {
            self.director.ws_url = ws_url;
        }

        // PLAYDIRECTOR_SCENE_PATH - streaming endpoint path
        if let Ok(scene_path) = env::var("PLAYDIRECTOR_SCENE_PATH") {
            self.director.scene_path = scene_path;
        }

        // PLAYDIRECTOR_HTTP_URL - HTTP base URL
        if let Ok(http_url) = env::var("PLAYDIRECTOR_HTTP_URL") {
            self.director.http_url = http_url;
        }

        // PLAYDIRECTOR_TIMEOUT_SECONDS - HTTP timeout
        if let Ok(timeout) = env::var("PLAYDIRECTOR_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.director.timeout_seconds = value;
            }
        }

        // PLAYDIRECTOR_CLEAR_SCENE_ON_START - reset scene per session
        if let Ok(clear) = env::var("PLAYDIRECTOR_CLEAR_SCENE_ON_START") {
            self.session.clear_scene_on_start =
                clear.parse().unwrap_or(self.session.clear_scene_on_start);
        }

        // PLAYDIRECTOR_UI_ENABLE_COLORS - enable colors
        if let Ok(enable_colors) = env::var("PLAYDIRECTOR_UI_ENABLE_COLORS") {
            self.ui.enable_colors = enable_colors.parse().unwrap_or(self.ui.enable_colors);
        }

        // PLAYDIRECTOR_UI_UPDATE_RATE_FPS - UI update rate
        if let Ok(fps) = env::var("PLAYDIRECTOR_UI_UPDATE_RATE_FPS") {
            if let Ok(value) = fps.parse::<u32>() {
                self.ui.update_rate_fps = value;
            }
        }
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_else(|err| {
            tracing::warn!("Failed to load config: {}, using defaults", err);
            Self::from_env()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(self.director.ws_url.starts_with("ws://") || self.director.ws_url.starts_with("wss://"))
        {
            anyhow::bail!(
                "director.ws_url must start with ws:// or wss://: {}",
                self.director.ws_url
            );
        }

        if !(self.director.http_url.starts_with("http://")
            || self.director.http_url.starts_with("https://"))
        {
            anyhow::bail!(
                "director.http_url must start with http:// or https://: {}",
                self.director.http_url
            );
        }

        if !self.director.scene_path.starts_with('/') {
            anyhow::bail!("director.scene_path must start with '/'");
        }

        if self.director.timeout_seconds == 0 {
            anyhow::bail!("Timeout must be greater than 0");
        }

        if self.log.file_path.trim().is_empty() {
            anyhow::bail!("Log file path must not be empty");
        }

        if self.ui.update_rate_fps == 0 {
            anyhow::bail!("ui.update_rate_fps must be greater than 0");
        }

        if self.ui.log_history == 0 {
            anyhow::bail!("ui.log_history must be greater than 0");
        }

        Ok(())
    }

    /// Set one supported key, keeping the configuration valid
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.clone();
        let parse_err = |kind: &str| anyhow::anyhow!("Invalid {} value for {}: {}", kind, key, value);

        match key.to_ascii_lowercase().replace('-', "_").as_str() {
            "log_level" => updated.log_level = value.to_string(),
            "log.file_path" => updated.log.file_path = value.to_string(),
            "director.ws_url" => updated.director.ws_url = value.to_string(),
            "director.scene_path" => updated.director.scene_path = value.to_string(),
            "director.http_url" => updated.director.http_url = value.to_string(),
            "director.timeout_seconds" => {
                updated.director.timeout_seconds = value.parse().map_err(|_| parse_err("integer"))?
            }
            "session.clear_scene_on_start" => {
                updated.session.clear_scene_on_start =
                    value.parse().map_err(|_| parse_err("boolean"))?
            }
            "ui.enable_colors" => {
                updated.ui.enable_colors = value.parse().map_err(|_| parse_err("boolean"))?
            }
            "ui.update_rate_fps" => {
                updated.ui.update_rate_fps = value.parse().map_err(|_| parse_err("integer"))?
            }
            "ui.log_history" => {
                updated.ui.log_history = value.parse().map_err(|_| parse_err("integer"))?
            }
            other => anyhow::bail!("Unsupported config key: {}", other),
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Display formatted configuration
    pub fn display(&self) -> Result<()> {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(self)?);
        Ok(())
    }

    /// Display configuration summary
    pub fn display_summary(&self) -> Result<()> {
        println!("Configuration loaded successfully");
        println!("Scene endpoint: {}", self.director.endpoint());
        println!("Health endpoint: {}/", self.director.http_url.trim_end_matches('/'));
        Ok(())
    }

    /// Display configuration management help
    pub fn display_help() -> Result<()> {
        println!("Configuration management commands:");
        println!("  playdirector config show    - Show current configuration");
        println!("  playdirector config set <key> <value> - Set configuration value");
        println!("  playdirector config reset   - Reset to default configuration");
        Ok(())
    }

    /// Handle configuration command
    pub fn handle_command<P: AsRef<Path>>(
        path: P,
        action: &Option<crate::cli::ConfigAction>,
    ) -> Result<()> {
        match action {
            Some(crate::cli::ConfigAction::Show) => {
                let config = Config::load_or_default(&path);
                println!("Configuration from {}", path.as_ref().display());
                config.display()?;
            }
            Some(crate::cli::ConfigAction::Set { key, value }) => {
                let mut config = Config::load_or_default(&path);
                config.set_value(key, value)?;
                config.save_to_file(&path)?;
                println!("Set {} = {} in {}", key, value, path.as_ref().display());
            }
            Some(crate::cli::ConfigAction::Reset) => {
                let default_config = Config::default();
                default_config.save_to_file(&path)?;
                println!("Configuration reset: {}", path.as_ref().display());
                default_config.display()?;
            }
            None => {
                Config::display_help()?;
            }
        }
        Ok(())
    }
}
