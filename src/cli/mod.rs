//! Command Line Interface module
//!
//! Implements the CLI commands and argument parsing for PlayDirector.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "playdirector")]
#[command(about = "PlayDirector scene client")]
#[command(long_about = "Send a scene prompt to a director service and follow the streamed scene")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(long, default_value = "config.toml")]
    pub config_file: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the director WebSocket endpoint (e.g. ws://localhost:8000/ws/scene)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Dry-run mode: show welcome page and configuration without connecting
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start interactive terminal session
    #[command(hide = true)]
    Interactive {
        /// Use line-based output instead of full TUI
        #[arg(long)]
        simple: bool,
    },

    /// Run a single scene and print it as it streams
    Run {
        /// Scene prompt
        prompt: String,

        /// Stop after this many seconds without a new event
        #[arg(long)]
        idle_secs: Option<u64>,
    },

    /// Check that the director service is up
    Ping,

    /// Play a scripted scene against a built-in local director
    Demo,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Interactive { simple: false }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Reset configuration to defaults
    Reset,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the actual command, using default if none provided
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or_default()
    }

    /// Check if we're running in interactive mode
    pub fn is_interactive_mode(&self) -> bool {
        matches!(self.command(), Commands::Interactive { .. })
    }

    /// Whether the full-screen TUI owns the terminal
    pub fn uses_tui(&self) -> bool {
        matches!(self.command(), Commands::Interactive { simple: false }) && !self.dry_run
    }

    /// Adjust log level based on verbose flag
    pub fn effective_log_level(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.log_level.clone()
        }
    }

    /// Check if we're running in dry-run mode
    pub fn is_dry_run_mode(&self) -> bool {
        self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_interactive_tui() {
        let cli = Cli::parse_from(["playdirector"]);
        assert!(cli.is_interactive_mode());
        assert!(cli.uses_tui());
        assert_eq!(cli.config_file, "config.toml");
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from([
            "playdirector",
            "--endpoint",
            "ws://example.test/ws/scene",
            "run",
            "A duel at dawn",
            "--idle-secs",
            "30",
        ]);
        assert!(!cli.uses_tui());
        assert_eq!(cli.endpoint.as_deref(), Some("ws://example.test/ws/scene"));
        match cli.command() {
            Commands::Run { prompt, idle_secs } => {
                assert_eq!(prompt, "A duel at dawn");
                assert_eq!(idle_secs, Some(30));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_verbose_overrides_log_level() {
        let cli = Cli::parse_from(["playdirector", "-v", "--log-level", "warn"]);
        assert_eq!(cli.effective_log_level(), "debug");
    }

    #[test]
    fn test_config_set() {
        let cli = Cli::parse_from(["playdirector", "config", "set", "ui.update_rate_fps", "30"]);
        assert!(matches!(
            cli.command(),
            Commands::Config {
                action: Some(ConfigAction::Set { .. })
            }
        ));
    }
}
