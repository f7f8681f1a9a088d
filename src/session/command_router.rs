//! Command Router for interactive command processing

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::ConfigAction;

/// Interactive commands for the terminal session
#[derive(Debug, Clone, PartialEq)]
pub enum InteractiveCommand {
    /// Start a new session with this prompt
    Start { prompt: String },
    /// Close the current session
    Close,
    /// Clear the director note and scene log
    Clear,
    /// Show session status
    Status,
    /// Show recent logs
    Logs,
    /// Configuration management
    Config { action: Option<ConfigAction> },
    /// Show interactive help
    Help,
    /// Quit the application
    Quit,
}

const HELP_LINES: &[&str] = &[
    "PlayDirector Interactive Commands:",
    "  <text>                        - Start a scene with this prompt",
    "  /start <prompt>               - Start a scene with this prompt",
    "  /close                        - Close the current session",
    "  /clear                        - Clear director note and scene",
    "  /status                       - Show session status",
    "  /logs                         - Show recent logs",
    "  /config [show|set|reset]      - Configuration management",
    "  /help                         - Show this help",
    "  /quit                         - Exit the application",
];

/// Command router for processing interactive commands
pub struct CommandRouter {
    /// Command input channel
    command_tx: mpsc::UnboundedSender<InteractiveCommand>,
    /// Command input receiver
    command_rx: Option<mpsc::UnboundedReceiver<InteractiveCommand>>,
}

impl CommandRouter {
    /// Create a new CommandRouter
    pub fn new() -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        Self {
            command_tx,
            command_rx: Some(command_rx),
        }
    }

    /// Send command to router
    pub fn send_command(&self, command: InteractiveCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| anyhow::anyhow!("Failed to send command: {}", e))
    }

    /// Get next command from input
    pub async fn next_command(&mut self) -> Option<InteractiveCommand> {
        if let Some(command_rx) = &mut self.command_rx {
            command_rx.recv().await
        } else {
            None
        }
    }

    /// Get command sender for external use
    pub fn command_sender(&self) -> mpsc::UnboundedSender<InteractiveCommand> {
        self.command_tx.clone()
    }

    /// Interactive help text
    pub fn help_messages() -> &'static [&'static str] {
        HELP_LINES
    }

    /// Parse interactive command from string input.
    ///
    /// Text that does not start with `/` is a prompt.
    pub fn parse_interactive_command(input: &str) -> Result<Option<InteractiveCommand>> {
        let input = input.trim();

        if input.is_empty() {
            return Ok(None);
        }

        if !input.starts_with('/') {
            return Ok(Some(InteractiveCommand::Start {
                prompt: input.to_string(),
            }));
        }

        let parts: Vec<&str> = input.split_whitespace().collect();

        match parts[0] {
            "/start" | "/scene" => {
                let prompt = input[parts[0].len()..].trim();
                if prompt.is_empty() {
                    return Err(anyhow::anyhow!("Usage: /start <prompt>"));
                }
                Ok(Some(InteractiveCommand::Start {
                    prompt: prompt.to_string(),
                }))
            }
            "/close" | "/stop" => Ok(Some(InteractiveCommand::Close)),
            "/clear" => Ok(Some(InteractiveCommand::Clear)),
            "/status" => Ok(Some(InteractiveCommand::Status)),
            "/logs" => Ok(Some(InteractiveCommand::Logs)),
            "/config" => {
                if parts.len() == 1 {
                    Ok(Some(InteractiveCommand::Config { action: None }))
                } else if parts.len() == 2 && parts[1] == "show" {
                    Ok(Some(InteractiveCommand::Config {
                        action: Some(ConfigAction::Show),
                    }))
                } else if parts.len() == 2 && parts[1] == "reset" {
                    Ok(Some(InteractiveCommand::Config {
                        action: Some(ConfigAction::Reset),
                    }))
                } else if parts.len() >= 3 && parts[1] == "set" {
                    let key = parts[2].to_string();
                    let value = if parts.len() > 3 {
                        parts[3..].join(" ")
                    } else {
                        "".to_string()
                    };
                    Ok(Some(InteractiveCommand::Config {
                        action: Some(ConfigAction::Set { key, value }),
                    }))
                } else {
                    Err(anyhow::anyhow!(
                        "Usage: /config [show|set <key> <value>|reset]"
                    ))
                }
            }
            "/help" | "/?" => Ok(Some(InteractiveCommand::Help)),
            "/quit" | "/exit" | "/q" => {
                info!("Quit command parsed");
                Ok(Some(InteractiveCommand::Quit))
            }
            _ => Err(anyhow::anyhow!(
                "Unknown command: {}. Type '/help' for available commands.",
                parts[0]
            )),
        }
    }
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Option<InteractiveCommand> {
        CommandRouter::parse_interactive_command(input).unwrap()
    }

    #[test]
    fn test_plain_text_is_prompt() {
        assert_eq!(
            parse("  A duel at dawn "),
            Some(InteractiveCommand::Start {
                prompt: "A duel at dawn".to_string()
            })
        );
    }

    #[test]
    fn test_start_keeps_inner_spacing() {
        assert_eq!(
            parse("/start Two  knights, one horse"),
            Some(InteractiveCommand::Start {
                prompt: "Two  knights, one horse".to_string()
            })
        );
        assert!(CommandRouter::parse_interactive_command("/start").is_err());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse("   "), None);
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("/close"), Some(InteractiveCommand::Close));
        assert_eq!(parse("/clear"), Some(InteractiveCommand::Clear));
        assert_eq!(parse("/status"), Some(InteractiveCommand::Status));
        assert_eq!(parse("/logs"), Some(InteractiveCommand::Logs));
        assert_eq!(parse("/help"), Some(InteractiveCommand::Help));
        assert_eq!(parse("/q"), Some(InteractiveCommand::Quit));
    }

    #[test]
    fn test_config_commands() {
        assert_eq!(
            parse("/config"),
            Some(InteractiveCommand::Config { action: None })
        );
        assert_eq!(
            parse("/config set session.clear_scene_on_start true"),
            Some(InteractiveCommand::Config {
                action: Some(ConfigAction::Set {
                    key: "session.clear_scene_on_start".to_string(),
                    value: "true".to_string()
                })
            })
        );
        assert!(CommandRouter::parse_interactive_command("/config bogus").is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(CommandRouter::parse_interactive_command("/dance").is_err());
    }

    #[tokio::test]
    async fn test_command_channel() {
        let mut router = CommandRouter::new();
        router.send_command(InteractiveCommand::Status).unwrap();
        router
            .command_sender()
            .send(InteractiveCommand::Quit)
            .unwrap();

        assert_eq!(router.next_command().await, Some(InteractiveCommand::Status));
        assert_eq!(router.next_command().await, Some(InteractiveCommand::Quit));
    }
}
