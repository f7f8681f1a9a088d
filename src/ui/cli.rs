//! Simple CLI output implementation
//!
//! Line-oriented rendering of scene updates for `run`, `demo` and
//! `interactive --simple`. Scene output goes to stdout; logs go to stderr.

use colored::Colorize;

use crate::AppResult;
use crate::config::Config;
use crate::director::types::Utterance;
use crate::session::action_channel::{LogsInfo, StatusInfo};
use crate::session::controller::{SceneUpdate, SessionState};
use crate::session::scene::SceneState;

pub const DIRECTOR_PLACEHOLDER: &str = "Waiting for director's output...";
pub const SCENE_PLACEHOLDER: &str = "Scene will appear here...";

/// Format one utterance as `speaker: content`, with its stage warning
pub fn format_utterance(utterance: &Utterance) -> String {
    let line = format!("{}: {}", utterance.speaker.bold(), utterance.content);
    match &utterance.stage_warning {
        Some(warning) => format!("{}  {}", line.red(), format!("⚠ {}", warning).yellow()),
        None => line,
    }
}

/// Render an update as printable lines; empty when nothing is worth showing
pub fn format_update(update: &SceneUpdate) -> Vec<String> {
    match update {
        SceneUpdate::SessionStarted { id, prompt } => vec![format!(
            "{} {}",
            format!("▶ Session {}", id).cyan().bold(),
            prompt
        )],
        SceneUpdate::Lifecycle { state, .. } => match state {
            SessionState::Open => vec!["  connected, prompt sent".dimmed().to_string()],
            SessionState::Closed => vec!["■ Session closed".dimmed().to_string()],
            _ => Vec::new(),
        },
        SceneUpdate::DirectorNote(message) => {
            let mut lines = vec!["🎬 Director's Vision".blue().bold().to_string()];
            lines.extend(message.lines().map(|line| format!("   {}", line)));
            lines
        }
        SceneUpdate::Status(message) => vec![format!(
            "{} {}",
            "status:".green(),
            message.as_deref().unwrap_or("(no message)")
        )],
        SceneUpdate::SceneAppended(utterances) => {
            utterances.iter().map(format_utterance).collect()
        }
        SceneUpdate::Loading(true) => vec!["… loading".dimmed().to_string()],
        SceneUpdate::Loading(false) => Vec::new(),
        SceneUpdate::SceneLogCleared => vec!["(scene log cleared)".dimmed().to_string()],
        SceneUpdate::SceneCleared => vec!["(director note and scene cleared)".dimmed().to_string()],
        SceneUpdate::PayloadRejected(reason) => {
            vec![format!("{} {}", "rejected payload:".yellow(), reason)]
        }
        SceneUpdate::TransportFailed(reason) => {
            vec![format!("{} {}", "connection error:".red().bold(), reason)]
        }
    }
}

/// Print a batch of updates to stdout
pub fn print_updates(updates: &[SceneUpdate]) {
    for update in updates {
        for line in format_update(update) {
            println!("{}", line);
        }
    }
}

/// Print the whole scene, with placeholders for empty panels
pub fn display_scene(scene: &SceneState) -> AppResult<()> {
    println!("{}", "🎬 Director's Vision".blue().bold());
    match scene.director_note().filter(|note| !note.is_empty()) {
        Some(note) => {
            for line in note.lines() {
                println!("   {}", line);
            }
        }
        None => println!("   {}", DIRECTOR_PLACEHOLDER.dimmed()),
    }

    println!();
    println!("{}", "🎤 Scene Play".bold());
    if scene.scene_log().is_empty() {
        println!("   {}", SCENE_PLACEHOLDER.dimmed());
    } else {
        for utterance in scene.scene_log() {
            println!("   {}", format_utterance(utterance));
        }
    }

    Ok(())
}

/// Display the welcome page shown before interactive line mode and in dry-run
pub fn display_welcome_page() -> AppResult<()> {
    println!();
    println!("{}", "┌─ PlayDirector ─────────────────────────────────────────────┐".cyan());
    println!("{}", "│                                                            │".cyan());
    println!("{}", "│   Send a scene prompt, watch the director stage it.        │".cyan());
    println!("{}", "│                                                            │".cyan());
    println!("{}", "│   Type a prompt and press Enter to start a scene.          │".cyan());
    println!("{}", "│   Type /help for commands, /quit to exit.                  │".cyan());
    println!("{}", "│                                                            │".cyan());
    println!("{}", "└────────────────────────────────────────────────────────────┘".cyan());
    println!();
    Ok(())
}

/// Display session status in CLI format
pub fn display_status(info: &StatusInfo) -> AppResult<()> {
    println!("{}", "🔍 PlayDirector Status:".bold());
    println!("   Version: {}", info.version);
    println!("   Endpoint: {}", info.endpoint);
    println!("   Session: {}", info.state);
    if let Some(connection) = &info.connection {
        println!("   Connection: {}", connection);
    }
    if let Some(started_at) = &info.started_at {
        println!("   Started: {}", started_at.format("%H:%M:%S"));
    }
    if let Some(prompt) = &info.prompt {
        println!("   Prompt: {}", prompt);
    }
    println!("   Loading: {}", if info.loading { "yes" } else { "no" });
    println!("   Scene lines: {}", info.utterances);
    println!(
        "   Commands processed: {}",
        info.session_stats.commands_processed
    );
    println!("   Events processed: {}", info.session_stats.events_processed);
    println!("   Errors: {}", info.session_stats.errors_encountered);
    Ok(())
}

/// Display recent captured logs
pub fn display_logs(info: &LogsInfo) -> AppResult<()> {
    println!(
        "{} (level {}, file {})",
        "📜 Recent logs".bold(),
        info.log_level,
        info.log_file_path
    );
    for line in &info.recent_logs {
        println!("   {}", line);
    }
    Ok(())
}

/// Print plain lines such as interactive help
pub fn display_lines(lines: &[String]) {
    println!();
    for line in lines {
        println!("{}", line);
    }
    println!();
}

pub fn display_error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

pub fn display_notice(message: &str) {
    println!("{}", message.dimmed());
}

/// Display configuration as TOML
pub fn display_config(config: &Config) -> AppResult<()> {
    config.display()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::controller::SessionId;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_format_utterance_with_warning() {
        plain();
        let utterance = Utterance::new("Knight", "I refuse.", Some("breaks character".into()));
        assert_eq!(
            format_utterance(&utterance),
            "Knight: I refuse.  ⚠ breaks character"
        );
    }

    #[test]
    fn test_scene_update_prints_each_line() {
        plain();
        let lines = format_update(&SceneUpdate::SceneAppended(vec![
            Utterance::new("A", "one", None),
            Utterance::new("B", "two", None),
        ]));
        assert_eq!(lines, vec!["A: one".to_string(), "B: two".to_string()]);
    }

    #[test]
    fn test_quiet_updates() {
        plain();
        assert!(format_update(&SceneUpdate::Loading(false)).is_empty());
        assert!(
            format_update(&SceneUpdate::Lifecycle {
                id: SessionId(1),
                state: SessionState::Receiving
            })
            .is_empty()
        );
    }

    #[test]
    fn test_status_without_message() {
        plain();
        assert_eq!(
            format_update(&SceneUpdate::Status(None)),
            vec!["status: (no message)".to_string()]
        );
    }
}
