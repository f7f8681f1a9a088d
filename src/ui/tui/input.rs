use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::UiAction;
use crate::ui::{AppState, InputMode};

/// Handle keyboard events for TUI, returning actions for the session manager
pub fn handle_key_event(app: &mut AppState, key_event: KeyEvent) -> UiAction {
    if key_event.kind == KeyEventKind::Release {
        return UiAction::None;
    }

    // Global shortcuts first
    if key_event.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char('c') | KeyCode::Char('d') = key_event.code {
            app.should_quit = true;
            return UiAction::QuitRequested;
        }
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode_keys(app, key_event),
        InputMode::Editing => handle_editing_mode_keys(app, key_event),
        InputMode::Command => handle_command_mode_keys(app, key_event),
    }
}

fn handle_normal_mode_keys(app: &mut AppState, key_event: KeyEvent) -> UiAction {
    match key_event.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            UiAction::QuitRequested
        }
        KeyCode::Char('i') | KeyCode::Enter => {
            app.activate_editing();
            UiAction::None
        }
        KeyCode::Char('/') | KeyCode::Char(':') => {
            app.activate_command_mode(None);
            UiAction::None
        }
        KeyCode::Char('c') => UiAction::SubmitCommand("/clear".to_string()),
        KeyCode::Char('x') => UiAction::SubmitCommand("/close".to_string()),
        KeyCode::Char('s') => UiAction::SubmitCommand("/status".to_string()),
        KeyCode::Char('L') => UiAction::SubmitCommand("/logs".to_string()),
        KeyCode::Char('?') => UiAction::SubmitCommand("/help".to_string()),
        KeyCode::Char('k') | KeyCode::Up => {
            app.scroll_scene_up();
            UiAction::None
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.scroll_scene_down();
            UiAction::None
        }
        KeyCode::PageUp => {
            app.scroll_logs_up();
            UiAction::None
        }
        KeyCode::PageDown => {
            app.scroll_logs_down();
            UiAction::None
        }
        _ => UiAction::None,
    }
}

fn handle_editing_mode_keys(app: &mut AppState, key_event: KeyEvent) -> UiAction {
    match key_event.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            UiAction::None
        }
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
            match app.take_prompt() {
                Some(prompt) => UiAction::SubmitPrompt(prompt),
                None => UiAction::None,
            }
        }
        KeyCode::Backspace => {
            app.prompt_buffer.pop();
            UiAction::None
        }
        KeyCode::Char(c) => {
            if !key_event.modifiers.contains(KeyModifiers::CONTROL) {
                app.prompt_buffer.push(c);
            }
            UiAction::None
        }
        _ => UiAction::None,
    }
}

fn handle_command_mode_keys(app: &mut AppState, key_event: KeyEvent) -> UiAction {
    match key_event.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.clear_command();
            UiAction::None
        }
        KeyCode::Enter => {
            let command = app.command_buffer.trim().to_string();
            app.input_mode = InputMode::Normal;
            app.clear_command();
            if command.is_empty() || command == "/" {
                UiAction::None
            } else {
                UiAction::SubmitCommand(command)
            }
        }
        KeyCode::Backspace => {
            app.command_buffer.pop();
            if app.command_buffer.is_empty() {
                app.input_mode = InputMode::Normal;
            }
            UiAction::None
        }
        KeyCode::Char(c) => {
            if !key_event.modifiers.contains(KeyModifiers::CONTROL) {
                app.command_buffer.push(c);
            }
            UiAction::None
        }
        _ => UiAction::None,
    }
}
