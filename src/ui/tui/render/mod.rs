mod header;
mod logs;
mod panels;
mod prompt;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};

use crate::ui::AppState;
use crate::ui::ui_manager::RenderState;

use self::header::render_header;
use self::logs::render_logs;
use self::panels::{render_director_panel, render_scene_panel};
use self::prompt::{render_hints, render_prompt};

pub(super) fn render_root(
    frame: &mut Frame<'_>,
    app: &AppState,
    render_state: &RenderState,
    enable_colors: bool,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(8),
            Constraint::Length(1),
        ])
        .split(frame.size());

    render_header(frame, chunks[0], app, render_state, enable_colors);
    render_prompt(frame, chunks[1], app, enable_colors);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
        .split(chunks[2]);

    render_director_panel(frame, body_chunks[0], app, enable_colors);
    render_scene_panel(frame, body_chunks[1], app, enable_colors);

    render_logs(frame, chunks[3], app, render_state, enable_colors);
    render_hints(frame, chunks[4], app, render_state, enable_colors);
}

/// Foreground style that collapses to the default when colors are off
pub(super) fn fg(enable_colors: bool, color: Color) -> Style {
    if enable_colors {
        Style::default().fg(color)
    } else {
        Style::default()
    }
}
