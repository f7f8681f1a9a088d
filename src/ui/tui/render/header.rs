use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::session::controller::SessionState;
use crate::ui::AppState;
use crate::ui::ui_manager::RenderState;

use super::fg;

pub(super) fn render_header(
    frame: &mut Frame<'_>,
    area: Rect,
    app: &AppState,
    render_state: &RenderState,
    enable_colors: bool,
) {
    let title = Span::styled(
        " PlayDirector ",
        fg(enable_colors, Color::Cyan).add_modifier(Modifier::BOLD),
    );

    let state_color = match app.session_state {
        SessionState::Idle => Color::Gray,
        SessionState::Connecting => Color::Yellow,
        SessionState::Open | SessionState::Receiving => Color::Green,
        SessionState::Closed => Color::Red,
    };
    let session_label = match app.session_id {
        Some(id) => format!("● {} {} ", id, app.session_state),
        None => format!("● {} ", app.session_state),
    };
    let status = Span::styled(session_label, fg(enable_colors, state_color));

    let loading = if app.scene.is_loading() {
        Span::styled(
            "LOADING",
            fg(enable_colors, Color::Yellow).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("READY", fg(enable_colors, Color::Green))
    };

    let mut spans = vec![title, Span::raw(" "), status, Span::raw(" "), loading];

    if let Some(last_status) = &app.last_status {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("status: {}", last_status),
            fg(enable_colors, Color::Gray),
        ));
    }

    spans.push(Span::styled(
        format!("  frames: {}", render_state.render_count),
        fg(enable_colors, Color::DarkGray),
    ));

    let block = Block::default().borders(Borders::ALL).title(" Session ");

    let paragraph = Paragraph::new(vec![Line::from(spans)])
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
