use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::ui::ui_manager::RenderState;
use crate::ui::{AppState, InputMode};

use super::fg;

pub(super) fn render_prompt(frame: &mut Frame<'_>, area: Rect, app: &AppState, enable_colors: bool) {
    let (title, marker, buffer) = match app.input_mode {
        InputMode::Command => (" Command ", ">", app.command_buffer.as_str()),
        InputMode::Editing => (" Scene Prompt (Enter to start, Esc to cancel) ", "✎", app.prompt_buffer.as_str()),
        InputMode::Normal => (" Scene Prompt ", "✎", app.prompt_buffer.as_str()),
    };

    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let body = if app.input_mode == InputMode::Normal && buffer.is_empty() {
        let hint = match &app.active_prompt {
            Some(prompt) => format!("Last prompt: {}", prompt),
            None => "Press i to describe a scene".to_string(),
        };
        Line::from(Span::styled(hint, fg(enable_colors, Color::DarkGray)))
    } else {
        Line::from(vec![
            Span::styled(marker, fg(enable_colors, Color::Cyan)),
            Span::raw(" "),
            Span::raw(buffer.to_string()),
        ])
    };

    let paragraph = Paragraph::new(Text::from(vec![body])).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);

    if app.input_mode != InputMode::Normal && inner.width > 0 {
        let prompt_offset = 2u16; // marker plus trailing space
        let max_cursor_x = inner.x.saturating_add(inner.width.saturating_sub(1));
        let cursor_x = inner
            .x
            .saturating_add(prompt_offset)
            .saturating_add(buffer.chars().count() as u16)
            .min(max_cursor_x);
        frame.set_cursor(cursor_x, inner.y);
    }
}

pub(super) fn render_hints(
    frame: &mut Frame<'_>,
    area: Rect,
    app: &AppState,
    render_state: &RenderState,
    enable_colors: bool,
) {
    let key_style = fg(enable_colors, Color::Cyan).add_modifier(Modifier::BOLD);

    let mut hints = match app.input_mode {
        InputMode::Normal => vec![
            Span::styled("i", key_style),
            Span::raw(": Prompt  "),
            Span::styled("/", key_style),
            Span::raw(": Command  "),
            Span::styled("x", key_style),
            Span::raw(": Close  "),
            Span::styled("c", key_style),
            Span::raw(": Clear  "),
            Span::styled("j/k", key_style),
            Span::raw(": Scroll scene  "),
            Span::styled("PgUp/PgDn", key_style),
            Span::raw(": Scroll logs  "),
            Span::styled("q", key_style),
            Span::raw(": Quit"),
        ],
        InputMode::Editing | InputMode::Command => vec![
            Span::styled("Enter", key_style),
            Span::raw(": Submit  "),
            Span::styled("Esc", key_style),
            Span::raw(": Cancel"),
        ],
    };

    if let Some(msg) = render_state.pending_messages.last() {
        hints.push(Span::raw("   |   "));
        hints.push(Span::styled(msg.clone(), fg(enable_colors, Color::LightBlue)));
    }

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}
