use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, List, ListItem};

use crate::ui::AppState;
use crate::ui::ui_manager::RenderState;

use super::fg;

pub(super) fn render_logs(
    frame: &mut Frame<'_>,
    area: Rect,
    app: &AppState,
    render_state: &RenderState,
    enable_colors: bool,
) {
    let total_logs = app.log_messages.len();
    let max_offset = total_logs.saturating_sub(1);
    let clamped_offset = app.log_scroll_offset.min(max_offset);

    let block = if clamped_offset > 0 {
        Block::default()
            .title(format!(" Logs (older +{clamped_offset}) "))
            .borders(Borders::ALL)
    } else {
        Block::default().title(" Logs ").borders(Borders::ALL)
    };
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 {
        return;
    }

    let viewport_height = inner.height as usize;
    let mut items: Vec<ListItem> = Vec::new();
    let mut rows_remaining = viewport_height;

    if clamped_offset == 0 {
        if let Some(error) = &render_state.error_message {
            items.push(ListItem::new(Span::styled(
                error.clone(),
                fg(enable_colors, Color::Red),
            )));
            rows_remaining = rows_remaining.saturating_sub(1);
        }
    }

    if rows_remaining > 0 && total_logs > 0 {
        let end_index = total_logs.saturating_sub(clamped_offset);
        let start_index = end_index.saturating_sub(rows_remaining);

        for msg in app
            .log_messages
            .iter()
            .skip(start_index)
            .take(end_index - start_index)
        {
            items.push(ListItem::new(Span::raw(msg.clone())));
        }
    }

    if items.is_empty() {
        items.push(ListItem::new(Span::styled(
            "No log messages yet",
            fg(enable_colors, Color::Gray),
        )));
    }

    frame.render_widget(List::new(items), inner);
}
