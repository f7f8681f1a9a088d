use std::ops::Range;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::director::types::Utterance;
use crate::ui::AppState;
use crate::ui::cli::{DIRECTOR_PLACEHOLDER, SCENE_PLACEHOLDER};

use super::fg;

pub(super) fn render_director_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    app: &AppState,
    enable_colors: bool,
) {
    let block = Block::default()
        .title(Span::styled(
            " 🎬 Director's Vision ",
            fg(enable_colors, Color::LightBlue).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL);

    let lines = director_lines(app.scene.director_note(), enable_colors);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

pub(super) fn render_scene_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    app: &AppState,
    enable_colors: bool,
) {
    let log = app.scene.scene_log();

    let title = if app.scene_scroll_offset > 0 {
        format!(" 🎤 Scene Play (older +{}) ", app.scene_scroll_offset)
    } else if app.scene.is_loading() {
        " 🎤 Scene Play (loading...) ".to_string()
    } else {
        " 🎤 Scene Play ".to_string()
    };
    let block = Block::default()
        .title(Span::styled(
            title,
            fg(enable_colors, Color::White).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    if log.is_empty() {
        let placeholder = Paragraph::new(Span::styled(
            SCENE_PLACEHOLDER,
            fg(enable_colors, Color::Gray),
        ));
        frame.render_widget(placeholder, inner);
        return;
    }

    let width = inner.width as usize;
    let heights: Vec<usize> = log
        .iter()
        .map(|utterance| wrapped_height(utterance, width))
        .collect();
    let range = visible_range(&heights, app.scene_scroll_offset, inner.height as usize);

    let lines: Vec<Line> = log[range]
        .iter()
        .map(|utterance| utterance_line(utterance, enable_colors))
        .collect();

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, inner);
}

/// Note text, or the placeholder while there is no non-empty note
fn director_lines(note: Option<&str>, enable_colors: bool) -> Vec<Line<'static>> {
    match note.filter(|note| !note.is_empty()) {
        Some(note) => note.lines().map(|line| Line::from(line.to_string())).collect(),
        None => vec![Line::from(Span::styled(
            DIRECTOR_PLACEHOLDER,
            fg(enable_colors, Color::Gray),
        ))],
    }
}

fn utterance_line(utterance: &Utterance, enable_colors: bool) -> Line<'static> {
    let text_color = if utterance.stage_warning.is_some() {
        Color::LightRed
    } else {
        Color::Reset
    };

    let mut spans = vec![
        Span::styled(
            utterance.speaker.clone(),
            fg(enable_colors, text_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(": ", fg(enable_colors, text_color)),
        Span::styled(utterance.content.clone(), fg(enable_colors, text_color)),
    ];

    if let Some(warning) = &utterance.stage_warning {
        spans.push(Span::styled(
            format!("  ⚠ {}", warning),
            fg(enable_colors, Color::Yellow),
        ));
    }

    Line::from(spans)
}

/// Rows one utterance takes once wrapped to `width`
fn wrapped_height(utterance: &Utterance, width: usize) -> usize {
    let mut chars = utterance.speaker.chars().count() + 2 + utterance.content.chars().count();
    if let Some(warning) = &utterance.stage_warning {
        chars += 4 + warning.chars().count();
    }
    chars.div_ceil(width.max(1)).max(1)
}

/// Items to draw so the newest visible one sits at the bottom.
///
/// `offset` counts items hidden below the viewport.
fn visible_range(heights: &[usize], offset: usize, viewport: usize) -> Range<usize> {
    let end = heights.len().saturating_sub(offset);
    let mut start = end;
    let mut used = 0;

    while start > 0 {
        let next = heights[start - 1];
        if used + next > viewport && start < end {
            break;
        }
        used += next;
        start -= 1;
    }

    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_range_pins_newest() {
        assert_eq!(visible_range(&[1, 1, 1, 1], 0, 2), 2..4);
        assert_eq!(visible_range(&[1, 1, 1, 1], 1, 2), 1..3);
        assert_eq!(visible_range(&[1, 1], 0, 5), 0..2);
    }

    #[test]
    fn test_visible_range_keeps_one_tall_item() {
        assert_eq!(visible_range(&[1, 10], 0, 3), 1..2);
    }

    #[test]
    fn test_empty_director_note_shows_placeholder() {
        for note in [None, Some("")] {
            let lines = director_lines(note, false);
            assert_eq!(lines.len(), 1);
            assert_eq!(lines[0].spans[0].content, DIRECTOR_PLACEHOLDER);
        }

        let lines = director_lines(Some("Keep it tense.\nNo blood."), false);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_wrapped_height() {
        let short = Utterance::new("A", "hi", None);
        assert_eq!(wrapped_height(&short, 40), 1);

        let long = Utterance::new("A", "x".repeat(37), None);
        assert_eq!(wrapped_height(&long, 20), 2);
    }
}
