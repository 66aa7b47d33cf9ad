//! Shared utility functions for pane rendering
//!
//! - **Value Formatting**: Convert `Value` to styled display spans
//! - **Borders**: Focused / unfocused border styles
//! - **Scrolling**: Clamp offsets and auto-follow growing lists

use crate::memory::value::Value;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    style::{Modifier, Style},
    text::Span,
    widgets::ListItem,
};

/// Format a value with styled spans
pub(crate) fn format_value_styled(value: &Value) -> Vec<Span<'static>> {
    let span = match value {
        Value::Integer(_) | Value::Float(_) => {
            Span::styled(value.to_string(), Style::default().fg(DEFAULT_THEME.number))
        }
        Value::Boolean(_) => Span::styled(
            value.to_string(),
            Style::default().fg(DEFAULT_THEME.opcode),
        ),
        Value::Text(_) => Span::styled(
            value.debug_repr(),
            Style::default().fg(DEFAULT_THEME.text),
        ),
        Value::Pointer(ptr) => Span::styled(
            format!("&{}", ptr),
            Style::default().fg(DEFAULT_THEME.secondary),
        ),
        Value::Uninitialized => Span::styled(
            "[uninit]",
            Style::default()
                .fg(DEFAULT_THEME.error)
                .add_modifier(Modifier::DIM),
        ),
    };
    vec![span]
}

/// Border style for a pane
pub(crate) fn border_style(is_focused: bool) -> Style {
    if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    }
}

/// Width of a span list in characters
pub(crate) fn spans_width(spans: &[Span]) -> usize {
    spans.iter().map(|s| s.content.chars().count()).sum()
}

/// Keep `offset` within `[0, total - visible]`. When `follow_growth` is set
/// and the list grew since the last render, jump to the bottom.
pub(crate) fn clamp_scroll(
    offset: &mut usize,
    prev_item_count: &mut usize,
    total_items: usize,
    visible_height: usize,
    follow_growth: bool,
) {
    let max_scroll = total_items.saturating_sub(visible_height);
    if follow_growth && total_items > *prev_item_count {
        *offset = max_scroll;
    } else {
        *offset = (*offset).min(max_scroll);
    }
    *prev_item_count = total_items;
}

/// Take the rows of `items` that fit after scrolling.
pub(crate) fn visible_slice(items: Vec<ListItem<'_>>, offset: usize, height: usize) -> Vec<ListItem<'_>> {
    items.into_iter().skip(offset).take(height).collect()
}
