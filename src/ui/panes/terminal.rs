//! Console pane rendering (`PRINT` output and log entries)

use super::utils::border_style;
use crate::sink::{EventKind, OutputEvent};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

/// Scroll state for the console pane
pub struct TerminalScrollState {
    pub offset: usize,
}

/// Data needed to render the console pane
pub struct TerminalRenderData<'a> {
    pub events: &'a [OutputEvent],
}

/// Render the console pane
pub fn render_terminal_pane(
    frame: &mut Frame,
    area: Rect,
    data: TerminalRenderData,
    is_focused: bool,
    scroll_state: &mut TerminalScrollState,
) {
    let block = Block::default()
        .title(" Console ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    if data.events.is_empty() {
        let paragraph = Paragraph::new("(no output)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let block = block.padding(Padding::new(1, 0, 0, 0));
    let all_items: Vec<ListItem> = data
        .events
        .iter()
        .map(|event| match event.kind {
            EventKind::Output => ListItem::new(event.text.as_str())
                .style(Style::default().fg(DEFAULT_THEME.fg)),
            EventKind::Log => ListItem::new(Line::from(vec![
                Span::styled(
                    "log ",
                    Style::default()
                        .fg(DEFAULT_THEME.log)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(event.text.as_str(), Style::default().fg(DEFAULT_THEME.comment)),
            ])),
        })
        .collect();

    // Calculate visible range for scrolling
    let total_items = all_items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize; // Account for borders, min 1

    // Clamp scroll offset only if content exceeds visible area
    if total_items > visible_height {
        let max_scroll = total_items - visible_height;
        scroll_state.offset = scroll_state.offset.min(max_scroll);
    } else {
        scroll_state.offset = 0;
    }

    let visible_items: Vec<ListItem> = all_items
        .into_iter()
        .skip(scroll_state.offset)
        .take(visible_height)
        .collect();

    let list = List::new(visible_items).block(block);
    frame.render_widget(list, area);
}
