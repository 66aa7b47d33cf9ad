//! Heap pane rendering
//!
//! Shows every block ever allocated, in address order. Live blocks list
//! their cells; freed blocks stay visible as tombstones with their bumped
//! generation, so a later use-after-free can be matched to the block it hit.

use super::utils::{border_style, clamp_scroll, format_value_styled, spans_width, visible_slice};
use crate::memory::heap::Heap;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Scroll state for the heap pane
pub struct HeapScrollState {
    pub offset: usize,
    pub prev_item_count: usize,
}

/// Data needed to render the heap pane
pub struct HeapRenderData<'a> {
    pub heap: &'a Heap,
}

/// Render the heap pane
pub fn render_heap_pane(
    frame: &mut Frame,
    area: Rect,
    data: HeapRenderData,
    is_focused: bool,
    scroll_state: &mut HeapScrollState,
) {
    let title = format!(
        " Heap Memory ({}/{} cells) ",
        data.heap.live_cells(),
        data.heap.max_cells()
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let content_width = area.width.saturating_sub(2) as usize; // borders
    let blocks = data.heap.blocks();
    let mut all_items = Vec::new();

    if blocks.is_empty() {
        all_items.push(
            ListItem::new("(no allocations)").style(Style::default().fg(DEFAULT_THEME.comment)),
        );
    }

    for heap_block in blocks {
        if heap_block.is_freed() {
            all_items.push(ListItem::new(Line::from(vec![
                Span::styled(
                    format!("0x{:04x} ", heap_block.address),
                    Style::default()
                        .fg(DEFAULT_THEME.tombstone)
                        .add_modifier(Modifier::CROSSED_OUT),
                ),
                Span::styled(
                    format!("[freed] {} cell(s), gen {}", heap_block.size(), heap_block.generation),
                    Style::default().fg(DEFAULT_THEME.tombstone),
                ),
            ])));
            continue;
        }

        all_items.push(ListItem::new(Line::from(vec![
            Span::styled(
                format!("0x{:04x} ", heap_block.address),
                Style::default()
                    .fg(DEFAULT_THEME.secondary)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} cell(s), gen {}", heap_block.size(), heap_block.generation),
                Style::default().fg(DEFAULT_THEME.success),
            ),
        ])));

        for (index, cell) in heap_block.cells.iter().enumerate() {
            let val_spans = format_value_styled(cell);
            let index_str = format!("  [{}] ", index);
            let type_str = cell.type_name();
            let left_width = index_str.len() + spans_width(&val_spans);
            let padding = content_width.saturating_sub(left_width + type_str.len());

            let mut spans = vec![Span::styled(index_str, Style::default().fg(DEFAULT_THEME.comment))];
            spans.extend(val_spans);
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::styled(type_str, Style::default().fg(DEFAULT_THEME.value_tag)));
            all_items.push(ListItem::new(Line::from(spans)));
        }
    }

    let total_items = all_items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize; // Account for borders, min 1
    clamp_scroll(
        &mut scroll_state.offset,
        &mut scroll_state.prev_item_count,
        total_items,
        visible_height,
        true,
    );

    let list = List::new(visible_slice(all_items, scroll_state.offset, visible_height)).block(block);
    frame.render_widget(list, area);
}
