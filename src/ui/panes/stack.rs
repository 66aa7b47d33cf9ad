//! Stack pane rendering with globals, watches and call frames
//!
//! # Layout
//!
//! - `RETVAL` and any arguments queued for the next `CALL`
//! - Watched names evaluated in the current scope
//! - Global variables in first-assignment order
//! - One block per frame, outermost first: header with slot, generation
//!   and label, the call chain back to the caller, then locals and
//!   reference bindings

use super::utils::{clamp_scroll, format_value_styled, spans_width, visible_slice};
use crate::interpreter::constants::RETURN_SLOT;
use crate::interpreter::engine::PendingArg;
use crate::interpreter::errors::AddressError;
use crate::memory::value::Value;
use crate::memory::Memory;
use crate::parser::instruction::Program;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Scroll state for the stack pane
pub struct StackScrollState {
    pub offset: usize,
    pub prev_item_count: usize,
}

/// Data needed to render the stack pane
pub struct StackRenderData<'a> {
    pub memory: &'a Memory,
    pub program: &'a Program,
    pub return_value: &'a Value,
    pub pending_args: &'a [PendingArg],
    pub watches: Vec<(&'a str, Result<Value, AddressError>)>,
}

fn section_header(title: &str) -> ListItem<'static> {
    ListItem::new(Line::from(Span::styled(
        title.to_string(),
        Style::default()
            .fg(DEFAULT_THEME.comment)
            .add_modifier(Modifier::BOLD),
    )))
}

/// `name : value` with the value tag right-aligned.
fn variable_row(name: &str, value: &Value, name_style: Style, content_width: usize) -> ListItem<'static> {
    let val_spans = format_value_styled(value);
    let type_str = value.type_name();
    // "  " + name + " : " + value
    let left_width = 5 + name.chars().count() + spans_width(&val_spans);
    let padding = content_width.saturating_sub(left_width + type_str.len());

    let mut spans = vec![
        Span::raw("  "),
        Span::styled(name.to_string(), name_style),
        Span::styled(" : ", Style::default().fg(DEFAULT_THEME.fg)),
    ];
    spans.extend(val_spans);
    spans.push(Span::raw(" ".repeat(padding)));
    spans.push(Span::styled(
        type_str,
        Style::default().fg(DEFAULT_THEME.value_tag),
    ));
    ListItem::new(Line::from(spans))
}

fn error_row(name: &str, error: &AddressError) -> ListItem<'static> {
    ListItem::new(Line::from(vec![
        Span::raw("  "),
        Span::styled(name.to_string(), Style::default().fg(DEFAULT_THEME.fg)),
        Span::styled(" : ", Style::default().fg(DEFAULT_THEME.fg)),
        Span::styled(
            format!("<{}>", error.kind()),
            Style::default().fg(DEFAULT_THEME.error),
        ),
    ]))
}

/// Render the stack pane
pub fn render_stack_pane(
    frame: &mut Frame,
    area: Rect,
    data: StackRenderData,
    is_focused: bool,
    scroll_state: &mut StackScrollState,
) {
    let block = Block::default()
        .title(" Call Stack ")
        .borders(Borders::ALL)
        .border_style(super::utils::border_style(is_focused));

    let content_width = area.width.saturating_sub(2) as usize; // borders only
    let mut all_items = Vec::new();

    if data.return_value.is_initialized() {
        all_items.push(variable_row(
            RETURN_SLOT,
            data.return_value,
            Style::default()
                .fg(DEFAULT_THEME.retval)
                .add_modifier(Modifier::BOLD),
            content_width,
        ));
    }
    if !data.pending_args.is_empty() {
        let queued: Vec<String> = data
            .pending_args
            .iter()
            .map(|arg| match arg {
                PendingArg::Value(v) => v.debug_repr(),
                PendingArg::Reference(ptr) => format!("ref {}", ptr),
            })
            .collect();
        all_items.push(ListItem::new(Line::from(vec![
            Span::styled("  args ⟵ ", Style::default().fg(DEFAULT_THEME.secondary)),
            Span::styled(queued.join(", "), Style::default().fg(DEFAULT_THEME.fg)),
        ])));
    }

    if !data.watches.is_empty() {
        all_items.push(section_header("Watches"));
        for (name, result) in &data.watches {
            all_items.push(match result {
                Ok(value) => variable_row(name, value, Style::default().fg(DEFAULT_THEME.primary), content_width),
                Err(err) => error_row(name, err),
            });
        }
    }

    all_items.push(section_header("Globals"));
    if data.memory.globals.is_empty() {
        all_items.push(ListItem::new("  (none)").style(Style::default().fg(DEFAULT_THEME.comment)));
    }
    for (name, value) in data.memory.globals.iter() {
        all_items.push(variable_row(name, value, Style::default().fg(DEFAULT_THEME.fg), content_width));
    }

    let frames = data.memory.stack.frames();
    if frames.is_empty() {
        all_items.push(section_header("Frames"));
        all_items.push(ListItem::new("  (empty)").style(Style::default().fg(DEFAULT_THEME.comment)));
    }

    for (depth, stack_frame) in frames.iter().enumerate() {
        let params = data
            .program
            .labels()
            .resolve(&stack_frame.function)
            .and_then(|def| def.params.as_ref())
            .map(|p| p.join(", "))
            .unwrap_or_default();

        all_items.push(ListItem::new(""));
        all_items.push(ListItem::new(Line::from(vec![
            Span::styled("▸ ", Style::default().fg(DEFAULT_THEME.secondary)),
            Span::styled(
                format!("Frame {} #{}g{} ", depth, stack_frame.id.index, stack_frame.id.generation),
                Style::default().fg(DEFAULT_THEME.comment),
            ),
            Span::styled("│ ", Style::default().fg(DEFAULT_THEME.comment)),
            Span::styled(
                format!("{}({})", stack_frame.function, params),
                Style::default()
                    .fg(DEFAULT_THEME.label)
                    .add_modifier(Modifier::BOLD),
            ),
        ])));

        // Call chain back to the caller
        let call_pc = stack_frame.return_address.saturating_sub(1);
        let caller = if depth == 0 {
            "top level".to_string()
        } else {
            format!("{}()", frames[depth - 1].function)
        };
        let call_site = data
            .program
            .instruction(call_pc)
            .map(|instr| format!("line {}: {}", instr.line, instr))
            .unwrap_or_default();
        all_items.push(ListItem::new(Line::from(vec![
            Span::styled("  ↪ ", Style::default().fg(DEFAULT_THEME.comment)),
            Span::styled(caller, Style::default().fg(DEFAULT_THEME.caller)),
            Span::styled(" → ", Style::default().fg(DEFAULT_THEME.comment)),
            Span::styled(call_site, Style::default().fg(DEFAULT_THEME.comment)),
        ])));

        for name in &stack_frame.insertion_order {
            if let Some(target) = stack_frame.reference(name) {
                let label = format!("&{}", name);
                match data.memory.read(target) {
                    Ok(value) => all_items.push(variable_row(
                        &label,
                        &value,
                        Style::default().fg(DEFAULT_THEME.secondary),
                        content_width,
                    )),
                    Err(err) => all_items.push(error_row(&label, &err)),
                }
                all_items.push(ListItem::new(Line::from(Span::styled(
                    format!("      → {}", target),
                    Style::default().fg(DEFAULT_THEME.comment),
                ))));
            } else if let Some(value) = stack_frame.local(name) {
                all_items.push(variable_row(name, value, Style::default().fg(DEFAULT_THEME.fg), content_width));
            }
        }
    }

    let total_items = all_items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize; // Account for borders, min 1

    // Smart auto-scroll: scroll to bottom only when content grows
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
