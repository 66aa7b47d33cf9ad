//! Source code pane rendering with syntax highlighting
//!
//! This module renders the source code pane, which displays the 3AC program
//! being executed with basic syntax highlighting and execution indicators.
//!
//! # Features
//!
//! - Highlighting for opcodes, labels, literals, strings and comments
//! - Current line highlighting with arrow indicator
//! - Breakpoint markers and a movable cursor for toggling them
//! - Error line highlighting after a fault
//!
//! # Rendering
//!
//! The pane uses a simple character-by-character tokenizer to apply
//! highlighting styles without going through the loader.

use super::utils::border_style;
use crate::interpreter::constants::RETURN_SLOT;
use crate::parser::instruction::Opcode;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::collections::BTreeSet;

/// Simple syntax highlighting for one line of 3AC
fn highlight_source_code(line: &str) -> Line<'static> {
    let mut spans = Vec::new();
    let mut current_word = String::new();
    let mut seen_opcode = false;

    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        // Comments run to end of line
        if c == '#' {
            flush(&mut current_word, &mut spans, Some(c), &mut seen_opcode);
            let rest: String = chars[i..].iter().collect();
            spans.push(Span::styled(rest, Style::default().fg(DEFAULT_THEME.comment)));
            break;
        }

        if c == '"' {
            flush(&mut current_word, &mut spans, Some(c), &mut seen_opcode);
            let mut end = i + 1;
            while end < chars.len() && chars[end] != '"' {
                end += if chars[end] == '\\' { 2 } else { 1 };
            }
            end = (end + 1).min(chars.len());
            let literal: String = chars[i..end].iter().collect();
            spans.push(Span::styled(literal, Style::default().fg(DEFAULT_THEME.text)));
            i = end;
            continue;
        }

        if !(c.is_alphanumeric() || c == '_' || c == '.' || (c == '-' && current_word.is_empty())) {
            flush(&mut current_word, &mut spans, Some(c), &mut seen_opcode);
            let style = match c {
                '(' | ')' => Style::default().fg(DEFAULT_THEME.primary),
                ':' => Style::default().fg(DEFAULT_THEME.label),
                _ => Style::default().fg(DEFAULT_THEME.fg),
            };
            spans.push(Span::styled(c.to_string(), style));
            i += 1;
            continue;
        }

        current_word.push(c);
        i += 1;
    }
    flush(&mut current_word, &mut spans, None, &mut seen_opcode);

    Line::from(spans)
}

fn flush(word: &mut String, spans: &mut Vec<Span<'static>>, next: Option<char>, seen_opcode: &mut bool) {
    if word.is_empty() {
        return;
    }
    let style = word_style(word, next, *seen_opcode);
    // Label names come before ':' or '('; the first other word is the opcode
    if !*seen_opcode && next != Some(':') && next != Some('(') {
        *seen_opcode = true;
    }
    spans.push(Span::styled(std::mem::take(word), style));
}

fn word_style(word: &str, next: Option<char>, seen_opcode: bool) -> Style {
    if !seen_opcode && matches!(next, Some(':') | Some('(')) {
        return Style::default()
            .fg(DEFAULT_THEME.label)
            .add_modifier(Modifier::BOLD);
    }
    if !seen_opcode && Opcode::from_name(word).is_some() {
        return Style::default()
            .fg(DEFAULT_THEME.opcode)
            .add_modifier(Modifier::BOLD);
    }
    if word == RETURN_SLOT {
        return Style::default().fg(DEFAULT_THEME.retval);
    }
    if word.eq_ignore_ascii_case("true") || word.eq_ignore_ascii_case("false") {
        return Style::default().fg(DEFAULT_THEME.number);
    }
    if word.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        return Style::default().fg(DEFAULT_THEME.number);
    }
    Style::default().fg(DEFAULT_THEME.fg)
}

/// Scroll state for the source pane
pub struct SourceScrollState {
    pub offset: usize,
    /// 1-based line the breakpoint cursor sits on
    pub cursor: usize,
}

/// Data needed to render the source pane
pub struct SourceRenderData<'a> {
    pub source_code: &'a str,
    /// 1-based line of the next instruction (0 when past the end)
    pub current_line: usize,
    /// Line of the instruction that faulted, if any
    pub error_line: Option<usize>,
    pub breakpoints: &'a BTreeSet<usize>,
}

/// Render the source code pane
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    data: SourceRenderData,
    is_focused: bool,
    scroll_state: &mut SourceScrollState,
) {
    let block = Block::default()
        .title(" Source Code ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let lines: Vec<&str> = data.source_code.lines().collect();
    let total_lines = lines.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize; // Account for borders (2), min 1

    scroll_state.cursor = scroll_state.cursor.clamp(1, total_lines.max(1));

    // Keep the cursor line on screen
    let cursor_idx = scroll_state.cursor - 1;
    if cursor_idx < scroll_state.offset {
        scroll_state.offset = cursor_idx;
    } else if cursor_idx >= scroll_state.offset + visible_height {
        scroll_state.offset = cursor_idx + 1 - visible_height;
    }
    scroll_state.offset = scroll_state
        .offset
        .min(total_lines.saturating_sub(visible_height));

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let is_current = line_num == data.current_line;
            let is_error = data.error_line == Some(line_num);
            let has_breakpoint = data.breakpoints.contains(&line_num);

            let marker = if has_breakpoint {
                Span::styled("●", Style::default().fg(DEFAULT_THEME.breakpoint))
            } else {
                Span::raw(" ")
            };
            let arrow = if is_current || is_error { "▶" } else { " " };
            let cursor = if is_focused && line_num == scroll_state.cursor {
                "›"
            } else {
                " "
            };

            let (num_style, content_base_style) = if is_error {
                // ERROR LINE: Red background with bold line number
                (
                    Style::default()
                        .fg(DEFAULT_THEME.error)
                        .add_modifier(Modifier::BOLD),
                    Style::default()
                        .bg(DEFAULT_THEME.error)
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )
            } else if is_current {
                (
                    Style::default()
                        .fg(DEFAULT_THEME.secondary)
                        .add_modifier(Modifier::BOLD),
                    Style::default().bg(DEFAULT_THEME.current_line_bg),
                )
            } else {
                (Style::default().fg(DEFAULT_THEME.comment), Style::default())
            };

            let mut content_line = highlight_source_code(line);
            if is_error {
                for span in &mut content_line.spans {
                    span.style = content_base_style;
                }
            } else if is_current {
                for span in &mut content_line.spans {
                    span.style = span.style.patch(content_base_style);
                }
            }

            let mut final_spans = vec![
                marker,
                Span::styled(format!("{}{:4} {}", cursor, line_num, arrow), num_style),
                Span::raw(" "),
            ];
            final_spans.extend(content_line.spans);
            Line::from(final_spans)
        })
        .collect();

    let paragraph = Paragraph::new(visible_lines).block(block);
    frame.render_widget(paragraph, area);
}
