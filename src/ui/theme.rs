//! Colour palette shared by every pane (Catppuccin Mocha tones)

use ratatui::style::Color;

/// Colour roles used by the debugger panes
pub struct Theme {
    pub fg: Color,
    pub primary: Color,
    pub secondary: Color,
    pub comment: Color,
    pub success: Color,
    pub error: Color,
    pub border_focused: Color,
    pub border_normal: Color,
    pub current_line_bg: Color,

    // Source listing
    pub opcode: Color,
    pub label: Color,
    pub text: Color,
    pub number: Color,
    pub breakpoint: Color,

    // Memory panes
    pub caller: Color,    // call chain under each frame header
    pub value_tag: Color, // right-aligned Integer/Text/... column
    pub retval: Color,
    pub tombstone: Color, // freed heap blocks

    // Console
    pub log: Color,
}

pub const DEFAULT_THEME: Theme = Theme {
    fg: Color::Rgb(205, 214, 244),
    primary: Color::Rgb(137, 180, 250),
    secondary: Color::Rgb(250, 179, 135),
    comment: Color::Rgb(108, 112, 134),
    success: Color::Rgb(166, 227, 161),
    error: Color::Rgb(243, 139, 168),
    border_focused: Color::Rgb(137, 180, 250),
    border_normal: Color::Rgb(88, 91, 112),
    current_line_bg: Color::Rgb(49, 50, 68),

    opcode: Color::Rgb(203, 166, 247),
    label: Color::Rgb(249, 226, 175),
    text: Color::Rgb(166, 227, 161),
    number: Color::Rgb(250, 179, 135),
    breakpoint: Color::Rgb(243, 139, 168),

    caller: Color::Rgb(180, 165, 130),
    value_tag: Color::Rgb(148, 226, 213),
    retval: Color::Rgb(245, 194, 231),
    tombstone: Color::Rgb(88, 91, 112),

    log: Color::Rgb(116, 199, 236),
};
