mod hex_view;
mod status;

pub use hex_view::{address_at, HexView, ASCII_COLUMN, HEX_COLUMN};
pub use status::{format_bytes, StatusLine};

use ratatui::style::Color;

/// 配色
pub struct Colors;

impl Colors {
    pub const HEADER: Color = Color::Gray;
    pub const ADDR: Color = Color::Cyan;
    pub const HEX_ZERO: Color = Color::DarkGray;
    pub const HEX_HIGH: Color = Color::LightRed;
    pub const HEX_PRINTABLE: Color = Color::White;
    pub const HEX_NORMAL: Color = Color::LightBlue;
    pub const ASCII_NORMAL: Color = Color::Gray;
    pub const CURSOR: Color = Color::Black;
    pub const CURSOR_BG: Color = Color::LightBlue;
    pub const EDIT_BG: Color = Color::Cyan;
    pub const STATUS_FG: Color = Color::White;
    pub const STATUS_BG: Color = Color::DarkGray;
    pub const PROMPT: Color = Color::Cyan;
}
