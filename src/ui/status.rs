use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    widgets::{Paragraph, Widget},
};

use super::Colors;

/// バイト数を人間向けに整形（"0 Bytes", "1.5 KB" など）
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let number = format!("{value:.2}");
    let number = number.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", number, UNITS[unit])
}

/// 最下行のステータスバー
pub struct StatusLine<'a> {
    left: &'a str,
    right: &'a str,
}

impl<'a> StatusLine<'a> {
    pub fn new(left: &'a str, right: &'a str) -> Self {
        Self { left, right }
    }
}

impl Widget for StatusLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().bg(Colors::STATUS_BG).fg(Colors::STATUS_FG);
        Paragraph::new(format!(" {}", self.left))
            .style(style)
            .render(area, buf);

        let width = self.right.chars().count() as u16 + 1;
        if width < area.width {
            buf.set_string(area.x + area.width - width, area.y, self.right, style);
        }
    }
}
