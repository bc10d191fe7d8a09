use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

use super::Colors;
use crate::view::{Row, ViewportState};

/// HEX列の開始位置（アドレス8桁 + 空白2）
pub const HEX_COLUMN: u16 = 10;
/// ASCII列の開始位置
pub const ASCII_COLUMN: u16 = HEX_COLUMN + 16 * 3 + 1;

/// HEX/ASCII表示ウィジェット
pub struct HexView<'a> {
    /// 表示するデータ
    data: &'a [u8],
    /// 表示範囲
    viewport: ViewportState,
    /// アクティブアドレス
    active: usize,
    /// 編集中の入力（アドレス, 文字列）
    editing: Option<(usize, &'a str)>,
}

impl<'a> HexView<'a> {
    pub fn new(data: &'a [u8], viewport: ViewportState) -> Self {
        Self {
            data,
            viewport,
            active: 0,
            editing: None,
        }
    }

    pub fn active(mut self, active: usize) -> Self {
        self.active = active;
        self
    }

    pub fn editing(mut self, editing: Option<(usize, &'a str)>) -> Self {
        self.editing = editing;
        self
    }

    /// バイト値に応じた色を取得
    fn byte_color(byte: u8) -> Color {
        match byte {
            0x00 => Colors::HEX_ZERO,
            0xFF => Colors::HEX_HIGH,
            0x20..=0x7E => Colors::HEX_PRINTABLE,
            _ => Colors::HEX_NORMAL,
        }
    }

    /// 1行分のデータを描画
    fn render_row(&self, row: Row<'_>, x: u16, y: u16, buf: &mut Buffer) {
        buf.set_string(x, y, format!("{:08x}", row.start), Style::default().fg(Colors::ADDR));

        let ascii = row.ascii();
        for (i, (slot, ch)) in row.slots().zip(ascii.chars()).enumerate() {
            let address = row.start + i;
            let hex_x = x + HEX_COLUMN + i as u16 * 3;
            let ascii_x = x + ASCII_COLUMN + i as u16;

            // 末尾より後ろは空白のまま
            let Some(byte) = slot else {
                continue;
            };

            let mut hex_style = Style::default().fg(Self::byte_color(byte));
            let mut ascii_style = Style::default().fg(Colors::ASCII_NORMAL);
            let mut hex = format!("{byte:02x}");

            match self.editing {
                Some((target, pending)) if target == address => {
                    hex = format!("{pending:_<2}");
                    hex_style = Style::default()
                        .bg(Colors::EDIT_BG)
                        .fg(Colors::CURSOR)
                        .add_modifier(Modifier::BOLD);
                    ascii_style = ascii_style.bg(Colors::EDIT_BG).fg(Colors::CURSOR);
                }
                _ if address == self.active => {
                    hex_style = hex_style.bg(Colors::CURSOR_BG).fg(Colors::CURSOR);
                    ascii_style = ascii_style.bg(Colors::CURSOR_BG).fg(Colors::CURSOR);
                }
                _ => {}
            }

            buf.set_string(hex_x, y, &hex, hex_style);
            buf.set_string(ascii_x, y, ch.to_string(), ascii_style);
        }
    }
}

impl Widget for HexView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        // ヘッダー行を描画
        let header = format!(
            "{:8}  {}  {}",
            "Address",
            (0..self.viewport.bytes_per_row)
                .map(|i| format!("{i:02X}"))
                .collect::<Vec<_>>()
                .join(" "),
            "ASCII"
        );
        buf.set_string(
            area.x,
            area.y,
            &header,
            Style::default()
                .fg(Colors::HEADER)
                .add_modifier(Modifier::BOLD),
        );

        // データ行を描画
        let max_rows = area.height.saturating_sub(1) as usize;
        for (i, row) in self.viewport.rows(self.data).take(max_rows).enumerate() {
            self.render_row(row, area.x, area.y + 1 + i as u16, buf);
        }
    }
}

/// 画面上の位置からアドレスを求める（クリック用）
pub fn address_at(area: Rect, viewport: &ViewportState, len: usize, x: u16, y: u16) -> Option<usize> {
    if x < area.x || y <= area.y || y >= area.y + area.height {
        return None;
    }
    let row = (y - area.y - 1) as usize;
    let col = x - area.x;
    let bytes_per_row = viewport.bytes_per_row as u16;

    let index = if (HEX_COLUMN..HEX_COLUMN + bytes_per_row * 3).contains(&col) {
        (col - HEX_COLUMN) / 3
    } else if (ASCII_COLUMN..ASCII_COLUMN + bytes_per_row).contains(&col) {
        col - ASCII_COLUMN
    } else {
        return None;
    };

    let address = (viewport.offset_row + row) * viewport.bytes_per_row + index as usize;
    (address < len).then_some(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn renders_single_partial_row() {
        let data = [0x00, 0x1F, 0x41, 0xFF];
        let area = Rect::new(0, 0, 80, 4);
        let mut buf = Buffer::empty(area);

        HexView::new(&data, ViewportState::default()).render(area, &mut buf);

        let row = line(&buf, 1);
        assert!(row.starts_with("00000000  00 1f 41 ff"));
        let ascii = &row[ASCII_COLUMN as usize..ASCII_COLUMN as usize + 16];
        assert_eq!(ascii, "..A.            ");
        assert_eq!(line(&buf, 2).trim(), "");
    }

    #[test]
    fn pending_edit_is_shown_in_place() {
        let data = [0x10, 0x20];
        let area = Rect::new(0, 0, 80, 3);
        let mut buf = Buffer::empty(area);

        HexView::new(&data, ViewportState::default())
            .active(1)
            .editing(Some((1, "7")))
            .render(area, &mut buf);

        assert!(line(&buf, 1).starts_with("00000000  10 7_"));
    }

    #[test]
    fn click_maps_to_address() {
        let area = Rect::new(0, 2, 80, 10);
        let mut vp = ViewportState::default();
        vp.offset_row = 3;

        // 2行目（データ1行目）の hex 列 3 バイト目
        let x = HEX_COLUMN + 2 * 3 + 1;
        assert_eq!(address_at(area, &vp, 1000, x, 3), Some(3 * 16 + 2));
        // ASCII 列
        assert_eq!(address_at(area, &vp, 1000, ASCII_COLUMN + 5, 4), Some(4 * 16 + 5));
        // ヘッダー行とアドレス列は無効
        assert_eq!(address_at(area, &vp, 1000, x, 2), None);
        assert_eq!(address_at(area, &vp, 1000, 3, 3), None);
        // 末尾より後ろ
        assert_eq!(address_at(area, &vp, 50, x, 3), None);
    }
}
