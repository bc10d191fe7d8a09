/// 1行あたりのバイト数
pub const BYTES_PER_ROW: usize = 16;
/// 既定の表示行数
pub const VISIBLE_ROWS: usize = 20;

/// 総行数（端数行を含む）
pub fn total_rows(len: usize, bytes_per_row: usize) -> usize {
    len.div_ceil(bytes_per_row)
}

/// アクティブアドレスの行が表示範囲に入るようにオフセット行を調整
///
/// `active` はバッファ長未満であること（呼び出し側でクランプする）。
pub fn ensure_visible(
    active: usize,
    offset_row: usize,
    bytes_per_row: usize,
    visible_rows: usize,
) -> usize {
    let active_row = active / bytes_per_row;

    if active_row < offset_row {
        active_row
    } else if active_row >= offset_row + visible_rows {
        active_row + 1 - visible_rows
    } else {
        offset_row
    }
}

/// オフセット行を delta だけスクロール
///
/// 結果は `[0, max(0, total_rows - visible_rows + 1)]` に収まる。
pub fn scroll_by(delta: isize, offset_row: usize, total_rows: usize, visible_rows: usize) -> usize {
    let max_offset = (total_rows + 1).saturating_sub(visible_rows);
    offset_row.saturating_add_signed(delta).min(max_offset)
}

/// 表示する行を遅延生成するイテレータを作る
pub fn rows_to_render(
    offset_row: usize,
    visible_rows: usize,
    data: &[u8],
    bytes_per_row: usize,
) -> Rows<'_> {
    Rows {
        data,
        next_row: offset_row,
        end_row: offset_row
            .saturating_add(visible_rows)
            .min(total_rows(data.len(), bytes_per_row)),
        bytes_per_row,
    }
}

/// 表示用の行イテレータ（Clone すれば先頭からやり直せる）
#[derive(Debug, Clone)]
pub struct Rows<'a> {
    data: &'a [u8],
    next_row: usize,
    end_row: usize,
    bytes_per_row: usize,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row >= self.end_row {
            return None;
        }
        let start = self.next_row * self.bytes_per_row;
        let end = (start + self.bytes_per_row).min(self.data.len());
        self.next_row += 1;
        Some(Row {
            start,
            bytes: &self.data[start..end],
            width: self.bytes_per_row,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end_row.saturating_sub(self.next_row);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Rows<'_> {}

/// 表示1行分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row<'a> {
    /// 行頭アドレス
    pub start: usize,
    bytes: &'a [u8],
    width: usize,
}

impl Row<'_> {
    /// 各スロットの値（データ末尾より後ろは None）
    pub fn slots(&self) -> impl Iterator<Item = Option<u8>> + '_ {
        (0..self.width).map(|i| self.bytes.get(i).copied())
    }

    /// ASCII列の文字列（非表示文字は '.', 欠損スロットは空白）
    pub fn ascii(&self) -> String {
        self.slots()
            .map(|slot| match slot {
                Some(byte) => byte_to_char(byte),
                None => ' ',
            })
            .collect()
    }
}

/// 表示可能なASCIIのみそのまま返す
pub(crate) fn byte_to_char(byte: u8) -> char {
    if (0x20..=0x7E).contains(&byte) {
        byte as char
    } else {
        '.'
    }
}

/// セッションが持つ表示状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportState {
    pub offset_row: usize,
    pub bytes_per_row: usize,
    pub visible_rows: usize,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(VISIBLE_ROWS)
    }
}

impl ViewportState {
    pub fn new(visible_rows: usize) -> Self {
        Self {
            offset_row: 0,
            bytes_per_row: BYTES_PER_ROW,
            visible_rows: visible_rows.max(1),
        }
    }

    /// アクティブアドレスに追従（長さ0ならオフセットは0）
    pub fn follow(&mut self, active: usize, len: usize) {
        if len == 0 {
            self.offset_row = 0;
            return;
        }
        let active = active.min(len - 1);
        self.offset_row = ensure_visible(
            active,
            self.offset_row,
            self.bytes_per_row,
            self.visible_rows,
        );
    }

    /// 行単位でスクロール
    pub fn scroll(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.offset_row = 0;
            return;
        }
        self.offset_row = scroll_by(
            delta,
            self.offset_row,
            total_rows(len, self.bytes_per_row),
            self.visible_rows,
        );
    }

    /// 表示行数を変更（端末リサイズ時）
    pub fn set_visible_rows(&mut self, rows: usize) {
        self.visible_rows = rows.max(1);
    }

    /// 表示中の行
    pub fn rows<'a>(&self, data: &'a [u8]) -> Rows<'a> {
        rows_to_render(self.offset_row, self.visible_rows, data, self.bytes_per_row)
    }

    /// 表示中のバイト範囲 (開始, 終了)
    pub fn visible_range(&self, len: usize) -> (usize, usize) {
        let start = (self.offset_row * self.bytes_per_row).min(len);
        let end = ((self.offset_row + self.visible_rows) * self.bytes_per_row).min(len);
        (start, end)
    }

    /// 行が表示範囲内か
    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.offset_row && row < self.offset_row + self.visible_rows
    }
}
