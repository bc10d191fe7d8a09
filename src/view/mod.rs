//! 表示範囲の計算（描画フレームワークに依存しない）

mod viewport;

pub use viewport::{
    ensure_visible, rows_to_render, scroll_by, total_rows, Row, Rows, ViewportState,
    BYTES_PER_ROW, VISIBLE_ROWS,
};
