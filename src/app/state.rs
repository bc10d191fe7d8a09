use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::Paragraph,
    Frame,
};

use super::{Action, Command, CommandLine, EditOutcome, EditSession, KeyMod, PromptMode};
use crate::buffer::ByteBuffer;
use crate::store::{ChunkedStore, FileRecord, KvStore, DEFAULT_MIME_TYPE};
use crate::ui::{address_at, format_bytes, Colors, HexView, StatusLine};
use crate::view::{ViewportState, VISIBLE_ROWS};

const HELP_TEXT: &str =
    "Commands: load <name>, save, edit <address>, open <path>, list, delete <name>, exit, help, ?";
const READY_TEXT: &str = "hexvault ready. Type 'help' for commands.";
/// コマンド欄の下に表示する履歴の件数
const RECENT_COMMANDS: usize = 5;

/// アプリケーション状態
pub struct App<S> {
    /// 編集中のバッファ
    buffer: ByteBuffer,
    /// 現在のファイル情報（未読み込みなら None）
    record: Option<FileRecord>,
    /// アクティブアドレス
    active: usize,
    /// 表示範囲
    viewport: ViewportState,
    /// 表示行数の上限（設定値、端末が狭ければそちらに合わせる）
    max_visible_rows: usize,
    /// 1バイト編集
    edit: EditSession,
    /// 保存先
    store: ChunkedStore<S>,
    /// 保存時に記録するMIMEタイプ
    mime_type: String,
    /// プロンプト入力モード
    prompt_mode: PromptMode,
    /// コマンド入力欄
    command_line: CommandLine,
    /// HEXビューの描画領域（クリック判定用）
    hex_area: Rect,
    /// 終了フラグ
    should_quit: bool,
    /// ステータスメッセージ
    status_message: Option<String>,
}

impl<S: KvStore> App<S> {
    /// 新しいアプリケーションを作成
    pub fn new(store: ChunkedStore<S>) -> Self {
        Self {
            buffer: ByteBuffer::new(),
            record: None,
            active: 0,
            viewport: ViewportState::default(),
            max_visible_rows: VISIBLE_ROWS,
            edit: EditSession::Idle,
            store,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            prompt_mode: PromptMode::Off,
            command_line: CommandLine::new(),
            hex_area: Rect::default(),
            should_quit: false,
            status_message: Some(READY_TEXT.to_string()),
        }
    }

    pub fn with_visible_rows(mut self, rows: usize) -> Self {
        self.max_visible_rows = rows.max(1);
        self.viewport.set_visible_rows(self.max_visible_rows);
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// 終了すべきかどうか
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// ファイル名を取得
    pub fn filename(&self) -> Option<&str> {
        self.record.as_ref().map(|r| r.name.as_str())
    }

    /// 変更されているかどうか
    pub fn is_modified(&self) -> bool {
        self.buffer.is_modified()
    }

    pub fn buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    pub fn record(&self) -> Option<&FileRecord> {
        self.record.as_ref()
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn edit_session(&self) -> &EditSession {
        &self.edit
    }

    pub fn store(&self) -> &ChunkedStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ChunkedStore<S> {
        &mut self.store
    }

    pub fn prompt_mode(&self) -> PromptMode {
        self.prompt_mode
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.command_line
    }

    pub fn status(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
    }

    /// バイト列を読み込む（アップロード相当）
    pub fn load_bytes(&mut self, record: FileRecord, data: Vec<u8>) {
        let status = format!("{} ({} bytes)", record.name, data.len());
        tracing::info!(name = %record.name, size = data.len(), "buffer loaded");

        self.buffer = ByteBuffer::from_bytes(data);
        self.record = Some(record);
        self.active = 0;
        self.edit = EditSession::Idle;
        self.viewport.offset_row = 0;
        self.set_status(status);
    }

    /// ディスク上のファイルを開く
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let buffer = ByteBuffer::open(path)?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();

        let mut record = FileRecord::new(name, buffer.len(), self.mime_type.clone());
        if let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) {
            record.last_modified = DateTime::<Utc>::from(modified).timestamp_millis();
        }
        self.load_bytes(record, buffer.into_bytes());
        Ok(())
    }

    fn open_file(&mut self, path: &str) {
        let expanded = crate::config::expand_tilde(Path::new(path));
        if let Err(e) = self.open(&expanded) {
            self.set_status(format!("Failed to open: {e}"));
        }
    }

    /// ストアに保存
    pub fn save(&mut self) {
        let Some(name) = self.record.as_ref().map(|r| r.name.clone()) else {
            self.set_status("No file loaded");
            return;
        };
        match self.store.save(&name, self.buffer.data(), &self.mime_type) {
            Ok(record) => {
                self.record = Some(record);
                self.buffer.mark_saved();
                self.set_status(format!("File saved: {name}"));
            }
            Err(e) => {
                tracing::error!(name = %name, error = %e, "save failed");
                self.set_status(format!("Save failed: {e}"));
            }
        }
    }

    /// ストアから読み込む
    pub fn load_saved(&mut self, name: &str) {
        match self.store.load(name) {
            Ok(loaded) => {
                let record = match loaded.record {
                    Some(record) => record,
                    None => FileRecord::new(name, loaded.data.len(), self.mime_type.clone()),
                };
                self.load_bytes(record, loaded.data);
            }
            Err(e) => {
                tracing::warn!(name, error = %e, "load failed");
                self.set_status(e.to_string());
            }
        }
    }

    /// ストアから削除
    pub fn delete_saved(&mut self, name: &str) {
        match self.store.delete(name) {
            Ok(()) => self.set_status(format!("File deleted: {name}")),
            Err(e) => self.set_status(format!("Delete failed: {e}")),
        }
    }

    /// 保存済みファイルの一覧
    pub fn list_saved(&mut self) {
        match self.store.list() {
            Ok(records) if records.is_empty() => self.set_status("No saved files"),
            Ok(records) => {
                let names = records
                    .iter()
                    .map(|r| format!("{} ({})", r.name, format_bytes(r.size)))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.set_status(format!("Saved files: {names}"));
            }
            Err(e) => self.set_status(format!("Error listing saved files: {e}")),
        }
    }

    /// アクティブアドレスを変更（編集中なら暗黙にキャンセル）
    pub fn set_active_address(&mut self, address: usize) {
        if self.buffer.is_empty() {
            return;
        }
        let address = address.min(self.buffer.len() - 1);
        if self.edit.target().is_some_and(|target| target != address) {
            self.edit.cancel();
        }
        self.active = address;
        self.viewport.follow(self.active, self.buffer.len());
    }

    /// 表示範囲をスクロール
    pub fn scroll(&mut self, delta: isize) {
        self.viewport.scroll(delta, self.buffer.len());
    }

    /// 指定アドレスで編集開始
    pub fn enter_edit_mode(&mut self, address: usize) {
        if self.buffer.is_empty() {
            self.set_status("No file loaded");
            return;
        }
        if address >= self.buffer.len() {
            self.set_status(format!(
                "Address 0x{:08x} is out of range (size {} bytes)",
                address,
                self.buffer.len()
            ));
            return;
        }
        self.set_active_address(address);
        let outcome = self.edit.begin(address, &self.buffer);
        self.report(outcome);
    }

    /// 編集中の値にHEX文字を追加
    pub fn append_hex_digit(&mut self, ch: char) {
        // HEX以外の入力は黙って捨てる
        let _ = self.edit.append_hex_digit(ch);
    }

    /// 編集中の値を1文字削除
    pub fn backspace(&mut self) {
        let _ = self.edit.pop_digit();
    }

    /// 編集を確定
    pub fn commit(&mut self) {
        let outcome = self.edit.commit(&mut self.buffer);
        if let EditOutcome::Committed { next, .. } = outcome {
            self.set_active_address(next);
        }
        self.report(outcome);
    }

    /// 編集をキャンセル
    pub fn cancel(&mut self) {
        let outcome = self.edit.cancel();
        self.report(outcome);
    }

    fn report(&mut self, outcome: EditOutcome) {
        match outcome {
            EditOutcome::Accepted => {
                if let Some(target) = self.edit.target() {
                    self.set_status(format!("Editing at address: 0x{target:08x}"));
                }
            }
            EditOutcome::Committed { address, value, .. } => {
                tracing::debug!(address, value, "byte written");
                self.set_status(format!("Wrote 0x{value:02x} at 0x{address:08x}"));
            }
            EditOutcome::Cancelled => self.set_status("Edit cancelled"),
            EditOutcome::Rejected(reason) => self.set_status(reason.to_string()),
        }
    }

    /// コマンドを実行
    pub fn execute_command(&mut self, input: &str) {
        let Some(cmd) = Command::parse(input) else {
            return;
        };
        tracing::debug!(?cmd, "command");

        match cmd {
            Command::Help => self.set_status(HELP_TEXT),
            Command::Check => {
                let name = self.filename().unwrap_or("None").to_string();
                let mode = if self.edit.is_editing() { "Edit" } else { "View" };
                self.set_status(format!(
                    "Current file: {} | Size: {} bytes | Editor mode: {}",
                    name,
                    self.buffer.len(),
                    mode
                ));
            }
            Command::Quit => {
                self.set_status("Thank you for using hexvault.");
                self.should_quit = true;
            }
            Command::Load(name) => self.load_saved(&name),
            Command::Save => self.save(),
            Command::Edit(Ok(address)) => self.enter_edit_mode(address),
            Command::Edit(Err(_)) => {
                self.set_status("Invalid address format. Use hexadecimal (e.g., 0x100 or 100)");
            }
            Command::Open(path) => self.open_file(&path),
            Command::List => self.list_saved(),
            Command::Delete(name) => self.delete_saved(&name),
            Command::Unknown(raw) => self.set_status(format!(
                "Unknown command: {raw}. Type 'help' for available commands."
            )),
        }
    }

    /// アクションを実行
    pub fn execute(&mut self, action: Action) {
        let len = self.buffer.len();
        let bytes_per_row = self.viewport.bytes_per_row;

        match action {
            Action::Quit => self.should_quit = true,
            Action::Save => self.save(),
            Action::CursorUp => {
                if self.active >= bytes_per_row {
                    self.set_active_address(self.active - bytes_per_row);
                }
            }
            Action::CursorDown => {
                if self.active + bytes_per_row < len {
                    self.set_active_address(self.active + bytes_per_row);
                }
            }
            Action::CursorLeft => self.set_active_address(self.active.saturating_sub(1)),
            Action::CursorRight => self.set_active_address(self.active + 1),
            Action::GotoBeginning => self.set_active_address(0),
            Action::GotoEnd => self.set_active_address(len.saturating_sub(1)),
            Action::Scroll(delta) => self.scroll(delta),
            Action::StartEdit => self.enter_edit_mode(self.active),
            Action::InputHex(ch) => self.append_hex_digit(ch),
            Action::Backspace => self.backspace(),
            Action::Commit => self.commit(),
            Action::Cancel => {
                if self.edit.is_editing() {
                    self.cancel();
                }
            }
            Action::StartCommand => {
                self.prompt_mode = PromptMode::Command;
                self.command_line.clear();
            }
            Action::None => {}
        }
    }

    /// キー入力を処理
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        // プロンプトモード中は特別な処理
        if self.prompt_mode != PromptMode::Off {
            self.handle_prompt_key(key);
            return;
        }

        let mods = KeyMod {
            ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
            alt: key.modifiers.contains(KeyModifiers::ALT),
        };
        let action = if self.edit.is_editing() {
            Action::from_key_while_editing(key.code, mods)
        } else {
            Action::from_key(key.code, mods)
        };
        self.execute(action);
    }

    /// プロンプトモード中のキー処理
    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            // Escape / C-g: キャンセル
            KeyCode::Esc => self.close_prompt(),
            KeyCode::Char('g') if ctrl => self.close_prompt(),
            // Enter: 確定
            KeyCode::Enter => {
                self.prompt_mode = PromptMode::Off;
                if let Some(cmd) = self.command_line.submit() {
                    self.execute_command(&cmd);
                }
            }
            KeyCode::Backspace => self.command_line.backspace(),
            KeyCode::Up => self.command_line.history_up(),
            KeyCode::Down => self.command_line.history_down(),
            KeyCode::Char(ch) if !ctrl => self.command_line.push_char(ch),
            _ => {}
        }
    }

    fn close_prompt(&mut self) {
        self.prompt_mode = PromptMode::Off;
        self.command_line.clear();
    }

    /// マウス入力を処理（左クリックでアドレス選択）
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(address) = address_at(
                    self.hex_area,
                    &self.viewport,
                    self.buffer.len(),
                    mouse.column,
                    mouse.row,
                ) {
                    self.set_active_address(address);
                }
            }
            MouseEventKind::ScrollUp => self.scroll(-1),
            MouseEventKind::ScrollDown => self.scroll(1),
            _ => {}
        }
    }

    /// イベントを処理
    pub fn handle_event(&mut self) -> Result<()> {
        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) => self.handle_key(key),
                Event::Mouse(mouse) => self.handle_mouse(mouse),
                // その他のイベントは無視
                _ => {}
            }
        }
        Ok(())
    }

    /// ステータスバー左側の文字列
    fn status_left(&self) -> String {
        match (&self.status_message, &self.record) {
            (Some(msg), _) => msg.clone(),
            (None, Some(record)) => format!("{} | {}", record.name, format_bytes(record.size)),
            (None, None) => "Ready".to_string(),
        }
    }

    /// ステータスバー右側の文字列
    fn status_right(&self) -> String {
        let (start, end) = self.viewport.visible_range(self.buffer.len());
        let mode = if self.edit.is_editing() { "EDIT" } else { "VIEW" };
        let modified = if self.buffer.is_modified() { "[+] " } else { "" };
        format!(
            "{}0x{:08x} | {} | Showing bytes {} to {} of {}",
            modified,
            self.active,
            mode,
            start,
            end,
            self.buffer.len()
        )
    }

    /// UIを描画
    pub fn draw(&mut self, frame: &mut Frame) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(2),    // メイン
                Constraint::Length(1), // コマンドライン
                Constraint::Length(1), // 最近のコマンド
                Constraint::Length(1), // ステータス
            ])
            .split(frame.area());

        self.hex_area = layout[0];
        // ヘッダー行を除いた高さと設定値の小さい方
        let rows = (layout[0].height as usize)
            .saturating_sub(1)
            .min(self.max_visible_rows);
        if rows.max(1) != self.viewport.visible_rows {
            self.viewport.set_visible_rows(rows);
            self.viewport.follow(self.active, self.buffer.len());
        }

        if self.record.is_some() {
            let hex_view = HexView::new(self.buffer.data(), self.viewport)
                .active(self.active)
                .editing(self.edit.target().zip(self.edit.pending()));
            frame.render_widget(hex_view, layout[0]);
        } else {
            let welcome = Paragraph::new("Open a file with ':open <path>' or ':load <name>'")
                .style(Style::default().fg(Colors::HEADER));
            frame.render_widget(welcome, layout[0]);
        }

        let prompt = if self.prompt_mode == PromptMode::Command {
            format!("> {}_", self.command_line.input())
        } else {
            "> (press : for commands)".to_string()
        };
        frame.render_widget(
            Paragraph::new(prompt).style(Style::default().fg(Colors::PROMPT)),
            layout[1],
        );

        let recent = self.command_line.recent(RECENT_COMMANDS).collect::<Vec<_>>();
        if !recent.is_empty() {
            frame.render_widget(
                Paragraph::new(format!("Recent: {}", recent.join(" | ")))
                    .style(Style::default().fg(Colors::HEADER)),
                layout[2],
            );
        }

        let left = self.status_left();
        let right = self.status_right();
        frame.render_widget(StatusLine::new(&left, &right), layout[3]);
    }
}
