mod command;
mod edit;
mod state;

pub use command::{parse_hex_address, Command, CommandLine};
pub use edit::{EditOutcome, EditSession, Rejection};
pub use state::App;

use crossterm::event::KeyCode;

/// プロンプト入力モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    #[default]
    Off,
    /// コマンド入力中 (:)
    Command,
}

/// アプリケーションアクション
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Save,

    // カーソル移動
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    GotoBeginning,
    GotoEnd,

    // 表示範囲だけを動かす（アクティブアドレスは動かさない）
    Scroll(isize),

    // 編集
    StartEdit,
    InputHex(char),
    Backspace,
    Commit,
    Cancel,

    // コマンドライン
    StartCommand,

    None,
}

/// キー修飾子
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyMod {
    pub ctrl: bool,
    pub alt: bool,
}

impl Action {
    /// 通常モードのキーをアクションに変換
    pub fn from_key(key: KeyCode, mods: KeyMod) -> Self {
        let KeyMod { ctrl, alt, .. } = mods;

        match (key, ctrl, alt) {
            // 終了・保存
            (KeyCode::Char('q'), true, false) => Action::Quit,
            (KeyCode::Char('c'), true, false) => Action::Quit,
            (KeyCode::Char('s'), true, false) => Action::Save,

            // Ctrl+矢印: 1行スクロール
            (KeyCode::Up, true, false) => Action::Scroll(-1),
            (KeyCode::Down, true, false) => Action::Scroll(1),

            // 矢印キー
            (KeyCode::Up, false, false) => Action::CursorUp,
            (KeyCode::Down, false, false) => Action::CursorDown,
            (KeyCode::Left, false, false) => Action::CursorLeft,
            (KeyCode::Right, false, false) => Action::CursorRight,
            (KeyCode::Home, _, _) => Action::GotoBeginning,
            (KeyCode::End, _, _) => Action::GotoEnd,

            // ページ単位（10行）のスクロール
            (KeyCode::PageUp, _, _) => Action::Scroll(-10),
            (KeyCode::PageDown, _, _) => Action::Scroll(10),

            // 編集開始
            (KeyCode::Enter, false, false) => Action::StartEdit,
            (KeyCode::Char('e'), false, false) => Action::StartEdit,

            // コマンド入力
            (KeyCode::Char(':'), false, _) => Action::StartCommand,
            (KeyCode::Char('/'), false, false) => Action::StartCommand,

            (KeyCode::Esc, _, _) => Action::Cancel,

            _ => Action::None,
        }
    }

    /// 編集中のキーをアクションに変換
    pub fn from_key_while_editing(key: KeyCode, mods: KeyMod) -> Self {
        match key {
            KeyCode::Enter => Action::Commit,
            KeyCode::Esc => Action::Cancel,
            KeyCode::Backspace => Action::Backspace,
            KeyCode::Char('g') if mods.ctrl => Action::Cancel,
            KeyCode::Char('s') if mods.ctrl => Action::Save,
            KeyCode::Char(ch) if !mods.ctrl && !mods.alt => Action::InputHex(ch),
            // 移動キーは暗黙のキャンセルとして扱われる
            other => Action::from_key(other, mods),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: KeyMod = KeyMod {
        ctrl: false,
        alt: false,
    };
    const CTRL: KeyMod = KeyMod {
        ctrl: true,
        alt: false,
    };

    #[test]
    fn normal_mode_bindings() {
        assert_eq!(Action::from_key(KeyCode::Down, NONE), Action::CursorDown);
        assert_eq!(Action::from_key(KeyCode::Down, CTRL), Action::Scroll(1));
        assert_eq!(Action::from_key(KeyCode::PageUp, NONE), Action::Scroll(-10));
        assert_eq!(Action::from_key(KeyCode::Char('s'), CTRL), Action::Save);
        assert_eq!(Action::from_key(KeyCode::Char(':'), NONE), Action::StartCommand);
        assert_eq!(Action::from_key(KeyCode::Char('x'), NONE), Action::None);
    }

    #[test]
    fn editing_bindings() {
        assert_eq!(
            Action::from_key_while_editing(KeyCode::Char('a'), NONE),
            Action::InputHex('a')
        );
        assert_eq!(
            Action::from_key_while_editing(KeyCode::Enter, NONE),
            Action::Commit
        );
        assert_eq!(
            Action::from_key_while_editing(KeyCode::Esc, NONE),
            Action::Cancel
        );
        assert_eq!(
            Action::from_key_while_editing(KeyCode::Right, NONE),
            Action::CursorRight
        );
    }
}
