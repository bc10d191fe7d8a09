/// コマンドラインから入力されたコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Check,
    Quit,
    Load(String),
    Save,
    /// 16進アドレス（解釈できなかった場合は Err に元の文字列）
    Edit(Result<usize, String>),
    Open(String),
    List,
    Delete(String),
    Unknown(String),
}

impl Command {
    /// 入力をパース（空入力は None）
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let (verb, arg) = match input.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (input, ""),
        };

        let cmd = match (verb.to_lowercase().as_str(), arg.is_empty()) {
            ("help", true) => Command::Help,
            ("?" | "check", true) => Command::Check,
            ("exit" | "quit", true) => Command::Quit,
            ("save", true) => Command::Save,
            ("list" | "ls", true) => Command::List,
            ("load", false) => Command::Load(arg.to_string()),
            ("open", false) => Command::Open(arg.to_string()),
            ("delete" | "rm", false) => Command::Delete(arg.to_string()),
            ("edit", false) => Command::Edit(parse_hex_address(arg).ok_or_else(|| arg.to_string())),
            _ => Command::Unknown(input.to_string()),
        };
        Some(cmd)
    }
}

/// "0x100" / "100" / "100h" を16進として解釈
pub fn parse_hex_address(s: &str) -> Option<usize> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_suffix(['h', 'H']))
        .unwrap_or(s);
    if digits.is_empty() {
        return None;
    }
    usize::from_str_radix(digits, 16).ok()
}

/// コマンド入力欄（履歴付き）
#[derive(Debug, Default, Clone)]
pub struct CommandLine {
    /// 入力中の文字列
    input: String,
    /// 実行済みコマンド（古い順）
    history: Vec<String>,
    /// 履歴参照位置（0 = 最新）
    history_index: Option<usize>,
}

impl CommandLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn push_char(&mut self, ch: char) {
        self.input.push(ch);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.history_index = None;
    }

    /// 履歴に追加
    pub fn record(&mut self, cmd: impl Into<String>) {
        self.history.push(cmd.into());
        self.history_index = None;
    }

    /// 入力を確定して取り出す（履歴にも追加）
    pub fn submit(&mut self) -> Option<String> {
        let cmd = self.input.trim().to_string();
        self.clear();
        if cmd.is_empty() {
            return None;
        }
        self.record(cmd.clone());
        Some(cmd)
    }

    /// 新しい順に最大 n 件
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &str> + '_ {
        self.history.iter().rev().take(n).map(String::as_str)
    }

    /// 一つ古い履歴へ
    pub fn history_up(&mut self) {
        let next = self.history_index.map_or(0, |i| i + 1);
        if next < self.history.len() {
            self.history_index = Some(next);
            self.input = self.history[self.history.len() - 1 - next].clone();
        }
    }

    /// 一つ新しい履歴へ（最新より先は空欄）
    pub fn history_down(&mut self) {
        match self.history_index {
            Some(0) => {
                self.history_index = None;
                self.input.clear();
            }
            Some(i) => {
                self.history_index = Some(i - 1);
                self.input = self.history[self.history.len() - i].clone();
            }
            None => {}
        }
    }
}
