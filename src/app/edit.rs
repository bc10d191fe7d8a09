use crate::buffer::ByteBuffer;

/// 1バイト編集のステートマシン
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditSession {
    #[default]
    Idle,
    Editing {
        /// 編集中のアドレス
        target: usize,
        /// 入力中のHEX文字列（0〜2桁）
        pending: String,
    },
}

/// 編集操作の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// 状態を更新した
    Accepted,
    /// バイトを書き込んだ
    Committed {
        address: usize,
        value: u8,
        /// 次のアクティブアドレス
        next: usize,
    },
    /// 入力を破棄した
    Cancelled,
    /// 何も変更しなかった
    Rejected(Rejection),
}

/// 入力が受理されなかった理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotEditing,
    AddressOutOfRange(usize),
    NotHexDigit(char),
    PendingFull,
    EmptyValue,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotEditing => write!(f, "Not in edit mode"),
            Self::AddressOutOfRange(addr) => write!(f, "Address 0x{addr:08x} is out of range"),
            Self::NotHexDigit(ch) => write!(f, "'{ch}' is not a hex digit"),
            Self::PendingFull => write!(f, "A byte takes two hex digits"),
            Self::EmptyValue => write!(f, "Enter a hex value (00-ff)"),
        }
    }
}

impl EditSession {
    pub fn is_editing(&self) -> bool {
        matches!(self, Self::Editing { .. })
    }

    /// 編集中のアドレス
    pub fn target(&self) -> Option<usize> {
        match self {
            Self::Editing { target, .. } => Some(*target),
            Self::Idle => None,
        }
    }

    /// 入力中の文字列
    pub fn pending(&self) -> Option<&str> {
        match self {
            Self::Editing { pending, .. } => Some(pending),
            Self::Idle => None,
        }
    }

    /// 編集開始: 現在値を2桁のHEXで初期値にする
    pub fn begin(&mut self, address: usize, buffer: &ByteBuffer) -> EditOutcome {
        let Ok(byte) = buffer.read(address) else {
            return EditOutcome::Rejected(Rejection::AddressOutOfRange(address));
        };
        *self = Self::Editing {
            target: address,
            pending: format!("{byte:02x}"),
        };
        EditOutcome::Accepted
    }

    /// HEX文字を1つ追加（HEX以外・3桁目は無視）
    pub fn append_hex_digit(&mut self, ch: char) -> EditOutcome {
        let Self::Editing { pending, .. } = self else {
            return EditOutcome::Rejected(Rejection::NotEditing);
        };
        if !ch.is_ascii_hexdigit() {
            return EditOutcome::Rejected(Rejection::NotHexDigit(ch));
        }
        if pending.len() >= 2 {
            return EditOutcome::Rejected(Rejection::PendingFull);
        }
        pending.push(ch);
        EditOutcome::Accepted
    }

    /// 最後の1文字を削除
    pub fn pop_digit(&mut self) -> EditOutcome {
        match self {
            Self::Editing { pending, .. } => match pending.pop() {
                Some(_) => EditOutcome::Accepted,
                None => EditOutcome::Rejected(Rejection::EmptyValue),
            },
            Self::Idle => EditOutcome::Rejected(Rejection::NotEditing),
        }
    }

    /// 確定: 値が 0..=255 なら書き込んで Idle に戻る
    ///
    /// 解釈できない場合はバッファも状態も変えずに Rejected を返す。
    pub fn commit(&mut self, buffer: &mut ByteBuffer) -> EditOutcome {
        let Self::Editing { target, pending } = self else {
            return EditOutcome::Rejected(Rejection::NotEditing);
        };
        let target = *target;
        let Ok(value) = u32::from_str_radix(pending, 16) else {
            return EditOutcome::Rejected(Rejection::EmptyValue);
        };
        if buffer.write_value(target, value).is_err() {
            return EditOutcome::Rejected(Rejection::AddressOutOfRange(target));
        }

        *self = Self::Idle;
        EditOutcome::Committed {
            address: target,
            value: value as u8,
            next: (target + 1).min(buffer.len().saturating_sub(1)),
        }
    }

    /// キャンセル: 入力を破棄（バッファは変更しない）
    pub fn cancel(&mut self) -> EditOutcome {
        if std::mem::take(self).is_editing() {
            EditOutcome::Cancelled
        } else {
            EditOutcome::Rejected(Rejection::NotEditing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> ByteBuffer {
        ByteBuffer::from_bytes(vec![0x10, 0x20, 0x30, 0x40])
    }

    #[test]
    fn begin_prefills_current_byte() {
        let buf = buffer();
        let mut session = EditSession::default();

        assert_eq!(session.begin(2, &buf), EditOutcome::Accepted);
        assert_eq!(session.target(), Some(2));
        assert_eq!(session.pending(), Some("30"));
    }

    #[test]
    fn begin_out_of_range_stays_idle() {
        let buf = buffer();
        let mut session = EditSession::default();

        assert_eq!(
            session.begin(4, &buf),
            EditOutcome::Rejected(Rejection::AddressOutOfRange(4))
        );
        assert_eq!(session, EditSession::Idle);
    }

    #[test]
    fn commit_ff_writes_and_advances() {
        let mut buf = buffer();
        let mut session = EditSession::default();
        session.begin(1, &buf);
        session.pop_digit();
        session.pop_digit();
        session.append_hex_digit('f');
        session.append_hex_digit('F');

        let outcome = session.commit(&mut buf);

        assert_eq!(
            outcome,
            EditOutcome::Committed {
                address: 1,
                value: 0xFF,
                next: 2
            }
        );
        assert_eq!(buf.read(1).unwrap(), 255);
        assert_eq!(session, EditSession::Idle);
    }

    #[test]
    fn commit_at_last_byte_does_not_run_past_end() {
        let mut buf = buffer();
        let mut session = EditSession::default();
        session.begin(3, &buf);

        match session.commit(&mut buf) {
            EditOutcome::Committed { next, .. } => assert_eq!(next, 3),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn non_hex_and_third_digit_are_ignored() {
        let buf = buffer();
        let mut session = EditSession::default();
        session.begin(0, &buf);
        session.pop_digit();
        session.pop_digit();

        assert_eq!(
            session.append_hex_digit('g'),
            EditOutcome::Rejected(Rejection::NotHexDigit('g'))
        );
        assert_eq!(session.append_hex_digit('a'), EditOutcome::Accepted);
        assert_eq!(session.append_hex_digit('b'), EditOutcome::Accepted);
        assert_eq!(
            session.append_hex_digit('c'),
            EditOutcome::Rejected(Rejection::PendingFull)
        );
        assert_eq!(session.pending(), Some("ab"));
    }

    #[test]
    fn pop_past_empty_is_rejected() {
        let buf = buffer();
        let mut session = EditSession::default();
        assert_eq!(
            session.pop_digit(),
            EditOutcome::Rejected(Rejection::NotEditing)
        );

        session.begin(1, &buf);
        assert_eq!(session.pop_digit(), EditOutcome::Accepted);
        assert_eq!(session.pop_digit(), EditOutcome::Accepted);
        assert_eq!(
            session.pop_digit(),
            EditOutcome::Rejected(Rejection::EmptyValue)
        );
        assert_eq!(session.pending(), Some(""));
        assert!(session.is_editing());
    }

    #[test]
    fn empty_commit_is_rejected_without_mutation() {
        let mut buf = buffer();
        let mut session = EditSession::default();
        session.begin(0, &buf);
        session.pop_digit();
        session.pop_digit();

        assert_eq!(
            session.commit(&mut buf),
            EditOutcome::Rejected(Rejection::EmptyValue)
        );
        assert!(session.is_editing());
        assert_eq!(buf.read(0).unwrap(), 0x10);
        assert!(!buf.is_modified());
    }

    #[test]
    fn cancel_leaves_buffer_untouched() {
        let mut buf = buffer();
        let original = buf.read(2).unwrap();
        let mut session = EditSession::default();
        session.begin(2, &buf);
        session.pop_digit();
        session.append_hex_digit('9');

        assert_eq!(session.cancel(), EditOutcome::Cancelled);
        assert_eq!(buf.read(2).unwrap(), original);
        assert_eq!(session, EditSession::Idle);
        assert_eq!(
            session.commit(&mut buf),
            EditOutcome::Rejected(Rejection::NotEditing)
        );
    }
}
