use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::BufferError;

/// 編集対象のバイト列
///
/// 長さは読み込み時に確定し、以後は上書きのみ可能。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    /// バッファデータ
    data: Vec<u8>,
    /// 変更フラグ
    modified: bool,
}

impl ByteBuffer {
    /// 空のバッファを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// バイト列から作成
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            modified: false,
        }
    }

    /// ファイルから読み込み
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BufferError> {
        let mut file = File::open(path.as_ref())?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(Self::from_bytes(data))
    }

    /// データの長さを取得
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// データが空かどうか
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 指定位置のバイトを取得
    pub fn read(&self, address: usize) -> Result<u8, BufferError> {
        self.data
            .get(address)
            .copied()
            .ok_or(BufferError::OutOfRange {
                address,
                len: self.data.len(),
            })
    }

    /// 指定位置のバイトを上書き
    pub fn write(&mut self, address: usize, value: u8) -> Result<(), BufferError> {
        let len = self.data.len();
        let slot = self
            .data
            .get_mut(address)
            .ok_or(BufferError::OutOfRange { address, len })?;
        if *slot != value {
            *slot = value;
            self.modified = true;
        }
        Ok(())
    }

    /// 範囲チェック付きで数値を書き込む（0..=255 以外は InvalidValue）
    pub fn write_value(&mut self, address: usize, value: u32) -> Result<(), BufferError> {
        let byte = u8::try_from(value).map_err(|_| BufferError::InvalidValue(value))?;
        self.write(address, byte)
    }

    /// 変更されているかどうか
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// 保存済みとしてマーク
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    /// 生データへの参照を取得
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 生データを取り出す
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
