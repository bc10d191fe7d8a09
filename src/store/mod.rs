//! 永続化: テキストのみのキー・バリューポートと、その上のチャンク保存

mod chunked;
mod file;
mod memory;

pub use chunked::{ChunkedStore, FileRecord, LoadedFile, CHUNK_SIZE, DEFAULT_MIME_TYPE, DEFAULT_NAMESPACE};
pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// キー・バリューバックエンドのエラー
#[derive(Debug, Error)]
pub enum KvError {
    #[error("quota exceeded: storing {key} needs {needed} bytes, {available} available")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed store file: {0}")]
    Format(#[from] serde_json::Error),
}

/// [`ChunkedStore`] のエラー
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File corrupted: {name} ({reason})")]
    Corrupted { name: String, reason: String },

    #[error("Write failed at {key}: {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: KvError,
    },

    #[error("Storage error: {0}")]
    Backend(#[from] KvError),
}

/// 容量制限付きのテキストKVストア（[`ChunkedStore`] の土台）
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError>;
    fn remove(&mut self, key: &str) -> Result<(), KvError>;
    fn keys(&self) -> Result<Vec<String>, KvError>;
}

impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), KvError> {
        (**self).remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, KvError> {
        (**self).keys()
    }
}

/// エントリが消費するバイト数
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// 使用量を保持するバックエンド共通の容量チェック
pub(crate) fn check_quota(
    quota: Option<usize>,
    used: usize,
    replaced: usize,
    key: &str,
    value: &str,
) -> Result<(), KvError> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let needed = entry_size(key, value);
    let available = quota.saturating_sub(used.saturating_sub(replaced));
    if needed > available {
        return Err(KvError::QuotaExceeded {
            key: key.to_string(),
            needed,
            available,
        });
    }
    Ok(())
}
