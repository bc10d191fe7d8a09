use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::{check_quota, entry_size, KvError, KvStore};

/// 1つのJSONオブジェクトとしてディスクに保存するストア
///
/// 変更のたびに一時ファイル経由でファイル全体を書き直す。
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
    used: usize,
}

impl FileStore {
    /// ストアを開く（ファイルが無ければ空）
    pub fn open(path: impl Into<PathBuf>, quota: Option<usize>) -> Result<Self, KvError> {
        let path = path.into();
        let entries: BTreeMap<String, String> = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        let used = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
        tracing::debug!(path = %path.display(), entries = entries.len(), used, "opened file store");

        Ok(Self {
            path,
            entries,
            quota,
            used,
        })
    }

    fn flush(&self) -> Result<(), KvError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, serde_json::to_vec(&self.entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        let replaced = self
            .entries
            .get(key)
            .map_or(0, |old| entry_size(key, old));
        check_quota(self.quota, self.used, replaced, key, value)?;

        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush() {
            match previous {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(e);
        }
        self.used = self.used - replaced + entry_size(key, value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KvError> {
        let Some(old) = self.entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush() {
            self.entries.insert(key.to_string(), old);
            return Err(e);
        }
        self.used -= entry_size(key, &old);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, KvError> {
        Ok(self.entries.keys().cloned().collect())
    }
}
