use std::collections::BTreeMap;

use super::{check_quota, entry_size, KvError, KvStore};

/// メモリ上のストア（容量制限は任意）
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
    used: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// キーと値の合計が `quota` バイトを超える書き込みを拒否する
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 使用中のバイト数
    pub fn used(&self) -> usize {
        self.used
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        let replaced = self
            .entries
            .get(key)
            .map_or(0, |old| entry_size(key, old));
        check_quota(self.quota, self.used, replaced, key, value)?;

        self.used = self.used - replaced + entry_size(key, value);
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KvError> {
        if let Some(old) = self.entries.remove(key) {
            self.used -= entry_size(key, &old);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, KvError> {
        Ok(self.entries.keys().cloned().collect())
    }
}
