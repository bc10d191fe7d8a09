use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{KvStore, StoreError};

/// 1チャンクあたりの生バイト数（base64 化する前）
pub const CHUNK_SIZE: usize = 100 * 1024;
/// 既定のキー接頭辞
pub const DEFAULT_NAMESPACE: &str = "hexfile";
/// 保存時に記録するMIMEタイプ
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// 保存済みファイルのメタデータ（内容とは独立）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub name: String,
    pub size: usize,
    /// Unixエポックからのミリ秒
    pub last_modified: i64,
    pub mime_type: String,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, size: usize, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            last_modified: Utc::now().timestamp_millis(),
            mime_type: mime_type.into(),
        }
    }
}

/// [`ChunkedStore::load`] の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub data: Vec<u8>,
    /// メタデータが無ければ None（不完全な読み込みとして扱う）
    pub record: Option<FileRecord>,
}

/// バイト列を base64 チャンクに分けて [`KvStore`] に保存する
///
/// 名前空間 `ns` のファイル `name` のキー:
/// `ns:count:name`, `ns:chunk:name:i`, `ns:meta:name`、
/// 保存中マーカー有効時は `ns:pending:name`。
/// 書き込みは順番に行い、失敗してもロールバックしない。
#[derive(Debug)]
pub struct ChunkedStore<S> {
    kv: S,
    namespace: String,
    chunk_size: usize,
    intent_marker: bool,
}

impl<S: KvStore> ChunkedStore<S> {
    pub fn new(kv: S) -> Self {
        Self {
            kv,
            namespace: DEFAULT_NAMESPACE.to_string(),
            chunk_size: CHUNK_SIZE,
            intent_marker: false,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// 保存の前後に pending マーカーを書く（残っていれば読み込みは Corrupted）
    pub fn with_intent_marker(mut self, enabled: bool) -> Self {
        self.intent_marker = enabled;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn kv_mut(&mut self) -> &mut S {
        &mut self.kv
    }

    pub fn into_inner(self) -> S {
        self.kv
    }

    fn count_key(&self, name: &str) -> String {
        format!("{}:count:{}", self.namespace, name)
    }

    fn chunk_key(&self, name: &str, index: usize) -> String {
        format!("{}:chunk:{}:{}", self.namespace, name, index)
    }

    /// 保存済みキーから数えたチャンク数（count が壊れている時用）
    fn chunk_span(&self, name: &str) -> Result<usize, StoreError> {
        let prefix = format!("{}:chunk:{}:", self.namespace, name);
        let span = self
            .kv
            .keys()?
            .iter()
            .filter_map(|key| key.strip_prefix(&prefix)?.parse::<usize>().ok())
            .map(|index| index + 1)
            .max()
            .unwrap_or(0);
        Ok(span)
    }

    /// count が壊れていればキー走査で代用する
    fn stored_span(&self, name: &str) -> Result<usize, StoreError> {
        match self.chunk_count(name) {
            Ok(count) => Ok(count.unwrap_or(0)),
            Err(StoreError::Corrupted { .. }) => self.chunk_span(name),
            Err(e) => Err(e),
        }
    }

    fn meta_prefix(&self) -> String {
        format!("{}:meta:", self.namespace)
    }

    fn meta_key(&self, name: &str) -> String {
        format!("{}{}", self.meta_prefix(), name)
    }

    fn pending_key(&self, name: &str) -> String {
        format!("{}:pending:{}", self.namespace, name)
    }

    fn put(&mut self, key: String, value: &str) -> Result<(), StoreError> {
        self.kv
            .set(&key, value)
            .map_err(|source| StoreError::WriteFailed { key, source })
    }

    fn corrupted(name: &str, reason: impl Into<String>) -> StoreError {
        StoreError::Corrupted {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// 記録されたチャンク数（未保存なら None）
    pub fn chunk_count(&self, name: &str) -> Result<Option<usize>, StoreError> {
        let Some(raw) = self.kv.get(&self.count_key(name))? else {
            return Ok(None);
        };
        raw.trim()
            .parse()
            .map(Some)
            .map_err(|_| Self::corrupted(name, format!("bad chunk count {raw:?}")))
    }

    pub fn contains(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.kv.get(&self.count_key(name))?.is_some())
    }

    /// `name` で保存（既存の内容は置き換える）
    pub fn save(
        &mut self,
        name: &str,
        data: &[u8],
        mime_type: &str,
    ) -> Result<FileRecord, StoreError> {
        let previous = self.stored_span(name)?;
        let chunks: Vec<String> = data
            .chunks(self.chunk_size)
            .map(|chunk| STANDARD.encode(chunk))
            .collect();

        if self.intent_marker {
            self.put(self.pending_key(name), &chunks.len().to_string())?;
        }

        self.put(self.count_key(name), &chunks.len().to_string())?;
        for (index, chunk) in chunks.iter().enumerate() {
            self.put(self.chunk_key(name, index), chunk)?;
            tracing::debug!(name, index, encoded = chunk.len(), "chunk written");
        }

        let record = FileRecord::new(name, data.len(), mime_type);
        let meta = serde_json::to_string(&record).map_err(|e| StoreError::WriteFailed {
            key: self.meta_key(name),
            source: e.into(),
        })?;
        self.put(self.meta_key(name), &meta)?;

        if self.intent_marker {
            self.kv.remove(&self.pending_key(name))?;
        }

        // 以前の長い保存の残り
        for index in chunks.len()..previous {
            self.kv.remove(&self.chunk_key(name, index))?;
        }

        tracing::info!(name, size = data.len(), chunks = chunks.len(), "file saved");
        Ok(record)
    }

    /// 保存済みのバイト列を復元
    pub fn load(&self, name: &str) -> Result<LoadedFile, StoreError> {
        let Some(count) = self.chunk_count(name)? else {
            return Err(StoreError::NotFound(name.to_string()));
        };
        if self.intent_marker && self.kv.get(&self.pending_key(name))?.is_some() {
            return Err(Self::corrupted(name, "interrupted save"));
        }

        let mut data = Vec::new();
        for index in 0..count {
            let Some(chunk) = self.kv.get(&self.chunk_key(name, index))? else {
                return Err(Self::corrupted(
                    name,
                    format!("chunk {index} of {count} is missing"),
                ));
            };
            STANDARD
                .decode_vec(chunk.as_bytes(), &mut data)
                .map_err(|e| Self::corrupted(name, format!("chunk {index}: {e}")))?;
        }

        let record = self.record(name)?;
        match &record {
            Some(record) if record.size != data.len() => {
                return Err(Self::corrupted(
                    name,
                    format!("expected {} bytes, decoded {}", record.size, data.len()),
                ));
            }
            Some(_) => {}
            None => tracing::warn!(name, "loaded without metadata"),
        }

        tracing::info!(name, size = data.len(), chunks = count, "file loaded");
        Ok(LoadedFile { data, record })
    }

    /// メタデータを取得
    pub fn record(&self, name: &str) -> Result<Option<FileRecord>, StoreError> {
        let Some(raw) = self.kv.get(&self.meta_key(name))? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| Self::corrupted(name, format!("metadata: {e}")))
    }

    /// 全エントリを削除（存在しなくても成功）
    pub fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        let count = self.stored_span(name)?;
        for index in 0..count {
            self.kv.remove(&self.chunk_key(name, index))?;
        }
        self.kv.remove(&self.meta_key(name))?;
        self.kv.remove(&self.count_key(name))?;
        self.kv.remove(&self.pending_key(name))?;

        tracing::info!(name, chunks = count, "file deleted");
        Ok(())
    }

    /// メタデータ一覧（名前順、チャンクは検証しない）
    pub fn list(&self) -> Result<Vec<FileRecord>, StoreError> {
        let prefix = self.meta_prefix();
        let mut records = Vec::new();
        for key in self.kv.keys()? {
            let Some(name) = key.strip_prefix(&prefix) else {
                continue;
            };
            let Some(raw) = self.kv.get(&key)? else {
                continue;
            };
            match serde_json::from_str::<FileRecord>(&raw) {
                Ok(mut record) => {
                    record.name = name.to_string();
                    records.push(record);
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping unreadable metadata"),
            }
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> ChunkedStore<MemoryStore> {
        ChunkedStore::new(MemoryStore::new())
    }

    #[test]
    fn metadata_is_camel_case_json() {
        let record = FileRecord {
            name: "a.bin".into(),
            size: 3,
            last_modified: 42,
            mime_type: DEFAULT_MIME_TYPE.into(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"name":"a.bin","size":3,"lastModified":42,"mimeType":"application/octet-stream"}"#
        );
    }

    #[test]
    fn key_layout() {
        let mut store = store().with_chunk_size(2);
        store.save("f", &[1, 2, 3], DEFAULT_MIME_TYPE).unwrap();

        let keys = store.kv().keys().unwrap();
        assert_eq!(
            keys,
            vec![
                "hexfile:chunk:f:0",
                "hexfile:chunk:f:1",
                "hexfile:count:f",
                "hexfile:meta:f",
            ]
        );
        assert_eq!(store.kv().get("hexfile:count:f").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn empty_buffer_round_trips_with_zero_chunks() {
        let mut store = store();
        store.save("empty", &[], DEFAULT_MIME_TYPE).unwrap();

        assert_eq!(store.chunk_count("empty").unwrap(), Some(0));
        let loaded = store.load("empty").unwrap();
        assert!(loaded.data.is_empty());
        assert_eq!(loaded.record.unwrap().size, 0);
    }

    #[test]
    fn shorter_resave_drops_stale_chunks() {
        let mut store = store().with_chunk_size(4);
        store.save("f", &[0; 10], DEFAULT_MIME_TYPE).unwrap();
        store.save("f", &[1; 3], DEFAULT_MIME_TYPE).unwrap();

        assert_eq!(store.chunk_count("f").unwrap(), Some(1));
        assert_eq!(store.kv().get("hexfile:chunk:f:1").unwrap(), None);
        assert_eq!(store.load("f").unwrap().data, vec![1; 3]);
    }

    #[test]
    fn missing_chunk_is_corrupted() {
        let mut store = store().with_chunk_size(4);
        store.save("f", &[7; 9], DEFAULT_MIME_TYPE).unwrap();
        store.kv_mut().remove("hexfile:chunk:f:1").unwrap();

        assert!(matches!(
            store.load("f"),
            Err(StoreError::Corrupted { ref name, .. }) if name == "f"
        ));
    }

    #[test]
    fn unparsable_count_is_corrupted_and_deletable() {
        let mut store = store().with_chunk_size(2);
        store.save("f", &[1, 2, 3, 4, 5], DEFAULT_MIME_TYPE).unwrap();
        store.save("f2", b"keep", DEFAULT_MIME_TYPE).unwrap();
        store.kv_mut().set("hexfile:count:f", "x").unwrap();

        assert!(matches!(store.chunk_count("f"), Err(StoreError::Corrupted { .. })));
        assert!(matches!(store.load("f"), Err(StoreError::Corrupted { .. })));

        store.delete("f").unwrap();
        let keys = store.kv().keys().unwrap();
        assert!(keys.iter().all(|k| !k.starts_with("hexfile:chunk:f:")), "{keys:?}");
        assert!(matches!(store.load("f"), Err(StoreError::NotFound(_))));
        assert_eq!(store.load("f2").unwrap().data, b"keep");
    }

    #[test]
    fn resave_over_unparsable_count_drops_old_chunks() {
        let mut store = store().with_chunk_size(2);
        store.save("f", &[0; 6], DEFAULT_MIME_TYPE).unwrap();
        store.kv_mut().set("hexfile:count:f", "??").unwrap();

        store.save("f", &[9], DEFAULT_MIME_TYPE).unwrap();

        assert_eq!(store.chunk_count("f").unwrap(), Some(1));
        assert_eq!(store.kv().get("hexfile:chunk:f:1").unwrap(), None);
        assert_eq!(store.kv().get("hexfile:chunk:f:2").unwrap(), None);
        assert_eq!(store.load("f").unwrap().data, vec![9]);
    }

    #[test]
    fn invalid_base64_chunk_is_corrupted_and_deletable() {
        let mut store = store().with_chunk_size(4);
        store.save("f", &[3; 9], DEFAULT_MIME_TYPE).unwrap();
        store.kv_mut().set("hexfile:chunk:f:1", "!!!").unwrap();

        assert!(matches!(
            store.load("f"),
            Err(StoreError::Corrupted { ref reason, .. }) if reason.starts_with("chunk 1")
        ));

        store.delete("f").unwrap();
        assert!(store.kv().is_empty());
    }

    #[test]
    fn size_mismatch_is_corrupted() {
        let mut store = store();
        store.save("f", &[1, 2, 3, 4], DEFAULT_MIME_TYPE).unwrap();
        let mut record = store.record("f").unwrap().unwrap();
        record.size = 5;
        let raw = serde_json::to_string(&record).unwrap();
        store.kv_mut().set("hexfile:meta:f", &raw).unwrap();

        assert!(matches!(store.load("f"), Err(StoreError::Corrupted { .. })));
    }

    #[test]
    fn load_without_metadata_succeeds() {
        let mut store = store();
        store.save("f", b"abc", DEFAULT_MIME_TYPE).unwrap();
        store.kv_mut().remove("hexfile:meta:f").unwrap();

        let loaded = store.load("f").unwrap();
        assert_eq!(loaded.data, b"abc");
        assert_eq!(loaded.record, None);
    }

    #[test]
    fn namespaces_are_isolated() {
        let mut a = ChunkedStore::new(MemoryStore::new()).with_namespace("a");
        a.save("f", b"xyz", DEFAULT_MIME_TYPE).unwrap();
        let b = ChunkedStore::new(a.into_inner()).with_namespace("b");

        assert!(matches!(b.load("f"), Err(StoreError::NotFound(_))));
        assert!(b.list().unwrap().is_empty());
    }

    #[test]
    fn intent_marker_flags_interrupted_save() {
        // 2つ目のチャンクで容量切れ
        let kv = MemoryStore::with_quota(200);
        let mut store = ChunkedStore::new(kv)
            .with_chunk_size(64)
            .with_intent_marker(true);

        let err = store.save("f", &[0xAB; 128], DEFAULT_MIME_TYPE).unwrap_err();
        assert!(matches!(err, StoreError::WriteFailed { .. }));
        assert!(matches!(store.load("f"), Err(StoreError::Corrupted { ref reason, .. }) if reason == "interrupted save"));

        store.delete("f").unwrap();
        assert!(store.kv().is_empty());
    }
}
