use hexvault::store::{ChunkedStore, FileStore, KvStore, MemoryStore, StoreError, CHUNK_SIZE};
use rand::Rng;

fn random_bytes(len: usize) -> Vec<u8> {
    rand::rng()
        .sample_iter(rand::distr::StandardUniform)
        .take(len)
        .collect()
}

#[test]
fn round_trip_at_chunk_boundaries() {
    let mut store = ChunkedStore::new(MemoryStore::new());

    for len in [0, 1, CHUNK_SIZE - 1, CHUNK_SIZE, CHUNK_SIZE + 1, 10 * CHUNK_SIZE + 37] {
        let name = format!("file-{len}.bin");
        let data = random_bytes(len);

        let record = store.save(&name, &data, "application/octet-stream").unwrap();
        assert_eq!(record.size, len);
        assert_eq!(store.chunk_count(&name).unwrap(), Some(len.div_ceil(CHUNK_SIZE)));

        let loaded = store.load(&name).unwrap();
        assert_eq!(loaded.data, data, "mismatch for {len} bytes");
        assert_eq!(loaded.record.unwrap().size, len);
    }
}

#[test]
fn two_chunk_file_is_split_at_chunk_size() {
    let mut store = ChunkedStore::new(MemoryStore::new());
    let data = random_bytes(150_000);
    store.save("big.bin", &data, "application/octet-stream").unwrap();

    let kv = store.kv();
    assert_eq!(kv.get("hexfile:count:big.bin").unwrap().as_deref(), Some("2"));
    assert!(kv.get("hexfile:chunk:big.bin:0").unwrap().is_some());
    assert!(kv.get("hexfile:chunk:big.bin:1").unwrap().is_some());
    assert!(kv.get("hexfile:chunk:big.bin:2").unwrap().is_none());

    let meta = kv.get("hexfile:meta:big.bin").unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&meta).unwrap();
    assert_eq!(json["name"], "big.bin");
    assert_eq!(json["size"], 150_000);
    assert_eq!(json["mimeType"], "application/octet-stream");
    assert!(json["lastModified"].is_i64());

    assert_eq!(store.load("big.bin").unwrap().data, data);
}

#[test]
fn quota_failure_leaves_partial_entries() {
    // count と chunk 0 は入るが chunk 1 は入らない
    let mut store = ChunkedStore::new(MemoryStore::with_quota(200_000));
    let data = random_bytes(3 * CHUNK_SIZE);

    let err = store.save("big.bin", &data, "application/octet-stream").unwrap_err();
    match err {
        StoreError::WriteFailed { key, .. } => assert_eq!(key, "hexfile:chunk:big.bin:1"),
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(store.chunk_count("big.bin").unwrap(), Some(3));
    assert!(matches!(store.load("big.bin"), Err(StoreError::Corrupted { .. })));
    assert!(store.list().unwrap().is_empty());

    // 削除すれば容量は戻る
    store.delete("big.bin").unwrap();
    assert_eq!(store.kv().used(), 0);
    store.save("small.bin", &data[..CHUNK_SIZE / 2], "application/octet-stream").unwrap();
}

#[test]
fn delete_is_idempotent() {
    let mut store = ChunkedStore::new(MemoryStore::new());
    store.save("a.bin", &random_bytes(CHUNK_SIZE + 5), "application/octet-stream").unwrap();
    store.save("b.bin", b"keep", "text/plain").unwrap();

    store.delete("a.bin").unwrap();
    store.delete("a.bin").unwrap();
    store.delete("never-saved").unwrap();

    let names: Vec<String> = store.list().unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(names, vec!["b.bin"]);
    assert!(matches!(store.load("a.bin"), Err(StoreError::NotFound(name)) if name == "a.bin"));
    assert!(store
        .kv()
        .keys()
        .unwrap()
        .iter()
        .all(|key| !key.contains("a.bin")));
}

#[test]
fn list_reports_every_saved_file() {
    let mut store = ChunkedStore::new(MemoryStore::new());
    store.save("zeta", b"z", "application/octet-stream").unwrap();
    store.save("alpha", &[0u8; 10], "application/octet-stream").unwrap();

    let records = store.list().unwrap();
    let summary: Vec<(&str, usize)> = records.iter().map(|r| (r.name.as_str(), r.size)).collect();
    assert_eq!(summary, vec![("alpha", 10), ("zeta", 1)]);
}

#[test]
fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let data = random_bytes(2 * CHUNK_SIZE + 3);

    {
        let kv = FileStore::open(&path, None).unwrap();
        let mut store = ChunkedStore::new(kv);
        store.save("persist.bin", &data, "application/octet-stream").unwrap();
    }

    let kv = FileStore::open(&path, None).unwrap();
    let store = ChunkedStore::new(kv);
    let loaded = store.load("persist.bin").unwrap();
    assert_eq!(loaded.data, data);
    assert_eq!(store.chunk_count("persist.bin").unwrap(), Some(3));
}
