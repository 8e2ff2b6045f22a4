#![allow(dead_code)]

use bson::doc;
use docpager::{Client, ClientOptions, MemoryStore, PagerConfig, Record, RecordId};
use std::path::Path;
use std::sync::Arc;

pub const DB: &str = "sample";
pub const COLLECTION: &str = "movies";

pub fn config() -> PagerConfig {
    PagerConfig::new("memory://", DB, COLLECTION)
}

/// Store holding records with integer ids `1..=n`, inserted in reverse to prove ordering
/// comes from the query and not from insertion.
pub fn store_with_ids(n: i64) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for i in (1..=n).rev() {
        store.insert(DB, COLLECTION, doc! { "_id": i, "title": format!("movie {i}") }).unwrap();
    }
    store
}

pub fn client(store: &Arc<MemoryStore>) -> Client {
    Client::memory(Arc::clone(store), ClientOptions::default())
}

pub fn ids(records: &[Record]) -> Vec<RecordId> {
    records.iter().map(|r| r.id().unwrap()).collect()
}

pub fn int_ids(range: impl IntoIterator<Item = i64>) -> Vec<RecordId> {
    range.into_iter().map(RecordId::Int).collect()
}

/// Writes `<root>/<db>/<collection>.ndjson` with one line per document.
pub fn write_collection(root: &Path, db: &str, collection: &str, lines: &[String]) {
    let dir = root.join(db);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{collection}.ndjson")), lines.join("\n")).unwrap();
}
