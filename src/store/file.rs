use crate::errors::PagerError;
use crate::query::{Filter, SortSpec, select};
use crate::types::Record;
use bson::Document as BsonDocument;
use std::io;
use std::path::{Path, PathBuf};

const COLLECTION_EXT: &str = "ndjson";

/// Read-only store over a directory tree of NDJSON files.
///
/// Layout: `<root>/<database>/<collection>.ndjson`, one extended-JSON document per line.
/// Files are re-read on every query, so edits show up on the next page.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// # Errors
    /// Returns `PagerError::ConnectionError` when `root` is not a readable directory.
    pub async fn open(root: PathBuf) -> Result<Self, PagerError> {
        let store = Self { root };
        store.ping().await?;
        Ok(store)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn collection_path(&self, database: &str, collection: &str) -> PathBuf {
        self.root.join(database).join(format!("{collection}.{COLLECTION_EXT}"))
    }

    pub(crate) async fn ping(&self) -> Result<(), PagerError> {
        match tokio::fs::metadata(&self.root).await {
            Ok(m) if m.is_dir() => Ok(()),
            Ok(_) => Err(PagerError::ConnectionError(format!("{} is not a directory", self.root.display()))),
            Err(e) => Err(PagerError::ConnectionError(format!("{}: {e}", self.root.display()))),
        }
    }

    pub(crate) async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: &Filter,
        sort: &[SortSpec],
        limit: usize,
    ) -> Result<Vec<Record>, PagerError> {
        self.ping().await?;
        let path = self.collection_path(database, collection);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PagerError::QueryError(format!("{}: {e}", path.display()))),
        };
        let records = parse_ndjson(&text, &path)?;
        Ok(select(records, filter, sort, limit))
    }
}

fn parse_ndjson(text: &str, path: &Path) -> Result<Vec<Record>, PagerError> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let doc: BsonDocument = serde_json::from_str(line)
            .map_err(|e| PagerError::QueryError(format!("{}:{line_no}: {e}", path.display())))?;
        let record = Record(doc);
        record
            .id()
            .map_err(|e| PagerError::QueryError(format!("{}:{line_no}: {e}", path.display())))?;
        out.push(record);
    }
    Ok(out)
}
