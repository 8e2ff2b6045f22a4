use crate::errors::PagerError;
use crate::query::{CmpOp, Filter, Order, SortSpec, eval_filter, select};
use crate::types::{CollectionName, DatabaseName, ID_FIELD, Record, RecordId};
use bson::Document as BsonDocument;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

type Records = BTreeMap<RecordId, BsonDocument>;

/// In-process document store. Collections keep records in identifier order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    databases: RwLock<HashMap<DatabaseName, HashMap<CollectionName, Records>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a document, assigning a fresh object id when `_id` is absent.
    ///
    /// # Errors
    /// `DuplicateKey` when the id is taken, `MalformedIdentifier` when `_id` has an unusable type.
    pub fn insert(&self, database: &str, collection: &str, doc: BsonDocument) -> Result<RecordId, PagerError> {
        let (id, doc) = match doc.get(ID_FIELD) {
            Some(v) => (RecordId::from_bson(v)?, doc),
            None => {
                let id = RecordId::generate();
                let mut with_id = BsonDocument::new();
                with_id.insert(ID_FIELD, id.to_bson());
                for (k, v) in doc {
                    with_id.insert(k, v);
                }
                (id, with_id)
            }
        };
        let mut dbs = self.databases.write();
        let records = dbs
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();
        if records.contains_key(&id) {
            return Err(PagerError::DuplicateKey(format!("{database}.{collection} _id {id}")));
        }
        records.insert(id.clone(), doc);
        Ok(id)
    }

    /// Inserts documents in order, stopping at the first failure.
    ///
    /// # Errors
    /// Propagates the first insert error; earlier documents stay inserted.
    pub fn insert_many(
        &self,
        database: &str,
        collection: &str,
        docs: impl IntoIterator<Item = BsonDocument>,
    ) -> Result<Vec<RecordId>, PagerError> {
        docs.into_iter().map(|d| self.insert(database, collection, d)).collect()
    }

    pub fn delete(&self, database: &str, collection: &str, id: &RecordId) -> bool {
        self.databases
            .write()
            .get_mut(database)
            .and_then(|d| d.get_mut(collection))
            .is_some_and(|records| records.remove(id).is_some())
    }

    #[must_use]
    pub fn count(&self, database: &str, collection: &str) -> usize {
        self.databases.read().get(database).and_then(|d| d.get(collection)).map_or(0, BTreeMap::len)
    }

    #[must_use]
    pub fn list_collection_names(&self, database: &str) -> Vec<String> {
        let mut names: Vec<String> =
            self.databases.read().get(database).map(|d| d.keys().cloned().collect()).unwrap_or_default();
        names.sort();
        names
    }

    pub(crate) fn find(&self, database: &str, collection: &str, filter: &Filter, sort: &[SortSpec], limit: usize) -> Vec<Record> {
        let dbs = self.databases.read();
        let Some(records) = dbs.get(database).and_then(|d| d.get(collection)) else {
            return Vec::new();
        };
        let candidates = records.range((id_lower_bound(filter), Bound::Unbounded));
        if is_id_ascending(sort) {
            // Map order already matches the requested order; stop at the limit
            return candidates
                .filter(|(_, d)| eval_filter(d, filter))
                .take(limit)
                .map(|(_, d)| Record(d.clone()))
                .collect();
        }
        select(candidates.map(|(_, d)| Record(d.clone())), filter, sort, limit)
    }
}

fn is_id_ascending(sort: &[SortSpec]) -> bool {
    matches!(sort, [s] if s.field == ID_FIELD && s.order == Order::Asc)
}

/// Lower bound on `_id` implied by a top-level range filter.
fn id_lower_bound(filter: &Filter) -> Bound<RecordId> {
    match filter {
        Filter::Cmp { path, op, value } if path == ID_FIELD => match (op, RecordId::from_bson(value)) {
            (CmpOp::Gt, Ok(id)) => Bound::Excluded(id),
            (CmpOp::Gte | CmpOp::Eq, Ok(id)) => Bound::Included(id),
            _ => Bound::Unbounded,
        },
        _ => Bound::Unbounded,
    }
}
