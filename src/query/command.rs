use bson::{Bson, Document as BsonDocument, doc};

use super::types::{Filter, SortSpec};
use crate::types::Record;

/// Renders a filter in the operator syntax document stores log and accept.
#[must_use]
pub fn filter_document(filter: &Filter) -> BsonDocument {
    match filter {
        Filter::True => BsonDocument::new(),
        Filter::And(fs) => doc! { "$and": fs.iter().map(|f| Bson::Document(filter_document(f))).collect::<Vec<_>>() },
        Filter::Or(fs) => doc! { "$or": fs.iter().map(|f| Bson::Document(filter_document(f))).collect::<Vec<_>>() },
        Filter::Exists { path, exists } => {
            let mut d = BsonDocument::new();
            d.insert(path.clone(), doc! { "$exists": *exists });
            d
        }
        Filter::Cmp { path, op, value } => {
            let mut inner = BsonDocument::new();
            inner.insert(op.operator(), value.clone());
            let mut d = BsonDocument::new();
            d.insert(path.clone(), inner);
            d
        }
    }
}

#[must_use]
pub fn sort_document(sort: &[SortSpec]) -> BsonDocument {
    let mut d = BsonDocument::new();
    for s in sort {
        d.insert(s.field.clone(), s.order.as_i32());
    }
    d
}

/// Builds the `find` command for one bounded page.
#[allow(clippy::cast_possible_wrap)]
#[must_use]
pub fn find_command(database: &str, collection: &str, filter: &Filter, sort: &[SortSpec], limit: usize) -> BsonDocument {
    doc! {
        "find": collection,
        "filter": filter_document(filter),
        "sort": sort_document(sort),
        "limit": limit as i64,
        "$db": database,
    }
}

/// Builds the reply to a `find` that returned its whole result in the first batch.
#[must_use]
pub fn find_reply(database: &str, collection: &str, batch: &[Record]) -> BsonDocument {
    let first_batch: Vec<Bson> = batch.iter().map(|r| Bson::Document(r.0.clone())).collect();
    doc! {
        "cursor": {
            "firstBatch": first_batch,
            "id": 0_i64,
            "ns": format!("{database}.{collection}"),
        },
        "ok": 1.0,
    }
}

#[must_use]
pub fn admin_command(name: &str) -> BsonDocument {
    let mut d = BsonDocument::new();
    d.insert(name, 1_i32);
    d.insert("$db", "admin");
    d
}

#[must_use]
pub fn ok_reply() -> BsonDocument {
    doc! { "ok": 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::CmpOp;

    #[test]
    fn renders_range_filter() {
        let f = Filter::cmp("_id", CmpOp::Gt, Bson::Int64(10));
        assert_eq!(filter_document(&f), doc! { "_id": { "$gt": 10_i64 } });
        assert_eq!(filter_document(&Filter::True), doc! {});
    }

    #[test]
    fn find_command_carries_page_shape() {
        let cmd = find_command("db", "movies", &Filter::True, &[SortSpec::asc("_id")], 10);
        assert_eq!(cmd.get_str("find").unwrap(), "movies");
        assert_eq!(cmd.get_document("sort").unwrap(), &doc! { "_id": 1 });
        assert_eq!(cmd.get_i64("limit").unwrap(), 10);
        assert_eq!(cmd.get_str("$db").unwrap(), "db");
    }
}
