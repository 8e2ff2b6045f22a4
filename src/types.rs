use crate::errors::PagerError;
use bson::oid::ObjectId;
use bson::{Bson, Document as BsonDocument};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Field holding the record identifier.
pub const ID_FIELD: &str = "_id";

pub type DatabaseName = String;
pub type CollectionName = String;

/// Identifier of a record, used as the pagination cursor.
///
/// Ordering follows BSON comparison order across kinds (numbers, then strings, then
/// object ids) and natural order within a kind. Object ids compare by their 12 bytes,
/// which puts them in creation order for ids minted by one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordId {
    Int(i64),
    Str(String),
    ObjectId(ObjectId),
}

impl RecordId {
    /// Mints a fresh store-assigned identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self::ObjectId(ObjectId::new())
    }

    /// Reads an identifier out of a BSON value.
    ///
    /// # Errors
    /// Returns `PagerError::MalformedIdentifier` for value types that cannot act as an identifier.
    pub fn from_bson(value: &Bson) -> Result<Self, PagerError> {
        match value {
            Bson::ObjectId(oid) => Ok(Self::ObjectId(*oid)),
            Bson::Int32(i) => Ok(Self::Int(i64::from(*i))),
            Bson::Int64(i) => Ok(Self::Int(*i)),
            Bson::String(s) => Ok(Self::Str(s.clone())),
            other => Err(PagerError::MalformedIdentifier(format!(
                "unsupported identifier type {:?}",
                other.element_type()
            ))),
        }
    }

    #[must_use]
    pub fn to_bson(&self) -> Bson {
        match self {
            Self::Int(i) => Bson::Int64(*i),
            Self::Str(s) => Bson::String(s.clone()),
            Self::ObjectId(oid) => Bson::ObjectId(*oid),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Int(_) => 0,
            Self::Str(_) => 1,
            Self::ObjectId(_) => 2,
        }
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::ObjectId(a), Self::ObjectId(b)) => a.bytes().cmp(&b.bytes()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parses the text form of an identifier: 24 hex digits for an object id, otherwise a
/// decimal integer.
impl FromStr for RecordId {
    type Err = PagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == 24 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            return ObjectId::parse_str(s)
                .map(Self::ObjectId)
                .map_err(|e| PagerError::MalformedIdentifier(format!("{s}: {e}")));
        }
        s.parse::<i64>()
            .map(Self::Int)
            .map_err(|_| PagerError::MalformedIdentifier(s.to_string()))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::ObjectId(oid) => write!(f, "{}", oid.to_hex()),
        }
    }
}

impl From<ObjectId> for RecordId {
    fn from(oid: ObjectId) -> Self {
        Self::ObjectId(oid)
    }
}

impl From<i64> for RecordId {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// A stored document. The store guarantees the presence of `_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub BsonDocument);

impl Record {
    /// # Errors
    /// Returns `PagerError::MalformedIdentifier` when `_id` is missing or of an unsupported type.
    pub fn id(&self) -> Result<RecordId, PagerError> {
        let value = self
            .0
            .get(ID_FIELD)
            .ok_or_else(|| PagerError::MalformedIdentifier("record has no _id".into()))?;
        RecordId::from_bson(value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Bson> {
        self.0.get(key)
    }

    #[must_use]
    pub fn document(&self) -> &BsonDocument {
        &self.0
    }
}

impl From<BsonDocument> for Record {
    fn from(doc: BsonDocument) -> Self {
        Self(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object_id_and_integer_forms() {
        let oid = ObjectId::new();
        assert_eq!(oid.to_hex().parse::<RecordId>().unwrap(), RecordId::ObjectId(oid));
        assert_eq!("42".parse::<RecordId>().unwrap(), RecordId::Int(42));
        assert_eq!(" -7 ".parse::<RecordId>().unwrap(), RecordId::Int(-7));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "abc", "zzzzzzzzzzzzzzzzzzzzzzzz", "12.5", "0x10"] {
            match bad.parse::<RecordId>() {
                Err(PagerError::MalformedIdentifier(_)) => {}
                other => panic!("{bad:?} parsed as {other:?}"),
            }
        }
    }

    #[test]
    fn orders_across_kinds() {
        let mut ids = vec![
            RecordId::ObjectId(ObjectId::new()),
            RecordId::Str("b".into()),
            RecordId::Int(3),
            RecordId::Str("a".into()),
            RecordId::Int(-1),
        ];
        ids.sort();
        assert_eq!(ids[0], RecordId::Int(-1));
        assert_eq!(ids[1], RecordId::Int(3));
        assert_eq!(ids[2], RecordId::Str("a".into()));
        assert_eq!(ids[3], RecordId::Str("b".into()));
        assert!(matches!(ids[4], RecordId::ObjectId(_)));
    }

    #[test]
    fn generated_ids_ascend() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert!(a < b);
    }

    #[test]
    fn record_id_requires_supported_type() {
        let rec = Record(bson::doc! { "_id": 1.5, "x": 1 });
        assert!(matches!(rec.id(), Err(PagerError::MalformedIdentifier(_))));
        let rec = Record(bson::doc! { "x": 1 });
        assert!(matches!(rec.id(), Err(PagerError::MalformedIdentifier(_))));
        let rec = Record(bson::doc! { "_id": 9_i32 });
        assert_eq!(rec.id().unwrap(), RecordId::Int(9));
    }
}
