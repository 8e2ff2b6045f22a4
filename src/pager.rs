//! Cursor-based pagination over a [`Connection`].
//!
//! Each page is one bounded range query: records whose identifier is strictly greater
//! than the last identifier the caller saw, sorted ascending, capped at `limit`. No
//! server-side cursor survives between calls, so any caller holding an identifier can
//! resume from it.
//!
//! Pages are not isolated from concurrent writers: a record inserted or deleted below the
//! cursor position between two calls is silently skipped or missed. Callers that need a
//! consistent view must snapshot the collection themselves.

use crate::config::PagerConfig;
use crate::errors::PagerError;
use crate::query::{CmpOp, Filter, SortSpec, get_path};
use crate::store::Connection;
use crate::types::{ID_FIELD, Record, RecordId};
use bson::Bson;

/// Position to resume paging from.
#[derive(Debug, Clone, PartialEq)]
pub enum PageCursor {
    /// Exclusive lower bound on `_id`.
    After(RecordId),
    /// Exclusive lower bound on `(sort field, _id)`.
    Keyset { value: Bson, id: RecordId },
}

impl From<RecordId> for PageCursor {
    fn from(id: RecordId) -> Self {
        Self::After(id)
    }
}

/// One bounded batch of records.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    records: Vec<Record>,
    limit: usize,
    sort_field: Option<String>,
}

impl Page {
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The limit this page was requested with.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// A page shorter than its limit is the last one.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.records.len() < self.limit
    }

    /// # Errors
    /// Returns `PagerError::MalformedIdentifier` if the last record has no usable `_id`.
    pub fn last_id(&self) -> Result<Option<RecordId>, PagerError> {
        self.records.last().map(Record::id).transpose()
    }

    /// Cursor that continues right after this page, or `None` for an empty page.
    ///
    /// # Errors
    /// `MalformedIdentifier` if the last record has no usable `_id`; `CursorMismatch` if it
    /// lacks the configured sort field.
    pub fn next_cursor(&self) -> Result<Option<PageCursor>, PagerError> {
        let Some(last) = self.records.last() else {
            return Ok(None);
        };
        let id = last.id()?;
        let Some(field) = &self.sort_field else {
            return Ok(Some(PageCursor::After(id)));
        };
        let value = get_path(last.document(), field)
            .cloned()
            .ok_or_else(|| PagerError::CursorMismatch(format!("record {id} has no {field} value")))?;
        Ok(Some(PageCursor::Keyset { value, id }))
    }
}

/// Produces pages of one collection. Borrows the connection and never closes it.
pub struct Pager<'a, C: Connection> {
    conn: &'a C,
    database: String,
    collection: String,
    default_limit: usize,
    sort_field: Option<String>,
}

impl<'a, C: Connection> Pager<'a, C> {
    /// # Errors
    /// Returns `PagerError::Config` when `config` does not name a database and collection.
    pub fn new(conn: &'a C, config: &PagerConfig) -> Result<Self, PagerError> {
        config.validate()?;
        Ok(Self {
            conn,
            database: config.database.clone(),
            collection: config.collection.clone(),
            default_limit: config.page_size,
            sort_field: config.sort_field.clone(),
        })
    }

    #[must_use]
    pub const fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Returns up to `limit` records with identifiers strictly greater than `after_id`,
    /// sorted ascending by identifier.
    ///
    /// With a `sort_field` configured, records come ordered by `(sort_field, _id)`
    /// instead, and only the first page (`after_id == None`) can be fetched here; later
    /// pages need the keyset cursor from [`Page::next_cursor`] via [`page`](Self::page)
    /// or [`walk`](Self::walk).
    ///
    /// # Errors
    /// `InvalidLimit` for a non-positive limit, `CursorMismatch` for an `after_id` when a
    /// sort field is configured, and any `ConnectionError` or `QueryError` from the store,
    /// unchanged.
    pub async fn paginate(&self, after_id: Option<&RecordId>, limit: i64) -> Result<Vec<Record>, PagerError> {
        let cursor = after_id.cloned().map(PageCursor::After);
        Ok(self.page(cursor.as_ref(), limit).await?.into_records())
    }

    /// [`paginate`](Self::paginate) with the configured page size.
    ///
    /// # Errors
    /// See [`paginate`](Self::paginate).
    pub async fn paginate_default(&self, after_id: Option<&RecordId>) -> Result<Vec<Record>, PagerError> {
        self.paginate(after_id, i64::try_from(self.default_limit).unwrap_or(i64::MAX)).await
    }

    /// [`paginate`](Self::paginate) taking the identifier in text form.
    ///
    /// # Errors
    /// `MalformedIdentifier` when `after` does not parse; otherwise as [`paginate`](Self::paginate).
    pub async fn paginate_str(&self, after: Option<&str>, limit: i64) -> Result<Vec<Record>, PagerError> {
        let after_id = after.map(str::parse::<RecordId>).transpose()?;
        self.paginate(after_id.as_ref(), limit).await
    }

    /// Fetches the page following `cursor`.
    ///
    /// # Errors
    /// As [`paginate`](Self::paginate).
    pub async fn page(&self, cursor: Option<&PageCursor>, limit: i64) -> Result<Page, PagerError> {
        let limit = checked_limit(limit)?;
        let filter = self.filter_for(cursor)?;
        let sort = self.sort_spec();
        log::debug!(
            "page of {limit} from {}.{} after {:?}",
            self.database,
            self.collection,
            cursor
        );
        let records = self.conn.query(&self.database, &self.collection, &filter, &sort, limit).await?;
        debug_assert!(records.len() <= limit, "store returned more records than requested");
        Ok(Page { records, limit, sort_field: self.sort_field.clone() })
    }

    /// Walks pages from the start of the collection until a short page.
    #[must_use]
    pub fn walk(&self, limit: i64) -> PageWalker<'_, 'a, C> {
        self.walk_from(None, limit)
    }

    #[must_use]
    pub fn walk_from(&self, cursor: Option<PageCursor>, limit: i64) -> PageWalker<'_, 'a, C> {
        PageWalker { pager: self, cursor, limit, done: false }
    }

    fn sort_spec(&self) -> Vec<SortSpec> {
        match &self.sort_field {
            Some(field) => vec![SortSpec::asc(field.clone()), SortSpec::asc(ID_FIELD)],
            None => vec![SortSpec::asc(ID_FIELD)],
        }
    }

    fn filter_for(&self, cursor: Option<&PageCursor>) -> Result<Filter, PagerError> {
        match (cursor, &self.sort_field) {
            (None, _) => Ok(Filter::True),
            (Some(PageCursor::After(id)), None) => Ok(Filter::cmp(ID_FIELD, CmpOp::Gt, id.to_bson())),
            (Some(PageCursor::Keyset { value, id }), Some(field)) => Ok(Filter::Or(vec![
                Filter::cmp(field.clone(), CmpOp::Gt, value.clone()),
                Filter::And(vec![
                    Filter::cmp(field.clone(), CmpOp::Eq, value.clone()),
                    Filter::cmp(ID_FIELD, CmpOp::Gt, id.to_bson()),
                ]),
            ])),
            (Some(PageCursor::After(id)), Some(field)) => Err(PagerError::CursorMismatch(format!(
                "identifier cursor {id} cannot resume a page sorted by {field}"
            ))),
            (Some(PageCursor::Keyset { .. }), None) => {
                Err(PagerError::CursorMismatch("keyset cursor given but no sort field is configured".into()))
            }
        }
    }
}

fn checked_limit(limit: i64) -> Result<usize, PagerError> {
    match usize::try_from(limit) {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(PagerError::InvalidLimit(limit)),
    }
}

/// Feeds each page's last position into the next request.
pub struct PageWalker<'p, 'a, C: Connection> {
    pager: &'p Pager<'a, C>,
    cursor: Option<PageCursor>,
    limit: i64,
    done: bool,
}

impl<C: Connection> PageWalker<'_, '_, C> {
    /// Next non-empty page, or `None` once the collection is exhausted.
    ///
    /// # Errors
    /// Propagates the pager's errors; the walker can be retried from the same position.
    pub async fn next_page(&mut self) -> Result<Option<Page>, PagerError> {
        if self.done {
            return Ok(None);
        }
        let page = self.pager.page(self.cursor.as_ref(), self.limit).await?;
        if page.is_empty() {
            self.done = true;
            return Ok(None);
        }
        self.cursor = page.next_cursor()?;
        self.done = page.is_last();
        Ok(Some(page))
    }

    /// Position the next request will resume from.
    #[must_use]
    pub const fn cursor(&self) -> Option<&PageCursor> {
        self.cursor.as_ref()
    }
}
