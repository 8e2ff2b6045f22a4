//! Backend over a MongoDB deployment, built with the `mongo` feature.
//!
//! The driver speaks `bson` 2 while the rest of the crate uses `bson` 3. Documents
//! cross between the two as raw BSON bytes, which both read and write identically.
//! The driver reports its own command events; they are forwarded to the client's
//! [`CommandMonitor`] so real traffic shows up in the command log.

use crate::errors::PagerError;
use crate::monitor::{
    COMMAND_LOG_TARGET, CommandFailedEvent, CommandMonitor, CommandStartedEvent, CommandSucceededEvent,
};
use crate::query::{Filter, SortSpec, filter_document, sort_document};
use crate::types::Record;
use bson::Document as BsonDocument;
use mongodb::error::{Error as DriverError, ErrorKind};
use mongodb::event::EventHandler;
use mongodb::event::command::CommandEvent;
use mongodb::options::ClientOptions as DriverOptions;
use std::sync::Arc;

pub struct MongoStore {
    client: mongodb::Client,
}

impl MongoStore {
    /// Parses `uri` and builds a driver client. No server round trip happens here.
    pub(crate) async fn open(
        uri: &str,
        app_name: &str,
        monitor: Option<Arc<dyn CommandMonitor>>,
    ) -> Result<Self, PagerError> {
        let mut options = DriverOptions::parse(uri).await.map_err(connection_error)?;
        options.app_name = Some(app_name.to_string());
        if let Some(monitor) = monitor {
            options.command_event_handler =
                Some(EventHandler::callback(move |event: CommandEvent| forward(monitor.as_ref(), event)));
        }
        let client = mongodb::Client::with_options(options).map_err(connection_error)?;
        Ok(Self { client })
    }

    pub(crate) async fn ping(&self) -> Result<(), PagerError> {
        self.client.database("admin").run_command(bson2::doc! { "ping": 1 }).await.map_err(connection_error)?;
        Ok(())
    }

    pub(crate) async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: &Filter,
        sort: &[SortSpec],
        limit: usize,
    ) -> Result<Vec<Record>, PagerError> {
        let coll = self.client.database(database).collection::<bson2::Document>(collection);
        let mut cursor = coll
            .find(to_driver(&filter_document(filter))?)
            .sort(to_driver(&sort_document(sort))?)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await
            .map_err(driver_error)?;
        let mut batch = Vec::new();
        while cursor.advance().await.map_err(driver_error)? {
            let doc = cursor.deserialize_current().map_err(driver_error)?;
            batch.push(Record(from_driver(&doc)?));
        }
        Ok(batch)
    }

    pub(crate) async fn shutdown(&self) {
        self.client.clone().shutdown().await;
    }
}

fn forward(monitor: &dyn CommandMonitor, event: CommandEvent) {
    match event {
        CommandEvent::Started(e) => match from_driver(&e.command) {
            Ok(command) => monitor.started(&CommandStartedEvent {
                request_id: request_id(e.request_id),
                command_name: e.command_name,
                database: e.db,
                command,
                at: chrono::Utc::now(),
            }),
            Err(err) => log::warn!(target: COMMAND_LOG_TARGET, "dropping {} event: {err}", e.command_name),
        },
        CommandEvent::Succeeded(e) => match from_driver(&e.reply) {
            Ok(reply) => monitor.succeeded(&CommandSucceededEvent {
                request_id: request_id(e.request_id),
                command_name: e.command_name,
                duration: e.duration,
                reply,
            }),
            Err(err) => log::warn!(target: COMMAND_LOG_TARGET, "dropping {} reply: {err}", e.command_name),
        },
        CommandEvent::Failed(e) => monitor.failed(&CommandFailedEvent {
            request_id: request_id(e.request_id),
            command_name: e.command_name,
            duration: e.duration,
            failure: e.failure.to_string(),
        }),
        _ => {}
    }
}

fn request_id(id: i32) -> u64 {
    u64::try_from(id).unwrap_or_default()
}

fn connection_error(e: DriverError) -> PagerError {
    PagerError::ConnectionError(e.to_string())
}

/// Unreachable servers are connection failures; everything else the server rejected.
fn driver_error(e: DriverError) -> PagerError {
    if matches!(*e.kind, ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. }) {
        connection_error(e)
    } else {
        PagerError::QueryError(e.to_string())
    }
}

fn to_driver(doc: &BsonDocument) -> Result<bson2::Document, PagerError> {
    let mut bytes = Vec::new();
    doc.to_writer(&mut bytes).map_err(|e| PagerError::QueryError(format!("encoding command: {e}")))?;
    bson2::Document::from_reader(&mut bytes.as_slice())
        .map_err(|e| PagerError::QueryError(format!("encoding command: {e}")))
}

fn from_driver(doc: &bson2::Document) -> Result<BsonDocument, PagerError> {
    let mut bytes = Vec::new();
    doc.to_writer(&mut bytes).map_err(|e| PagerError::QueryError(format!("decoding document: {e}")))?;
    BsonDocument::from_reader(&mut bytes.as_slice())
        .map_err(|e| PagerError::QueryError(format!("decoding document: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::CmpOp;
    use crate::types::ID_FIELD;
    use bson::oid::ObjectId;
    use bson::{Bson, Decimal128, doc};

    #[test]
    fn documents_survive_the_driver_boundary() {
        let oid = ObjectId::new();
        let price: Decimal128 = "12.50".parse().unwrap();
        let movie = doc! {
            "_id": oid,
            "year": 1999_i64,
            "runtime": 136_i32,
            "price": price,
            "imdb": { "rating": 8.7, "votes": 1_500_000_i64 },
            "genres": ["Action", "Sci-Fi"],
        };
        let driver = to_driver(&movie).unwrap();
        assert_eq!(driver.get_object_id("_id").unwrap().to_hex(), oid.to_hex());
        assert_eq!(driver.get_i64("year").unwrap(), 1999);
        assert_eq!(driver.get_i32("runtime").unwrap(), 136);
        assert_eq!(from_driver(&driver).unwrap(), movie);
    }

    #[test]
    fn find_filter_keeps_its_operator_shape() {
        let filter = Filter::cmp(ID_FIELD, CmpOp::Gt, Bson::Int64(42));
        let driver = to_driver(&filter_document(&filter)).unwrap();
        let inner = driver.get_document(ID_FIELD).unwrap();
        assert_eq!(inner.get_i64("$gt").unwrap(), 42);
        let sort = to_driver(&sort_document(&[SortSpec::asc(ID_FIELD)])).unwrap();
        assert_eq!(sort.get_i32(ID_FIELD).unwrap(), 1);
    }

    #[test]
    fn negative_request_ids_map_to_zero() {
        assert_eq!(request_id(7), 7);
        assert_eq!(request_id(-1), 0);
    }
}
