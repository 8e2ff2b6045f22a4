//! Document-store client used by the pager.
//!
//! [`connect`] picks a backend from the URI scheme:
//! - `memory://` opens an empty in-process [`MemoryStore`]
//! - `file://<dir>` serves `<dir>/<database>/<collection>.ndjson` through a [`FileStore`]
//! - `mongodb://` and `mongodb+srv://` talk to a server through the official driver
//!   (`mongo` feature)
//!
//! Every query is issued as a `find` command and reported to the optional
//! [`CommandMonitor`] in [`ClientOptions`].

mod file;
mod memory;
#[cfg(feature = "mongo")]
mod mongo;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "mongo")]
pub use mongo::MongoStore;

use crate::errors::PagerError;
use crate::monitor::{CommandFailedEvent, CommandMonitor, CommandStartedEvent, CommandSucceededEvent};
use crate::query::{self, Filter, SortSpec};
use crate::types::Record;
use bson::Document as BsonDocument;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const MEMORY_SCHEME: &str = "memory://";
pub const FILE_SCHEME: &str = "file://";
pub const MONGODB_SCHEME: &str = "mongodb://";
pub const MONGODB_SRV_SCHEME: &str = "mongodb+srv://";

/// Options applied when opening a client.
#[derive(Clone, Default)]
pub struct ClientOptions {
    pub app_name: Option<String>,
    pub monitor: Option<Arc<dyn CommandMonitor>>,
}

impl ClientOptions {
    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_monitor(mut self, monitor: Arc<dyn CommandMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("app_name", &self.app_name)
            .field("monitor", &self.monitor.is_some())
            .finish()
    }
}

/// Minimal capability surface the pager needs from a store.
pub trait Connection: Send + Sync {
    /// Runs one bounded range query and returns the whole batch.
    fn query(
        &self,
        database: &str,
        collection: &str,
        filter: &Filter,
        sort: &[SortSpec],
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Record>, PagerError>> + Send;

    /// Ends the session. Later queries fail with `ConnectionError`.
    fn close(&self) -> impl Future<Output = Result<(), PagerError>> + Send;
}

enum Backend {
    Memory(Arc<MemoryStore>),
    File(FileStore),
    #[cfg(feature = "mongo")]
    Mongo(MongoStore),
}

/// A connected store client.
pub struct Client {
    backend: Backend,
    options: ClientOptions,
    next_request_id: AtomicU64,
    closed: AtomicBool,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match &self.backend {
            Backend::Memory(_) => "memory".to_string(),
            Backend::File(fs) => format!("file:{}", fs.root().display()),
            #[cfg(feature = "mongo")]
            Backend::Mongo(_) => "mongodb".to_string(),
        };
        f.debug_struct("Client")
            .field("backend", &backend)
            .field("options", &self.options)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Opens a client for `uri` and verifies the store answers a `ping`.
///
/// # Errors
/// Returns `PagerError::ConnectionError` for unknown schemes or an unreachable store.
pub async fn connect(uri: &str, options: ClientOptions) -> Result<Client, PagerError> {
    let backend = if uri.starts_with(MEMORY_SCHEME) {
        Backend::Memory(Arc::new(MemoryStore::new()))
    } else if let Some(path) = uri.strip_prefix(FILE_SCHEME) {
        if path.is_empty() {
            return Err(PagerError::ConnectionError(format!("missing directory in {uri}")));
        }
        Backend::File(FileStore::open(PathBuf::from(path)).await?)
    } else if uri.starts_with(MONGODB_SCHEME) || uri.starts_with(MONGODB_SRV_SCHEME) {
        open_mongo(uri, &options).await?
    } else {
        return Err(PagerError::ConnectionError(format!("unsupported connection uri: {uri}")));
    };
    let client = Client::new(backend, options);
    client.ping().await?;
    // Only the scheme: mongodb URIs may carry credentials
    let scheme = uri.split_once("://").map_or(uri, |(s, _)| s);
    log::debug!("connected to {scheme} store as {}", client.app_name());
    Ok(client)
}

#[cfg(feature = "mongo")]
async fn open_mongo(uri: &str, options: &ClientOptions) -> Result<Backend, PagerError> {
    let app_name = options.app_name.as_deref().unwrap_or(crate::config::DEFAULT_APP_NAME);
    Ok(Backend::Mongo(MongoStore::open(uri, app_name, options.monitor.clone()).await?))
}

#[cfg(not(feature = "mongo"))]
async fn open_mongo(_uri: &str, _options: &ClientOptions) -> Result<Backend, PagerError> {
    Err(PagerError::ConnectionError("mongodb URIs need docpager built with the `mongo` feature".into()))
}

impl Client {
    fn new(backend: Backend, options: ClientOptions) -> Self {
        Self { backend, options, next_request_id: AtomicU64::new(1), closed: AtomicBool::new(false) }
    }

    /// Attaches a client to an existing in-memory store.
    #[must_use]
    pub fn memory(store: Arc<MemoryStore>, options: ClientOptions) -> Self {
        Self::new(Backend::Memory(store), options)
    }

    #[must_use]
    pub fn app_name(&self) -> &str {
        self.options.app_name.as_deref().unwrap_or(crate::config::DEFAULT_APP_NAME)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), PagerError> {
        if self.is_closed() {
            return Err(PagerError::ConnectionError("client is closed".into()));
        }
        Ok(())
    }

    /// Monitor for commands this client reports itself.
    fn monitor(&self) -> Option<&Arc<dyn CommandMonitor>> {
        match &self.backend {
            // The driver reports its own commands
            #[cfg(feature = "mongo")]
            Backend::Mongo(_) => None,
            _ => self.options.monitor.as_ref(),
        }
    }

    fn notify_started(&self, name: &str, database: &str, command: BsonDocument) -> u64 {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        if let Some(m) = self.monitor() {
            m.started(&CommandStartedEvent {
                request_id,
                command_name: name.to_string(),
                database: database.to_string(),
                command,
                at: chrono::Utc::now(),
            });
        }
        request_id
    }

    fn notify_finished(&self, request_id: u64, name: &str, duration: Duration, outcome: Result<BsonDocument, &PagerError>) {
        let Some(m) = self.monitor() else { return };
        match outcome {
            Ok(reply) => m.succeeded(&CommandSucceededEvent {
                request_id,
                command_name: name.to_string(),
                duration,
                reply,
            }),
            Err(e) => m.failed(&CommandFailedEvent {
                request_id,
                command_name: name.to_string(),
                duration,
                failure: e.to_string(),
            }),
        }
    }

    async fn ping(&self) -> Result<(), PagerError> {
        self.ensure_open()?;
        let request_id = self.notify_started("ping", "admin", query::admin_command("ping"));
        let start = Instant::now();
        let result = match &self.backend {
            Backend::Memory(_) => Ok(()),
            Backend::File(fs) => fs.ping().await,
            #[cfg(feature = "mongo")]
            Backend::Mongo(store) => store.ping().await,
        };
        self.notify_finished(request_id, "ping", start.elapsed(), result.as_ref().map(|_| query::ok_reply()));
        result
    }
}

impl Connection for Client {
    async fn query(
        &self,
        database: &str,
        collection: &str,
        filter: &Filter,
        sort: &[SortSpec],
        limit: usize,
    ) -> Result<Vec<Record>, PagerError> {
        self.ensure_open()?;
        let command = query::find_command(database, collection, filter, sort, limit);
        let request_id = self.notify_started("find", database, command);
        let start = Instant::now();
        let result = match &self.backend {
            Backend::Memory(store) => Ok(store.find(database, collection, filter, sort, limit)),
            Backend::File(fs) => fs.find(database, collection, filter, sort, limit).await,
            #[cfg(feature = "mongo")]
            Backend::Mongo(store) => store.find(database, collection, filter, sort, limit).await,
        };
        self.notify_finished(
            request_id,
            "find",
            start.elapsed(),
            result.as_ref().map(|batch| query::find_reply(database, collection, batch)),
        );
        result
    }

    async fn close(&self) -> Result<(), PagerError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        #[cfg(feature = "mongo")]
        if let Backend::Mongo(store) = &self.backend {
            store.shutdown().await;
        }
        let request_id = self.notify_started("endSessions", "admin", query::admin_command("endSessions"));
        self.notify_finished(request_id, "endSessions", Duration::ZERO, Ok(query::ok_reply()));
        log::debug!("client {} closed", self.app_name());
        Ok(())
    }
}
