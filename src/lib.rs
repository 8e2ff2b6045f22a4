pub mod cli;
pub mod config;
pub mod errors;
pub mod logger;
pub mod monitor;
pub mod pager;
pub mod query;
pub mod store;
pub mod types;

pub use crate::config::PagerConfig;
pub use crate::errors::PagerError;
pub use crate::pager::{Page, PageCursor, PageWalker, Pager};
pub use crate::store::{Client, ClientOptions, Connection, FileStore, MemoryStore, connect};
pub use crate::types::{Record, RecordId};

