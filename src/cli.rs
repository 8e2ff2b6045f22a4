//! Command-line driver: connects, prints pages as JSON, disconnects.

use crate::config::PagerConfig;
use crate::errors::PagerError;
use crate::monitor::LogMonitor;
use crate::pager::{PageCursor, Pager};
use crate::store::{ClientOptions, Connection, connect};
use crate::types::RecordId;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "docpager", version, about = "Cursor-based pagination over a document store")]
pub struct Args {
    /// Config file (TOML); searched in the usual places when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Connection URI: memory:// or file://<dir>
    #[arg(long)]
    pub uri: Option<String>,
    #[arg(long)]
    pub database: Option<String>,
    #[arg(long)]
    pub collection: Option<String>,
    #[arg(long)]
    pub page_size: Option<usize>,
    /// Number of pages to print; 0 walks until the collection is exhausted
    #[arg(long, default_value_t = 2)]
    pub pages: usize,
    /// Resume after this identifier (24 hex digits or an integer)
    #[arg(long)]
    pub after: Option<String>,
    /// Non-unique sort key; `_id` breaks ties
    #[arg(long)]
    pub sort_field: Option<String>,
    /// Per-page timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// error|warn|info|debug|trace
    #[arg(long)]
    pub log_level: Option<String>,
    /// Do not dump issued commands and replies
    #[arg(long)]
    pub no_command_log: bool,
}

impl Args {
    /// Overrides `cfg` with every flag that was given.
    pub fn apply_to(&self, cfg: &mut PagerConfig) {
        if let Some(v) = &self.uri {
            cfg.uri.clone_from(v);
        }
        if let Some(v) = &self.database {
            cfg.database.clone_from(v);
        }
        if let Some(v) = &self.collection {
            cfg.collection.clone_from(v);
        }
        if let Some(v) = self.page_size {
            cfg.page_size = v;
        }
        if self.sort_field.is_some() {
            cfg.sort_field.clone_from(&self.sort_field);
        }
        if self.timeout_ms.is_some() {
            cfg.timeout_ms = self.timeout_ms;
        }
        if self.no_command_log {
            cfg.log_commands = false;
        }
    }

    /// Loads config files and environment, then applies the flags.
    ///
    /// # Errors
    /// Returns `PagerError::Config` for unreadable config or invalid settings.
    pub fn resolve_config(&self) -> Result<PagerConfig, PagerError> {
        let mut cfg = PagerConfig::load(self.config.as_deref())?;
        self.apply_to(&mut cfg);
        cfg.validate_for_connect()?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub pages: usize,
    pub records: usize,
    /// Identifier of the last printed record.
    pub last_id: Option<RecordId>,
    pub exhausted: bool,
}

/// Connects with `cfg`, prints pages to `out`, and always closes the connection.
///
/// # Errors
/// Returns the first connection, query, cursor or output error.
pub async fn run(args: &Args, cfg: &PagerConfig, out: &mut dyn Write) -> Result<RunReport, PagerError> {
    let mut options = ClientOptions::default().with_app_name(cfg.app_name.clone());
    if cfg.log_commands {
        options = options.with_monitor(Arc::new(LogMonitor));
    }
    let client = connect(&cfg.uri, options).await?;
    let result = print_pages(&client, args, cfg, out).await;
    let closed = client.close().await;
    let report = result?;
    closed?;
    Ok(report)
}

async fn print_pages<C: Connection>(
    conn: &C,
    args: &Args,
    cfg: &PagerConfig,
    out: &mut dyn Write,
) -> Result<RunReport, PagerError> {
    let pager = Pager::new(conn, cfg)?;
    let start = args.after.as_deref().map(str::parse::<RecordId>).transpose()?.map(PageCursor::After);
    #[allow(clippy::cast_possible_wrap)]
    let mut walker = pager.walk_from(start, cfg.page_size as i64);
    let mut report = RunReport::default();
    while args.pages == 0 || report.pages < args.pages {
        let next = match cfg.timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), walker.next_page())
                .await
                .map_err(|_| PagerError::ConnectionError(format!("page request timed out after {ms}ms")))?,
            None => walker.next_page().await,
        };
        let Some(page) = next? else {
            report.exhausted = true;
            break;
        };
        report.pages += 1;
        report.records += page.len();
        report.last_id = page.last_id()?;
        writeln!(out, "Page {}:", report.pages)?;
        writeln!(out, "{}", serde_json::to_string_pretty(page.records())?)?;
        log::info!("page {} returned {} record(s)", report.pages, page.len());
        if page.is_last() {
            report.exhausted = true;
            break;
        }
    }
    Ok(report)
}
