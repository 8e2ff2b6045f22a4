//! Command monitoring for the store client.
//!
//! The client reports every command it issues to an optional [`CommandMonitor`]. The
//! pager itself never talks to a monitor; callers opt in through
//! [`crate::store::ClientOptions`].

use bson::Document as BsonDocument;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Log target used for command and reply dumps.
pub const COMMAND_LOG_TARGET: &str = "docpager::commands";

/// Housekeeping commands that are not worth logging.
const QUIET_COMMANDS: &[&str] = &["endSessions", "ping"];

#[derive(Debug, Clone, PartialEq)]
pub struct CommandStartedEvent {
    pub request_id: u64,
    pub command_name: String,
    pub database: String,
    pub command: BsonDocument,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandSucceededEvent {
    pub request_id: u64,
    pub command_name: String,
    pub duration: Duration,
    pub reply: BsonDocument,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandFailedEvent {
    pub request_id: u64,
    pub command_name: String,
    pub duration: Duration,
    pub failure: String,
}

/// Receives command lifecycle notifications. All methods default to no-ops.
pub trait CommandMonitor: Send + Sync {
    fn started(&self, _event: &CommandStartedEvent) {}
    fn succeeded(&self, _event: &CommandSucceededEvent) {}
    fn failed(&self, _event: &CommandFailedEvent) {}
}

/// True when a command should show up in the command log.
#[must_use]
pub fn is_loggable(command_name: &str) -> bool {
    !QUIET_COMMANDS.contains(&command_name)
}

/// Writes commands and replies as indented JSON through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMonitor;

impl LogMonitor {
    fn pretty(doc: &BsonDocument) -> Option<String> {
        match serde_json::to_string_pretty(doc) {
            Ok(s) => Some(s),
            Err(e) => {
                log::error!(target: COMMAND_LOG_TARGET, "Error formatting command document: {e}");
                None
            }
        }
    }
}

impl CommandMonitor for LogMonitor {
    fn started(&self, event: &CommandStartedEvent) {
        if !is_loggable(&event.command_name) {
            return;
        }
        if let Some(body) = Self::pretty(&event.command) {
            log::info!(
                target: COMMAND_LOG_TARGET,
                "{} #{} started on {}:\n{body}",
                event.command_name,
                event.request_id,
                event.database
            );
        }
    }

    fn succeeded(&self, event: &CommandSucceededEvent) {
        if !is_loggable(&event.command_name) {
            return;
        }
        if let Some(body) = Self::pretty(&event.reply) {
            log::info!(
                target: COMMAND_LOG_TARGET,
                "{} #{} succeeded in {}us:\n{body}",
                event.command_name,
                event.request_id,
                event.duration.as_micros()
            );
        }
    }

    fn failed(&self, event: &CommandFailedEvent) {
        log::warn!(
            target: COMMAND_LOG_TARGET,
            "{} #{} failed after {}us: {}",
            event.command_name,
            event.request_id,
            event.duration.as_micros(),
            event.failure
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    Started(CommandStartedEvent),
    Succeeded(CommandSucceededEvent),
    Failed(CommandFailedEvent),
}

impl RecordedEvent {
    #[must_use]
    pub fn command_name(&self) -> &str {
        match self {
            Self::Started(e) => &e.command_name,
            Self::Succeeded(e) => &e.command_name,
            Self::Failed(e) => &e.command_name,
        }
    }
}

/// Keeps every event in memory; useful for asserting on issued commands in tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingMonitor {
    events: Arc<RwLock<Vec<RecordedEvent>>>,
}

impl RecordingMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().clone()
    }

    /// Commands that were started, in issue order.
    #[must_use]
    pub fn started_commands(&self) -> Vec<CommandStartedEvent> {
        self.events
            .read()
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::Started(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl CommandMonitor for RecordingMonitor {
    fn started(&self, event: &CommandStartedEvent) {
        self.events.write().push(RecordedEvent::Started(event.clone()));
    }

    fn succeeded(&self, event: &CommandSucceededEvent) {
        self.events.write().push(RecordedEvent::Succeeded(event.clone()));
    }

    fn failed(&self, event: &CommandFailedEvent) {
        self.events.write().push(RecordedEvent::Failed(event.clone()));
    }
}
