//! Pager configuration.
//!
//! Built once at startup and handed to [`crate::pager::Pager::new`] by reference.
//! Sources, highest precedence first: CLI flags (applied by the binary), environment
//! variables, config files, defaults.

use crate::errors::PagerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_APP_NAME: &str = "docpager";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const CONFIG_FILE_NAME: &str = "docpager.toml";

pub const ENV_CONFIG: &str = "DOCPAGER_CONFIG";
pub const ENV_URI: &str = "DOCPAGER_URI";
pub const ENV_DATABASE: &str = "DOCPAGER_DATABASE";
pub const ENV_COLLECTION: &str = "DOCPAGER_COLLECTION";
pub const ENV_PAGE_SIZE: &str = "DOCPAGER_PAGE_SIZE";
pub const ENV_SORT_FIELD: &str = "DOCPAGER_SORT_FIELD";

/// Fallbacks read when the matching `DOCPAGER_*` variable is unset.
pub const ENV_MONGODB_URI: &str = "MONGODB_URI";
pub const ENV_MONGODB_DATABASE: &str = "MONGODB_DATABASE";
pub const ENV_MONGODB_COLLECTION: &str = "MONGODB_COLLECTION";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagerConfig {
    /// Connection URI, opaque to the pager.
    pub uri: String,
    pub app_name: String,
    pub database: String,
    pub collection: String,
    /// Page size used when a caller does not pass one.
    pub page_size: usize,
    /// Optional non-unique sort key; `_id` breaks ties when set.
    pub sort_field: Option<String>,
    /// Per-call timeout applied by the driver around each page request.
    pub timeout_ms: Option<u64>,
    pub log_commands: bool,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            app_name: DEFAULT_APP_NAME.to_string(),
            database: String::new(),
            collection: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            sort_field: None,
            timeout_ms: None,
            log_commands: true,
        }
    }
}

/// One config file; absent keys leave lower layers untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub uri: Option<String>,
    pub app_name: Option<String>,
    pub database: Option<String>,
    pub collection: Option<String>,
    pub page_size: Option<usize>,
    pub sort_field: Option<String>,
    pub timeout_ms: Option<u64>,
    pub log_commands: Option<bool>,
}

impl ConfigFile {
    /// # Errors
    /// Returns `PagerError::Config` when the text is not valid TOML for this schema.
    pub fn parse(text: &str) -> Result<Self, PagerError> {
        toml::from_str(text).map_err(|e| PagerError::Config(e.to_string()))
    }

    /// Fills keys still unset here from `other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self {
            uri: self.uri.or(other.uri),
            app_name: self.app_name.or(other.app_name),
            database: self.database.or(other.database),
            collection: self.collection.or(other.collection),
            page_size: self.page_size.or(other.page_size),
            sort_field: self.sort_field.or(other.sort_field),
            timeout_ms: self.timeout_ms.or(other.timeout_ms),
            log_commands: self.log_commands.or(other.log_commands),
        }
    }
}

impl PagerConfig {
    pub fn new(uri: impl Into<String>, database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self { uri: uri.into(), database: database.into(), collection: collection.into(), ..Self::default() }
    }

    /// Loads defaults, then config files, then the process environment.
    ///
    /// # Errors
    /// Returns `PagerError::Config` when an existing config file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, PagerError> {
        let mut cfg = Self::default();
        let mut merged = ConfigFile::default();
        for path in config_paths(explicit) {
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&path)
                .map_err(|e| PagerError::Config(format!("{}: {e}", path.display())))?;
            let file: ConfigFile =
                toml::from_str(&text).map_err(|e| PagerError::Config(format!("{}: {e}", path.display())))?;
            log::debug!("loaded config file {}", path.display());
            merged = merged.or(file);
        }
        cfg.apply_file(merged);
        cfg.apply_env_from(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(v) = file.uri {
            self.uri = v;
        }
        if let Some(v) = file.app_name {
            self.app_name = v;
        }
        if let Some(v) = file.database {
            self.database = v;
        }
        if let Some(v) = file.collection {
            self.collection = v;
        }
        if let Some(v) = file.page_size {
            self.page_size = v;
        }
        if file.sort_field.is_some() {
            self.sort_field = file.sort_field;
        }
        if file.timeout_ms.is_some() {
            self.timeout_ms = file.timeout_ms;
        }
        if let Some(v) = file.log_commands {
            self.log_commands = v;
        }
    }

    /// Applies `DOCPAGER_*` variables read through `lookup`, falling back to
    /// `MONGODB_URI`, `MONGODB_DATABASE` and `MONGODB_COLLECTION`.
    ///
    /// # Errors
    /// Returns `PagerError::Config` when `DOCPAGER_PAGE_SIZE` is not a number.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), PagerError> {
        let either = |primary: &str, fallback: &str| lookup(primary).or_else(|| lookup(fallback));
        if let Some(v) = either(ENV_URI, ENV_MONGODB_URI) {
            self.uri = v;
        }
        if let Some(v) = either(ENV_DATABASE, ENV_MONGODB_DATABASE) {
            self.database = v;
        }
        if let Some(v) = either(ENV_COLLECTION, ENV_MONGODB_COLLECTION) {
            self.collection = v;
        }
        if let Some(v) = lookup(ENV_PAGE_SIZE) {
            self.page_size = v
                .trim()
                .parse()
                .map_err(|_| PagerError::Config(format!("{ENV_PAGE_SIZE} must be a positive integer, got {v:?}")))?;
        }
        if let Some(v) = lookup(ENV_SORT_FIELD) {
            self.sort_field = Some(v).filter(|s| !s.is_empty());
        }
        Ok(())
    }

    /// Checks the settings the pager relies on.
    ///
    /// # Errors
    /// Returns `PagerError::Config` naming the first offending setting.
    pub fn validate(&self) -> Result<(), PagerError> {
        if self.database.trim().is_empty() {
            return Err(PagerError::Config("database name is required".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(PagerError::Config("collection name is required".into()));
        }
        if self.page_size == 0 || i64::try_from(self.page_size).is_err() {
            return Err(PagerError::Config(format!("page_size must be a positive integer, got {}", self.page_size)));
        }
        if self.sort_field.as_deref().is_some_and(|f| f.trim().is_empty()) {
            return Err(PagerError::Config("sort_field must not be empty".into()));
        }
        Ok(())
    }

    /// Like [`validate`](Self::validate), plus a connection URI.
    ///
    /// # Errors
    /// Returns `PagerError::Config` when the URI is missing or another setting is invalid.
    pub fn validate_for_connect(&self) -> Result<(), PagerError> {
        if self.uri.trim().is_empty() {
            return Err(PagerError::Config(format!("connection uri is required (set {ENV_URI} or --uri)")));
        }
        self.validate()
    }
}

/// Config file candidates, highest precedence first.
#[must_use]
pub fn config_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = explicit {
        paths.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(ENV_CONFIG) {
        paths.push(PathBuf::from(p));
    }
    if let Some(dir) = dirs_next::config_dir() {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join(CONFIG_FILE_NAME));
    }
    paths
}
