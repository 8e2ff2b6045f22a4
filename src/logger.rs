use crate::monitor::COMMAND_LOG_TARGET;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Deserializers, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

const ENCODER_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;

/// Logging config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "log4rs.yaml";
pub const ENV_LOG_CONFIG: &str = "DOCPAGER_LOG_CONFIG";

/// Initializes the logging system.
///
/// A log4rs file (`DOCPAGER_LOG_CONFIG`, else `./log4rs.yaml`) takes over when present;
/// otherwise the configuration is built from `opts`.
///
/// # Errors
/// Returns an error if the file is invalid, the appenders cannot be created, or a logger
/// is already installed.
pub fn init(opts: &LogOptions) -> Result<(), Box<dyn std::error::Error>> {
    let file = config_file(std::env::var_os(ENV_LOG_CONFIG).map(PathBuf::from));
    log4rs::init_config(load_config(file.as_deref(), opts)?)?;
    if let Some(path) = file {
        log::debug!("logging configured from {}", path.display());
    }
    Ok(())
}

/// The log4rs file to use: `explicit` when given, else `log4rs.yaml` if it exists.
#[must_use]
pub fn config_file(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()))
}

/// Reads `file` when given, else builds the configuration from `opts`.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or the appenders cannot be created.
pub fn load_config(file: Option<&Path>, opts: &LogOptions) -> Result<Config, Box<dyn std::error::Error>> {
    match file {
        Some(path) => Ok(log4rs::config::load_config_file(path, Deserializers::default())?),
        None => build_config(opts),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Directory for rolling log files; console only when `None`.
    pub dir: Option<PathBuf>,
    pub level: LevelFilter,
    /// Number of rolled files to keep.
    pub retention: u32,
    /// Route command dumps (target `docpager::commands`) to the console.
    pub log_commands: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self { dir: None, level: LevelFilter::Info, retention: 7, log_commands: true }
    }
}

/// error|warn|info|debug|trace|off; anything else means info.
#[must_use]
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling_appender(dir: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let roller = FixedWindowRoller::builder().build(&format!("{}", dir.join(format!("{stem}.{{}}.log")).display()), keep)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    let appender = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(ENCODER_PATTERN)))
        .build(dir.join(format!("{stem}.log")), Box::new(policy))?;
    Ok(appender)
}

/// Builds the log4rs configuration: application logs to stderr (and `docpager.log` when a
/// directory is given), command dumps to their own non-additive logger.
///
/// # Errors
/// Returns an error if the log directory or appenders cannot be created.
pub fn build_config(opts: &LogOptions) -> Result<Config, Box<dyn std::error::Error>> {
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(ENCODER_PATTERN)))
        .build();
    let commands = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S%.3f)} {m}{n}")))
        .build();
    let mut builder = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .appender(Appender::builder().build("commands", Box::new(commands)));
    let mut root = Root::builder().appender("console");
    let mut command_logger = Logger::builder().additive(false);
    if opts.log_commands {
        command_logger = command_logger.appender("commands");
    }
    if let Some(dir) = &opts.dir {
        std::fs::create_dir_all(dir)?;
        builder = builder
            .appender(Appender::builder().build("app", Box::new(rolling_appender(dir, "docpager", opts.retention)?)))
            .appender(Appender::builder().build("command_file", Box::new(rolling_appender(dir, "commands", opts.retention)?)));
        root = root.appender("app");
        command_logger = command_logger.appender("command_file");
    }
    let command_level = if opts.log_commands { LevelFilter::Info.max(opts.level) } else { LevelFilter::Off };
    let config = builder
        .logger(command_logger.build(COMMAND_LOG_TARGET, command_level))
        .build(root.build(opts.level))?;
    Ok(config)
}

/// Reads logging options from the environment:
/// - `DOCPAGER_LOG_DIR`
/// - `DOCPAGER_LOG_LEVEL`
/// - `DOCPAGER_LOG_RETENTION`
#[must_use]
pub fn options_from_env() -> LogOptions {
    let mut opts = LogOptions::default();
    if let Ok(dir) = std::env::var("DOCPAGER_LOG_DIR") {
        opts.dir = Some(PathBuf::from(dir));
    }
    if let Ok(level) = std::env::var("DOCPAGER_LOG_LEVEL") {
        opts.level = parse_level(&level);
    }
    if let Some(keep) = std::env::var("DOCPAGER_LOG_RETENTION").ok().and_then(|s| s.parse::<u32>().ok()) {
        opts.retention = keep;
    }
    opts
}
