use clap::Parser;
use docpager::cli::{self, Args};
use docpager::logger;
use std::process::ExitCode;

/// Loads `.env` so its variables act as configuration defaults.
fn load_dotenv() {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        eprintln!("Warning: failed to load .env file: {err}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    let args = Args::parse();
    let cfg = match args.resolve_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("docpager: {e}");
            return ExitCode::from(2);
        }
    };

    let mut log_opts = logger::options_from_env();
    if let Some(level) = &args.log_level {
        log_opts.level = logger::parse_level(level);
    }
    log_opts.log_commands = cfg.log_commands;
    if let Err(e) = logger::init(&log_opts) {
        eprintln!("Warning: failed to configure logging: {e}");
    }
    log::debug!("resolved configuration: {cfg:?}");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli::run(&args, &cfg, &mut out).await {
        Ok(report) => {
            log::info!(
                "printed {} page(s), {} record(s); last id {}; exhausted={}",
                report.pages,
                report.records,
                report.last_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                report.exhausted
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("pagination failed: {e}");
            eprintln!("docpager: {e}");
            ExitCode::FAILURE
        }
    }
}
