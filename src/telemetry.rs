use crate::config::AppConfig;
use std::fs::OpenOptions;
use std::sync::OnceLock;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

pub(crate) fn level_filter(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "error" => LevelFilter::ERROR,
        "warn" => LevelFilter::WARN,
        "debug" => LevelFilter::DEBUG,
        "trace" => LevelFilter::TRACE,
        _ => LevelFilter::INFO,
    }
}

/// Install the global subscriber once. Human-readable lines go to stderr unless
/// `--log-file` asks for JSON lines on disk.
pub fn init_tracing(config: &AppConfig) {
    if config.no_logs {
        return;
    }

    let _ = TRACING_INIT.get_or_init(|| {
        let level = level_filter(&config.log_level);
        match config.log_file.as_ref() {
            Some(path) => {
                let file = match OpenOptions::new().create(true).append(true).open(path) {
                    Ok(file) => file,
                    Err(err) => {
                        eprintln!("hark: cannot open log file {}: {err}", path.display());
                        return;
                    }
                };
                let subscriber = tracing_subscriber::fmt()
                    .json()
                    .with_timer(UtcTime::rfc_3339())
                    .with_max_level(level)
                    .with_writer(file)
                    .with_current_span(false)
                    .with_span_list(false)
                    .finish();
                let _ = tracing::subscriber::set_global_default(subscriber);
            }
            None => {
                let subscriber = tracing_subscriber::fmt()
                    .with_timer(UtcTime::rfc_3339())
                    .with_max_level(level)
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .finish();
                let _ = tracing::subscriber::set_global_default(subscriber);
            }
        }
    });
}
