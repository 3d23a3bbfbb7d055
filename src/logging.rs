use std::sync::Once;

use env_logger::Env;
use log::LevelFilter;

static LOG_ONCE: Once = Once::new();

fn env_level() -> LevelFilter {
    std::env::var("CAPDAC_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .as_deref()
        .and_then(|v| v.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

fn level_to_str(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}

/// Parse a level name, ignoring anything `log` does not recognise.
pub fn parse_level(input: Option<&str>) -> Option<LevelFilter> {
    input.and_then(|s| s.trim().parse::<LevelFilter>().ok())
}

/// Initialize stderr logging from `CAPDAC_LOG`/`RUST_LOG` (default `info`).
pub fn init_logging() {
    init_logging_with(None);
}

/// Initialize stderr logging, preferring `level` over the environment.
/// Only the first call in a process installs a logger.
pub fn init_logging_with(level: Option<&str>) {
    let explicit = parse_level(level);
    LOG_ONCE.call_once(|| {
        let env = Env::new()
            .filter("CAPDAC_LOG")
            .default_filter_or(level_to_str(env_level()));
        let mut builder = env_logger::Builder::from_env(env);
        if let Some(level) = explicit {
            builder.filter_level(level);
        }
        // Another logger may already be installed by a host application.
        let _ = builder
            .format_timestamp_millis()
            .format_module_path(true)
            .format_target(true)
            .try_init();
    });
}
