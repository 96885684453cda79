use log::LevelFilter;

use crate::config::settings::Logger;

pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// ECS JSON logger at the configured level. Directives in `rust_log` are
/// applied on top, so `RUST_LOG` can still raise or lower single modules.
fn build_logger(logger: Option<&Logger>, rust_log: Option<&str>) -> env_logger::Builder {
    let log_level = parse_level(logger.map(|l| l.level.as_str()).unwrap_or("info"));

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log_level)
        .format_timestamp_micros()
        .format(ecs_logger::format)
        .target(env_logger::Target::Stdout);
    if let Some(filters) = rust_log {
        builder.parse_filters(filters);
    }
    builder
}

pub fn setup_logger(logger: Option<&Logger>) {
    let rust_log = std::env::var("RUST_LOG").ok();
    if let Err(e) = build_logger(logger, rust_log.as_deref()).try_init() {
        eprintln!("logger already initialized: {e}");
    }
}
