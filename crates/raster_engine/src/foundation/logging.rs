//! Logging utilities and structured logging support

use std::sync::Once;

pub use log::{debug, info, warn, error, trace};

use crate::core::config::LoggingConfig;

static INIT: Once = Once::new();

/// Initialize the logging system
///
/// Filter precedence: the config's `filter`, then `RUST_LOG`, then the
/// config's `level` (`info` when unparsable). Subsequent calls are ignored.
pub fn init(config: &LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = &config.filter {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            let level = config.level.parse().unwrap_or(log::LevelFilter::Info);
            builder.filter_level(level);
        }

        if config.timestamps {
            builder.format_timestamp_millis();
        } else {
            builder.format_timestamp(None);
        }

        // A test harness may already have installed a logger
        if builder.try_init().is_ok() {
            log::debug!("Logging initialized");
        }
    });
}
