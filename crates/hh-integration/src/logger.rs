//! Core log lines as tracing events

use hh_libretro::{LogLevel, Logger};

/// Forwards everything to `tracing` under the `core` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        // Cores usually terminate their lines themselves
        let message = message.trim_end();

        match level {
            LogLevel::Debug => tracing::debug!(target: "core", "{}", message),
            LogLevel::Info => tracing::info!(target: "core", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "core", "{}", message),
            LogLevel::Error => tracing::error!(target: "core", "{}", message),
        }
    }
}
