//! `log` backend that buffers records for the console pane.
//!
//! The terminal owns stdout, so records are queued here and drained into
//! [`crate::state::AppState`] once per tick. The report binary drains them
//! to stderr instead.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use log::{Level, LevelFilter, Log, Metadata, Record};

const CAPACITY: usize = 200;

struct ConsoleLogger {
    lines: Mutex<VecDeque<String>>,
}

static LOGGER: ConsoleLogger = ConsoleLogger {
    lines: Mutex::new(VecDeque::new()),
};

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug | Level::Trace => "DEBUG",
        };
        let line = format!("[{tag}] {}", record.args());
        if let Ok(mut lines) = self.lines.lock() {
            if lines.len() >= CAPACITY {
                lines.pop_front();
            }
            lines.push_back(line);
        }
    }

    fn flush(&self) {}
}

/// Install the console logger. Fails if another logger is already set.
pub fn init(level: LevelFilter) -> Result<()> {
    log::set_logger(&LOGGER).map_err(|err| anyhow!("install logger: {err}"))?;
    log::set_max_level(level);
    Ok(())
}

/// Take every buffered line, oldest first.
pub fn drain() -> Vec<String> {
    match LOGGER.lines.lock() {
        Ok(mut lines) => lines.drain(..).collect(),
        Err(_) => Vec::new(),
    }
}

pub fn parse_level(raw: &str) -> Option<LevelFilter> {
    match raw.trim().to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse() {
        assert_eq!(parse_level(" Debug "), Some(LevelFilter::Debug));
        assert_eq!(parse_level("warning"), Some(LevelFilter::Warn));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn records_reach_the_buffer() {
        let _ = init(LevelFilter::Debug);
        log::set_max_level(LevelFilter::Debug);
        log::debug!("flush skipped for match 42");
        let lines = drain();
        assert!(lines.iter().any(|l| l == "[DEBUG] flush skipped for match 42"));
    }
}
