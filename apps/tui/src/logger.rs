use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared buffer of log lines for the log panel.
#[derive(Clone, Debug)]
pub struct ConsoleLog {
    buffer: Arc<Mutex<VecDeque<(Level, String)>>>,
    max_lines: usize,
}

impl ConsoleLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::new())),
            max_lines,
        }
    }

    pub fn push(&self, level: Level, msg: String) {
        let mut buf = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        if buf.len() >= self.max_lines {
            buf.pop_front();
        }
        buf.push_back((level, msg));
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

struct PanelLogger {
    console: ConsoleLog,
    level: LevelFilter,
}

impl log::Log for PanelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            self.console.push(record.level(), format!("{}", record.args()));
        }
    }

    fn flush(&self) {}
}

/// Installs the panel logger. Nothing is written to the terminal; the UI reads
/// the returned buffer.
pub fn init(level: LevelFilter) -> Result<ConsoleLog, SetLoggerError> {
    let console = ConsoleLog::new(50);
    let logger: &'static PanelLogger = Box::leak(Box::new(PanelLogger {
        console: console.clone(),
        level,
    }));

    log::set_logger(logger)?;
    log::set_max_level(level);

    Ok(console)
}

/// Headless runs log to stderr through `env_logger`.
pub fn init_headless(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_newest_lines() {
        let console = ConsoleLog::new(2);
        console.push(Level::Info, "one".to_string());
        console.push(Level::Warn, "two".to_string());
        console.push(Level::Error, "three".to_string());

        let lines = console.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (Level::Warn, "two".to_string()));
        assert_eq!(lines[1], (Level::Error, "three".to_string()));
    }
}
