//! File logger backing the `log` facade.
//!
//! Appends one line per record to `oriterm_atlas_debug.log` next to the
//! executable. The demo is a windowed app with no console, so stderr is not
//! an option.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

pub fn log_path() -> PathBuf {
    std::env::current_exe()
        .unwrap_or_default()
        .parent()
        .unwrap_or(std::path::Path::new("."))
        .join("oriterm_atlas_debug.log")
}

/// Filtering is left to the facade's max level, which `set_level` moves.
struct FileLogger {
    file: Mutex<File>,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let line = format_line(ts, record);
        let _ = self.file.lock().write_all(line.as_bytes());
    }

    fn flush(&self) {
        let _ = self.file.lock().flush();
    }
}

fn format_line(ts: Duration, record: &Record<'_>) -> String {
    format!(
        "{}.{:03} {:<5} [{}] {}\n",
        ts.as_secs(),
        ts.subsec_millis(),
        record.level(),
        record.target(),
        record.args()
    )
}

/// Install the file logger at `level`. Returns `false` if the log file
/// cannot be opened or another logger is already installed.
pub fn init(level: LevelFilter) -> bool {
    let file = match OpenOptions::new().create(true).append(true).open(log_path()) {
        Ok(f) => f,
        Err(_) => return false,
    };
    let logger = FileLogger {
        file: Mutex::new(file),
    };
    if log::set_boxed_logger(Box::new(logger)).is_err() {
        return false;
    }
    set_level(level);
    true
}

/// Change the level of the installed logger.
pub fn set_level(level: LevelFilter) {
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_lives_next_to_executable() {
        let path = log_path();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("oriterm_atlas_debug.log")
        );
    }

    #[test]
    fn line_carries_time_level_and_target() {
        let record = Record::builder()
            .args(format_args!("atlas 64x64"))
            .level(log::Level::Warn)
            .target("engine")
            .build();
        let line = format_line(Duration::from_millis(12_345), &record);
        assert_eq!(line, "12.345 WARN  [engine] atlas 64x64\n");
    }

    #[test]
    fn set_level_moves_the_filter() {
        let logger = FileLogger {
            file: Mutex::new(tempfile_in_target()),
        };
        let debug = Metadata::builder().level(log::Level::Debug).build();
        set_level(LevelFilter::Warn);
        assert!(!logger.enabled(&debug));
        set_level(LevelFilter::Debug);
        assert!(logger.enabled(&debug));
    }

    fn tempfile_in_target() -> File {
        let path = std::env::temp_dir().join(format!(
            "oriterm_atlas_logging_test_{}.log",
            std::process::id()
        ));
        File::create(path).unwrap()
    }
}
