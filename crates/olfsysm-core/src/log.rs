//! Run Logger
//!
//! Line-oriented, append-mode file sink shared by all worker threads of a run.
//! Output is off until [`Logger::redirect`] names a destination, and can be
//! switched off again with [`Logger::disable`]. Every message is also mirrored
//! to `tracing` at debug level.
//!
//! `Logger` is deliberately not `Clone`: two owners of one open sink would
//! interleave partial writes.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Thread-safe, redirectable message sink.
#[derive(Debug, Default)]
pub struct Logger {
    sink: Mutex<Option<File>>,
}

impl Logger {
    /// Create a disabled logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin appending output to the file at `path`, replacing any previous sink.
    pub fn redirect(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path.as_ref())?;
        *self.lock() = Some(file);
        tracing::debug!(target: "olfsysm::log", "run log redirected to {}", path.as_ref().display());
        Ok(())
    }

    /// Shut off output.
    pub fn disable(&self) {
        *self.lock() = None;
    }

    /// Whether a destination is currently set.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.lock().is_some()
    }

    /// Log one message as a single line.
    pub fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::debug!(target: "olfsysm::log", "{}", message);

        let mut sink = self.lock();
        if let Some(file) = sink.as_mut() {
            if let Err(e) = writeln!(file, "{}", message).and_then(|()| file.flush()) {
                tracing::warn!(target: "olfsysm::log", "run log write failed: {}", e);
            }
        }
    }

    /// Log a blank line.
    pub fn blank(&self) {
        self.log("");
    }

    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        // a panic while holding the lock cannot leave the Option half-written
        self.sink.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let log = Logger::new();
        assert!(!log.is_enabled());
        log.log("goes nowhere");
    }

    #[test]
    fn test_redirect_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        std::fs::write(&path, "existing\n").unwrap();

        let log = Logger::new();
        log.redirect(&path).unwrap();
        assert!(log.is_enabled());
        log.log("first");
        log.blank();
        log.log("second");

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "existing\nfirst\n\nsecond\n");
    }

    #[test]
    fn test_disable_stops_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");

        let log = Logger::new();
        log.redirect(&path).unwrap();
        log.log("kept");
        log.disable();
        log.log("dropped");

        assert!(!log.is_enabled());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "kept\n");
    }

    #[test]
    fn test_concurrent_lines_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let log = Arc::new(Logger::new());
        log.redirect(&path).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|id| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..50 {
                        log.log(format!("worker {} line {}", id, i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 200);
        assert!(lines.iter().all(|l| l.starts_with("worker ")));
    }

    #[test]
    fn test_redirect_bad_path() {
        let log = Logger::new();
        assert!(log.redirect("/nonexistent/dir/run.log").is_err());
        assert!(!log.is_enabled());
    }
}
