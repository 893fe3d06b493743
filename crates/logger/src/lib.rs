use std::sync::Mutex;

use anyhow::anyhow;

/// Diagnostic sink injected into resolver/tracer operations.
///
/// Absence of a logger (the `()` impl below) silences diagnostics entirely,
/// which is why every caller is expected to thread a `Logger` through rather
/// than calling into a global.
pub trait Logger: Clone {
    fn log(&self, message: impl Into<String>);
    fn warning(&self, message: impl Into<String>) {
        self.log(format!("WARN: {}", message.into()));
    }
    fn debug(&self, message: impl Into<String>) {
        self.log(format!("DEBUG: {}", message.into()));
    }
    fn error(&self, message: impl Into<String>) {
        self.log(format!("ERROR: {}", message.into()));
    }
}

impl<T: Logger> Logger for &T {
    fn log(&self, message: impl Into<String>) {
        (*self).log(message);
    }
}

/// No-op logger: used when the caller hasn't wired up diagnostics.
#[derive(Clone, Copy, Default)]
pub struct NullLogger;
impl Logger for NullLogger {
    fn log(&self, _message: impl Into<String>) {}
    fn warning(&self, _message: impl Into<String>) {}
    fn debug(&self, _message: impl Into<String>) {}
    fn error(&self, _message: impl Into<String>) {}
}

#[derive(Clone)]
pub struct StdioLogger {
    zero_time: std::time::Instant,
}
impl Logger for &StdioLogger {
    fn log(&self, message: impl Into<String>) {
        let delta_time = std::time::Instant::now().duration_since(self.zero_time);
        println!("[{:.04}] {}", delta_time.as_secs_f64(), message.into());
    }
}
impl StdioLogger {
    pub fn new() -> Self {
        Self {
            zero_time: std::time::Instant::now(),
        }
    }
}
impl Default for StdioLogger {
    fn default() -> Self {
        Self::new()
    }
}

pub struct VecLogger {
    logs: Mutex<Vec<String>>,
}

impl Logger for &VecLogger {
    fn log(&self, message: impl Into<String>) {
        self.logs
            .lock()
            .expect("locking the logger array should not fail!")
            .push(message.into());
    }
}
impl VecLogger {
    pub fn new() -> Self {
        Self {
            logs: Mutex::new(Vec::new()),
        }
    }

    pub fn get_logs(self) -> Result<Vec<String>, anyhow::Error> {
        self.logs
            .try_lock()
            .map_err(|err| anyhow!("error unlocking VecLogger logs:{err}"))
            .map(|mut x| x.drain(0..).collect::<Vec<_>>())
    }
}
impl Default for VecLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn vec_logger_collects_warnings_and_debug() {
        let logger = VecLogger::new();
        (&logger).warning("missing package");
        (&logger).debug("cache hit");
        let logs = logger.get_logs().unwrap();
        assert_eq!(logs, vec!["WARN: missing package", "DEBUG: cache hit"]);
    }

    #[test]
    fn null_logger_drops_everything() {
        let logger = NullLogger;
        logger.warning("nope");
        logger.debug("nope");
    }
}
