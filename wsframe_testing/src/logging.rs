//! Shared log capture for tests asserting on `log` output.

use std::sync::{Mutex, MutexGuard, OnceLock};

use logtest::{Logger, Record};
use rstest::fixture;

/// Handle to the global logger with exclusive access.
///
/// `logtest` installs a process-wide logger, so tests capturing output must
/// take turns; the guard serialises them.
pub struct LoggerHandle {
    guard: MutexGuard<'static, Logger>,
}

impl LoggerHandle {
    /// Acquire the global [`Logger`] and discard anything already captured.
    ///
    /// # Panics
    ///
    /// Panics if a previous holder panicked while holding the lock.
    #[must_use]
    pub fn new() -> Self {
        static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

        let logger = LOGGER.get_or_init(|| Mutex::new(Logger::start()));
        let mut guard = logger.lock().expect("logger poisoned");
        while guard.pop().is_some() {}

        Self { guard }
    }

    /// Drain captured records at `level` whose message contains `needle`.
    pub fn drain_matching(&mut self, level: log::Level, needle: &str) -> Vec<Record> {
        let mut found = Vec::new();
        while let Some(record) = self.guard.pop() {
            if record.level() == level && record.args().contains(needle) {
                found.push(record);
            }
        }
        found
    }
}

impl Default for LoggerHandle {
    fn default() -> Self { Self::new() }
}

impl std::ops::Deref for LoggerHandle {
    type Target = Logger;

    fn deref(&self) -> &Self::Target { &self.guard }
}

impl std::ops::DerefMut for LoggerHandle {
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.guard }
}

#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn logger() -> LoggerHandle { LoggerHandle::new() }
