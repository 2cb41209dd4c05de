// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Logger doubles.

use ampel_base::{LogLevel, Logger};
use std::sync::{Arc, Mutex, MutexGuard, Once};

/// Keeps every message for later assertions. Clones share the record.
#[derive(Clone, Default)]
pub struct RecordingLogger {
    records: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl RecordingLogger {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorder as the trait object units receive.
    pub fn shared(&self) -> Arc<dyn Logger> {
        Arc::new(self.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(LogLevel, String)>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Every `(level, message)` pair in emission order.
    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.lock().clone()
    }

    /// Messages logged at `level`.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Whether any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lock().iter().any(|(_, m)| m.contains(needle))
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.lock().push((level, message.to_owned()));
    }
}

static TRACING: Once = Once::new();

/// Installs a `tracing` subscriber writing through the test harness, once
/// per process.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}
