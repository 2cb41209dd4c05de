// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Logger port handed to pipeline units.

use std::fmt;

use tracing::{debug, error, info, warn};

/// Severity of a unit log message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Verbose diagnostics.
    Debug,
    /// Normal progress.
    Info,
    /// Missing or suspicious data.
    Warn,
    /// Failures.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// Leveled text sink injected into units at construction.
pub trait Logger: Send + Sync {
    /// Records `message` at `level`.
    fn log(&self, level: LogLevel, message: &str);

    /// Shorthand for [`LogLevel::Debug`].
    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Shorthand for [`LogLevel::Info`].
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Shorthand for [`LogLevel::Warn`].
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Shorthand for [`LogLevel::Error`].
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Forwards unit messages to `tracing`, tagged with the unit name.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    unit: String,
}

impl TracingLogger {
    /// Logger for the unit called `unit`.
    pub fn new(unit: impl Into<String>) -> Self {
        Self { unit: unit.into() }
    }

    /// Name attached to every event.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        let unit = self.unit.as_str();
        match level {
            LogLevel::Debug => debug!(unit, "{message}"),
            LogLevel::Info => info!(unit, "{message}"),
            LogLevel::Warn => warn!(unit, "{message}"),
            LogLevel::Error => error!(unit, "{message}"),
        }
    }
}
