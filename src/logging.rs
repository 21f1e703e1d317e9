//! Injectable diagnostics sink.
//!
//! A [`Logger`] is a log *target* carried by value: each [`TimeSeries`]
//! and each [`TimeseriesService`] owns one and routes every message through
//! the `log` facade under that target. Nothing here installs a backend; the
//! binary initialises `env_logger`, a library user picks their own.
//!
//! [`TimeSeries`]: crate::TimeSeries
//! [`TimeseriesService`]: crate::TimeseriesService
use std::borrow::Cow;
use std::fmt;

use log::Level;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    target: Cow<'static, str>,
}

impl Logger {
    pub fn new(target: impl Into<Cow<'static, str>>) -> Self {
        Self { target: target.into() }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: self.target.as_ref(), level, "{}", args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new("neuro_ts")
    }
}
