//! # Logger Capability
//!
//! `mirror-hook` speaks the `log` crate's vocabulary (`Level`, `Record`,
//! `Log`) but never writes through the global `log` facade. Instead every
//! component receives a [`Logger`] handle at construction time. An embedding
//! application passes in whatever `log::Log` implementation it already uses
//! (the binary passes an `env_logger` logger); a component built without one
//! gets [`Logger::default()`], which discards everything.
//!
//! Keeping the sink explicit means two orchestrators in the same process can
//! log to different places, and tests can capture records with
//! [`MemoryLog`] without racing on process-wide state.

use std::fmt;
use std::sync::{Arc, Mutex};

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Target attached to every record emitted by this crate.
pub const LOG_TARGET: &str = "mirror_hook";

/// A cloneable handle to a `log::Log` sink.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn Log>,
}

impl Logger {
    /// Wraps an already shared sink.
    pub fn new(sink: Arc<dyn Log>) -> Self {
        Self { sink }
    }

    /// Wraps an owned sink.
    pub fn from_log<L: Log + 'static>(sink: L) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// A logger that drops every record.
    pub fn noop() -> Self {
        Self::from_log(NopLog)
    }

    /// Emits a record at `level` if the sink accepts it.
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(LOG_TARGET).build();
        if !self.sink.enabled(&metadata) {
            return;
        }
        self.sink.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path_static(Some(module_path!()))
                .build(),
        );
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    /// Flushes any buffered records.
    pub fn flush(&self) {
        self.sink.flush();
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

/// The silent sink behind [`Logger::noop`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NopLog;

impl Log for NopLog {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        false
    }

    fn log(&self, _record: &Record<'_>) {}

    fn flush(&self) {}
}

/// A sink that keeps formatted records in memory.
///
/// Useful for callers that want to attach the log of one delivery to a
/// response body, and for asserting on log output in tests.
#[derive(Debug)]
pub struct MemoryLog {
    max_level: LevelFilter,
    records: Mutex<Vec<(Level, String)>>,
}

impl MemoryLog {
    /// Creates a sink that keeps records at `max_level` and above.
    pub fn new(max_level: LevelFilter) -> Self {
        Self {
            max_level,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of everything recorded so far.
    pub fn records(&self) -> Vec<(Level, String)> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns the messages recorded at exactly `level`.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }

    /// True if any record contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.records().iter().any(|(_, m)| m.contains(needle))
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new(LevelFilter::Trace)
    }
}

impl Log for MemoryLog {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        match self.records.lock() {
            Ok(mut records) => records.push((record.level(), message)),
            Err(poisoned) => poisoned.into_inner().push((record.level(), message)),
        }
    }

    fn flush(&self) {}
}
