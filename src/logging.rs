// src/logging.rs
//! Logging setup and the per-component logger handed to collectors.
//!
//! `init` builds a `fern` dispatcher from the `[logging]` table. The resulting
//! sink is returned as an `Arc<dyn Log>` so it can be injected into each
//! collector, and a thin forwarder is installed as the global `log` backend so
//! ordinary `log::info!` calls end up in the same place.
//!
//! Lines look like:
//! `[2025-04-25T16:32:10+02:00][INFO ][collector::profile][pid=4568][tid=ThreadId(3)] started`

use chrono::Local;
use fern::Dispatch;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::{fmt, fs, process, sync::Arc, thread};

use crate::config::model::LoggingConfig;

/// Parse a textual level from config; unknown values fall back to INFO.
pub fn level_filter(level: &str) -> LevelFilter {
    match level.to_uppercase().as_str() {
        "OFF"   => LevelFilter::Off,
        "ERROR" => LevelFilter::Error,
        "WARN"  => LevelFilter::Warn,
        "DEBUG" => LevelFilter::Debug,
        "TRACE" => LevelFilter::Trace,
        _       => LevelFilter::Info,
    }
}

/// Build the dispatcher and install it globally.
///
/// Returns the sink so callers can inject it into components explicitly.
pub fn init(cfg: &LoggingConfig) -> Result<Arc<dyn Log>, fern::InitError> {
    let level = level_filter(&cfg.level);

    let mut dispatch = Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!(
                "[{}][{:5}][{}][pid={}][tid={:?}] {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                process::id(),
                thread::current().id(),
                msg
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if cfg.enable {
        let path = cfg.file_path();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    let (max_level, logger) = dispatch.into_log();
    let sink: Arc<dyn Log> = Arc::from(logger);

    log::set_boxed_logger(Box::new(Forward(Arc::clone(&sink))))?;
    log::set_max_level(max_level);
    Ok(sink)
}

/// Global backend that hands every record to the shared sink.
struct Forward(Arc<dyn Log>);

impl Log for Forward {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.0.enabled(metadata)
    }
    fn log(&self, record: &Record) {
        self.0.log(record)
    }
    fn flush(&self) {
        self.0.flush()
    }
}

/// Logging capability owned by one component (usually one collector).
///
/// Records are written straight to the injected sink with the component name
/// as target, so nothing here depends on process-wide logger state.
#[derive(Clone)]
pub struct ComponentLogger {
    sink:      Arc<dyn Log>,
    component: String,
}

impl ComponentLogger {
    pub fn new(sink: Arc<dyn Log>, component: impl Into<String>) -> Self {
        Self { sink, component: component.into() }
    }

    /// Logger that forwards to whatever global backend is installed.
    pub fn global(component: impl Into<String>) -> Self {
        Self::new(Arc::new(GlobalSink), component)
    }

    /// Same sink, different component name.
    pub fn child(&self, component: impl Into<String>) -> Self {
        Self::new(Arc::clone(&self.sink), component)
    }

    pub fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder()
            .level(level)
            .target(&self.component)
            .build();
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
}

impl fmt::Debug for ComponentLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentLogger")
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}

/// Adapter over `log::logger()`.
struct GlobalSink;

impl Log for GlobalSink {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && log::logger().enabled(metadata)
    }
    fn log(&self, record: &Record) {
        log::logger().log(record)
    }
    fn flush(&self) {
        log::logger().flush()
    }
}

/// Log through a [`ComponentLogger`].
///
/// ```rust,ignore
/// agent_log!(self.log, Level::Info, "started (pid={})", pid);
/// ```
#[macro_export]
macro_rules! agent_log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.emit($level, format_args!($($arg)+))
    };
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// A tiny in-memory sink that captures up to DEBUG.
    #[derive(Default)]
    pub(crate) struct MemoryLogger {
        buffer: Mutex<Vec<String>>,
    }

    impl MemoryLogger {
        pub(crate) fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.buffer.lock().unwrap())
        }
    }

    impl Log for MemoryLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= Level::Debug
        }
        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                self.buffer.lock().unwrap().push(format!(
                    "[{}][{}] {}",
                    record.level(),
                    record.target(),
                    record.args()
                ));
            }
        }
        fn flush(&self) {}
    }

    #[test]
    fn component_logger_writes_to_injected_sink() {
        let sink = Arc::new(MemoryLogger::default());
        let log = ComponentLogger::new(sink.clone(), "collector::syscount");

        agent_log!(log, Level::Info, "Answer={}!", 42);
        agent_log!(log, Level::Trace, "filtered out");

        let lines = sink.take();
        assert_eq!(lines, vec!["[INFO][collector::syscount] Answer=42!".to_string()]);
    }

    #[test]
    fn child_keeps_sink_but_renames_target() {
        let sink = Arc::new(MemoryLogger::default());
        let parent = ComponentLogger::new(sink.clone(), "pipeline");
        let child = parent.child("pipeline::tcplife");

        agent_log!(child, Level::Warn, "hello");
        assert_eq!(sink.take(), vec!["[WARN][pipeline::tcplife] hello".to_string()]);
    }

    #[test]
    fn level_filter_defaults_to_info() {
        assert_eq!(level_filter("debug"), LevelFilter::Debug);
        assert_eq!(level_filter("bogus"), LevelFilter::Info);
    }
}
