use std::sync::{Mutex, PoisonError};

use eyre::Context;
use log::{LevelFilter, Log};

use crate::{
    clock::{Clock, LocalClock},
    level::Level,
    record::LogRecord,
};

use super::{
    formatters::DefaultFormatter,
    sinks::{ConsoleSink, FileSink, NullSink, Stream},
    LogFormatter, LogSink,
};

/// Process-wide `log` backend. The engine reports load, delivery and reload
/// failures through the `log` facade; a host installs this to see them.
pub struct Logger {
    filter: LevelFilter,
    sink: Mutex<Box<dyn LogSink + Send>>,
    clock: LocalClock,
}

impl Logger {
    pub fn new(filter: LevelFilter, sink: Box<dyn LogSink + Send>) -> Self {
        Self {
            filter,
            sink: Mutex::new(sink),
            clock: LocalClock::new(),
        }
    }

    pub fn init(self) -> eyre::Result<()> {
        log::set_max_level(self.filter);
        log::set_boxed_logger(Box::new(self)).context("Failed registering boxed logger")?;

        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.filter >= metadata.level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = match record.level() {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warning,
            log::Level::Info => Level::Info,
            log::Level::Debug | log::Level::Trace => Level::Debug,
        };
        let entry = LogRecord::new(
            record.target(),
            self.clock.timestamp(),
            level,
            record.args().to_string(),
        );

        // A panic while writing leaves the sink usable.
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = sink.write_log(&entry) {
            eprintln!("ulog: diagnostic output failed: {}", err);
        }
    }

    fn flush(&self) {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}

type Constructor =
    Box<dyn Fn(Box<dyn LogFormatter + 'static>) -> eyre::Result<Box<dyn LogSink + Send>>>;

pub struct Builder {
    filter: LevelFilter,
    constructor: Constructor,
    use_ansi: bool,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            filter: LevelFilter::Off,
            constructor: Box::new(|_| Ok(Box::new(NullSink::new()))),
            use_ansi: true,
        }
    }

    pub fn with_level(self, filter: LevelFilter) -> Self {
        Self { filter, ..self }
    }

    pub fn with_ansi(self, use_ansi: bool) -> Self {
        Self { use_ansi, ..self }
    }

    pub fn with_file_sink(self, path: impl Into<String>) -> Self {
        let path: String = path.into();
        Self {
            constructor: Box::new(move |formatter| {
                let sink = FileSink::new(&path, formatter)?;
                Ok(Box::new(sink))
            }),
            ..self
        }
    }

    pub fn with_stderr_sink(self) -> Self {
        Self {
            constructor: Box::new(move |formatter| {
                let sink = ConsoleSink::new(Stream::Stderr, formatter);
                Ok(Box::new(sink))
            }),
            ..self
        }
    }

    pub fn build(&self) -> eyre::Result<Logger> {
        let formatter = Box::new(DefaultFormatter::new(self.use_ansi));
        let sink = (self.constructor)(formatter)?;
        Ok(Logger::new(self.filter, sink))
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backed_logger_writes_enabled_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.log");

        let logger = Builder::new()
            .with_level(LevelFilter::Warn)
            .with_ansi(false)
            .with_file_sink(path.to_str().unwrap())
            .build()
            .unwrap();

        logger.log(
            &log::Record::builder()
                .target("ulog")
                .level(log::Level::Error)
                .args(format_args!("sink {} is gone", "syslog"))
                .build(),
        );
        logger.log(
            &log::Record::builder()
                .target("ulog")
                .level(log::Level::Debug)
                .args(format_args!("too chatty"))
                .build(),
        );
        logger.flush();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("ulog ERR: sink syslog is gone"));
        assert!(!contents.contains("too chatty"));
    }

    #[test]
    fn logger_keeps_writing_after_a_panicking_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.log");
        let logger = Builder::new()
            .with_level(LevelFilter::Info)
            .with_ansi(false)
            .with_file_sink(path.to_str().unwrap())
            .build()
            .unwrap();

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = logger.sink.lock().unwrap();
            panic!("writer blew up");
        }));
        assert!(logger.sink.is_poisoned());

        logger.log(
            &log::Record::builder()
                .target("ulog")
                .level(log::Level::Warn)
                .args(format_args!("still here"))
                .build(),
        );
        logger.flush();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("ulog WRN: still here"));
    }

    #[test]
    fn default_builder_discards_everything() {
        let logger = Builder::new().build().unwrap();
        assert!(!logger.enabled(&log::Metadata::builder().level(log::Level::Error).build()));
    }
}
