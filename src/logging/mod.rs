mod formatters;
mod logger;
mod sinks;
mod syslog;

pub use formatters::{DefaultFormatter, JsonFormatter};
pub use logger::{Builder, Logger};
pub use sinks::{ConsoleSink, FileSink, MemoryHandle, MemorySink, NullSink, Stream};
pub use syslog::{SyslogFacility, SyslogSink, DEFAULT_SYSLOG_PORT};

use crate::record::LogRecord;

pub trait LogFormatter: Sync + Send {
    fn format(&self, record: &LogRecord) -> String;
}

/// A destination for log records.
pub trait LogSink {
    fn write_log(&mut self, record: &LogRecord) -> eyre::Result<()>;

    fn flush(&mut self) {}

    /// Records previously written to this sink, for sinks that keep them.
    fn read_all(&self) -> Option<eyre::Result<Vec<LogRecord>>> {
        None
    }
}
