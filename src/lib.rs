//! Leveled logging for small devices.
//!
//! An [`Engine`] takes log calls, drops the ones whose level is disabled and
//! hands the rest to every configured sink whose threshold admits them. Sinks
//! fail independently, and the engine can retarget its network sink or change
//! a sink's threshold while running.
//!
//! ```no_run
//! use ulog::{ulog_info, Engine, EngineConfig};
//!
//! let mut log = Engine::new(EngineConfig::default());
//! ulog_info!(log, "pump {} started", 3).unwrap();
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod level;
pub mod logging;
pub mod memory;
pub mod policy;
pub mod record;
pub mod registry;

pub use clock::{Clock, LocalClock};
pub use config::{build_config, merge, EngineConfig, JsonFile, OverrideSource, SinkConfig};
pub use engine::{DeliveryReport, Engine, SinkDelivery};
pub use error::{ConfigError, FormatError, SinkError};
pub use level::Level;
pub use logging::{LogFormatter, LogSink};
pub use memory::{MemoryProbe, SystemMemory};
pub use record::LogRecord;
pub use registry::{SinkRegistry, SinkRole};

#[macro_export]
macro_rules! ulog_debug {
    ($engine:expr, $($arg:tt)+) => {
        $engine.debug(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! ulog_info {
    ($engine:expr, $($arg:tt)+) => {
        $engine.info(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! ulog_warning {
    ($engine:expr, $($arg:tt)+) => {
        $engine.warning(::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! ulog_error {
    ($engine:expr, $($arg:tt)+) => {
        $engine.error(::std::format_args!($($arg)+))
    };
}
