use thiserror::Error;

/// Failures tied to one sink. None of these escape the engine: they are
/// reported on the diagnostic channel and, for deliveries, collected into the
/// call's `DeliveryReport`.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to load sink {name}: {report}")]
    Load { name: String, report: eyre::Report },

    #[error("failed delivering to sink {name}: {report}")]
    Delivery { name: String, report: eyre::Report },

    #[error("failed to reload sink {name}: {report}")]
    Reload { name: String, report: eyre::Report },

    #[error("failed reading sink {name}: {report}")]
    Read { name: String, report: eyre::Report },
}

impl SinkError {
    pub fn name(&self) -> &str {
        match self {
            SinkError::Load { name, .. }
            | SinkError::Delivery { name, .. }
            | SinkError::Reload { name, .. }
            | SinkError::Read { name, .. } => name,
        }
    }

    pub fn report(&self) -> &eyre::Report {
        match self {
            SinkError::Load { report, .. }
            | SinkError::Delivery { report, .. }
            | SinkError::Reload { report, .. }
            | SinkError::Read { report, .. } => report,
        }
    }

    /// Writes the error and its full trace to the diagnostic channel.
    pub fn emit(&self) {
        log::error!(target: "ulog", "{}", self);
        log::debug!(target: "ulog", "{:?}", self.report());
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed reading config override {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config override: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config override must be a JSON object")]
    NotAnObject,

    /// An override key holds a value of the wrong shape for that field.
    #[error("config override does not fit the defaults: {0}")]
    Merge(#[source] serde_json::Error),
}

/// A message whose arguments failed to render. Returned to the caller of
/// `Engine::log`; it points at a defect at the call site.
#[derive(Error, Debug)]
#[error("failed to format log message")]
pub struct FormatError(#[from] pub std::fmt::Error);
