/// Canonical timestamp layout, `YYYY-MM-DDTHH:MM:SS.mmm`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Source of record timestamps. A hardware clock installed through
/// `Engine::change_hal` implements this too and takes over formatting entirely.
pub trait Clock {
    fn timestamp(&self) -> String;
}

/// Reads the local wall clock of the host.
#[derive(Debug, Default, Clone)]
pub struct LocalClock {}

impl LocalClock {
    pub fn new() -> Self {
        Self {}
    }
}

impl Clock for LocalClock {
    fn timestamp(&self) -> String {
        chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

impl<F> Clock for F
where
    F: Fn() -> String,
{
    fn timestamp(&self) -> String {
        self()
    }
}
