use std::collections::BTreeMap;

use crate::{
    config::SinkConfig,
    error::SinkError,
    logging::{ConsoleSink, FileSink, LogSink, MemorySink, NullSink, SyslogSink},
};

/// Live sink instances keyed by sink name. Dispatch walks them in key order.
pub type Sinks = BTreeMap<String, Box<dyn LogSink>>;

type Constructor = Box<dyn Fn(&str, &SinkConfig) -> eyre::Result<Box<dyn LogSink>>>;

/// How host changes treat a sink kind. `Network` sinks are the ones
/// `Engine::change_host` retargets and reloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkRole {
    Local,
    Network,
}

struct Factory {
    role: SinkRole,
    constructor: Constructor,
}

/// Table of sink kinds and how to build them. A sink's kind is its config's
/// `kind` field, or its name when that is absent.
pub struct SinkRegistry {
    factories: BTreeMap<String, Factory>,
}

impl SinkRegistry {
    /// A registry with no kinds at all.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// The built-in kinds: `console`, `file`, `log`, `memory`, `null` and the
    /// network kind `syslog`.
    pub fn new() -> Self {
        Self::empty()
            .with("console", SinkRole::Local, |_, config| {
                Ok(Box::new(ConsoleSink::from_config(config)?))
            })
            .with("file", SinkRole::Local, |name, config| {
                Ok(Box::new(FileSink::from_config(name, config)?))
            })
            .with("log", SinkRole::Local, |name, config| {
                Ok(Box::new(FileSink::records_from_config(name, config)?))
            })
            .with("memory", SinkRole::Local, |_, config| {
                Ok(Box::new(MemorySink::from_config(config)))
            })
            .with("null", SinkRole::Local, |_, _| Ok(Box::new(NullSink::new())))
            .with("syslog", SinkRole::Network, |_, config| {
                Ok(Box::new(SyslogSink::from_config(config)?))
            })
    }

    /// Adds or replaces the factory for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, role: SinkRole, constructor: F)
    where
        F: Fn(&str, &SinkConfig) -> eyre::Result<Box<dyn LogSink>> + 'static,
    {
        self.factories.insert(
            kind.into(),
            Factory {
                role,
                constructor: Box::new(constructor),
            },
        );
    }

    pub fn with<F>(mut self, kind: impl Into<String>, role: SinkRole, constructor: F) -> Self
    where
        F: Fn(&str, &SinkConfig) -> eyre::Result<Box<dyn LogSink>> + 'static,
    {
        self.register(kind, role, constructor);
        self
    }

    pub fn role_of(&self, name: &str, config: &SinkConfig) -> Option<SinkRole> {
        self.factories
            .get(config.kind_or(name))
            .map(|factory| factory.role)
    }

    pub fn build(&self, name: &str, config: &SinkConfig) -> eyre::Result<Box<dyn LogSink>> {
        let kind = config.kind_or(name);
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| eyre::eyre!("No sink kind named {}", kind))?;

        (factory.constructor)(name, config)
    }

    /// Builds every configured sink. A sink that fails to build is reported
    /// and left out; the rest still load.
    pub fn load(&self, configs: &BTreeMap<String, SinkConfig>) -> Sinks {
        let mut sinks = Sinks::new();

        for (name, config) in configs {
            match self.build(name, config) {
                Ok(sink) => {
                    if config.threshold <= 1 {
                        log::debug!(target: "ulog", "loaded sink {}", name);
                    }
                    sinks.insert(name.clone(), sink);
                }
                Err(report) => SinkError::Load {
                    name: name.clone(),
                    report: report.wrap_err(format!("config {:?}", config)),
                }
                .emit(),
            }
        }

        sinks
    }

    /// Throws away `previous` before building a replacement from `config`, so
    /// the old instance never outlives a failed reload.
    pub fn reload(
        &self,
        name: &str,
        config: &SinkConfig,
        previous: Option<Box<dyn LogSink>>,
    ) -> Result<Box<dyn LogSink>, SinkError> {
        if let Some(mut previous) = previous {
            previous.flush();
        }

        self.build(name, config).map_err(|report| SinkError::Reload {
            name: name.to_string(),
            report,
        })
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use crate::record::LogRecord;

    use super::*;

    fn flaky_registry() -> SinkRegistry {
        SinkRegistry::empty().with("flaky", SinkRole::Local, |_, config| {
            if config.get_bool("broken").unwrap_or(false) {
                Err(eyre::eyre!("refusing to start"))
            } else {
                Ok(Box::new(NullSink::new()))
            }
        })
    }

    #[test]
    fn load_skips_sinks_that_fail_to_build() {
        let configs = BTreeMap::from([
            ("a".to_string(), SinkConfig::new(1).with_kind("flaky")),
            (
                "b".to_string(),
                SinkConfig::new(1).with_kind("flaky").with("broken", true),
            ),
        ]);

        let sinks = flaky_registry().load(&configs);

        assert_eq!(sinks.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn load_skips_unknown_kinds() {
        let configs = BTreeMap::from([
            ("a".to_string(), SinkConfig::new(1).with_kind("flaky")),
            ("teletype".to_string(), SinkConfig::new(1)),
        ]);

        let sinks = flaky_registry().load(&configs);

        assert!(sinks.contains_key("a"));
        assert!(!sinks.contains_key("teletype"));
    }

    #[test]
    fn kind_defaults_to_sink_name() {
        let registry = SinkRegistry::new();

        assert_eq!(
            registry.role_of("syslog", &SinkConfig::new(1)),
            Some(SinkRole::Network)
        );
        assert_eq!(
            registry.role_of("remote", &SinkConfig::new(1).with_kind("syslog")),
            Some(SinkRole::Network)
        );
        assert_eq!(
            registry.role_of("console", &SinkConfig::new(1)),
            Some(SinkRole::Local)
        );
        assert_eq!(registry.role_of("teletype", &SinkConfig::new(1)), None);
    }

    #[test]
    fn reload_drops_previous_before_building() {
        struct Tracked(Rc<Cell<u32>>);

        impl LogSink for Tracked {
            fn write_log(&mut self, _record: &LogRecord) -> eyre::Result<()> {
                Ok(())
            }
        }

        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let dropped = Rc::new(Cell::new(0));
        let seen = dropped.clone();
        let registry = SinkRegistry::empty().with("tracked", SinkRole::Network, move |_, _| {
            assert_eq!(seen.get(), 1, "previous instance still alive");
            Err(eyre::eyre!("host unreachable"))
        });

        let previous: Box<dyn LogSink> = Box::new(Tracked(dropped.clone()));
        let result = registry.reload("tracked", &SinkConfig::new(1), Some(previous));

        assert!(matches!(result, Err(SinkError::Reload { .. })));
        assert_eq!(dropped.get(), 1);
    }
}
