#![allow(dead_code)]

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use ulog::{
    logging::{MemoryHandle, MemorySink},
    Engine, EngineConfig, LogRecord, SinkRegistry, SinkRole,
};

pub const CLOCK: &str = "2024-01-01T00:00:00.000";
pub const FREE_BYTES: u64 = 1024;

/// Every sink built so far, with the host it was built for.
#[derive(Clone, Default)]
pub struct Builds(Rc<RefCell<Vec<(String, Option<String>)>>>);

impl Builds {
    pub fn hosts(&self, sink: &str) -> Vec<Option<String>> {
        self.0
            .borrow()
            .iter()
            .filter(|(name, _)| name == sink)
            .map(|(_, host)| host.clone())
            .collect()
    }

    pub fn count(&self, sink: &str) -> usize {
        self.hosts(sink).len()
    }
}

/// An engine whose sinks all write to memory. Each configured sink name gets
/// its own kind; a sink with `broken: true` or host `unreachable` fails to
/// build.
pub struct Harness {
    pub engine: Engine,
    pub sinks: BTreeMap<String, MemoryHandle>,
    pub builds: Builds,
}

impl Harness {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_network(config, &[])
    }

    pub fn with_network(config: EngineConfig, network: &[&str]) -> Self {
        let mut registry = SinkRegistry::empty();
        let mut sinks = BTreeMap::new();
        let builds = Builds::default();

        for name in config.sinks.keys() {
            let handle = MemoryHandle::new();
            sinks.insert(name.clone(), handle.clone());

            let role = if network.contains(&name.as_str()) {
                SinkRole::Network
            } else {
                SinkRole::Local
            };

            let builds = builds.clone();
            registry.register(name.clone(), role, move |name, config| {
                if config.get_bool("broken").unwrap_or(false)
                    || config.host.as_deref() == Some("unreachable")
                {
                    return Err(eyre::eyre!("cannot build {}", name));
                }

                builds
                    .0
                    .borrow_mut()
                    .push((name.to_string(), config.host.clone()));
                Ok(Box::new(MemorySink::new(handle.clone(), None)))
            });
        }

        let engine = Engine::builder(config)
            .with_registry(registry)
            .with_clock(|| CLOCK.to_string())
            .with_memory_probe(|| FREE_BYTES)
            .build();

        Self {
            engine,
            sinks,
            builds,
        }
    }

    pub fn records(&self, sink: &str) -> Vec<LogRecord> {
        self.sinks[sink].records()
    }

    pub fn messages(&self, sink: &str) -> Vec<String> {
        self.sinks[sink].messages()
    }

    pub fn clear(&self) {
        for handle in self.sinks.values() {
            handle.clear();
        }
    }
}

pub fn is_gc_message(message: &str) -> bool {
    message
        .strip_prefix("GC MEM Free: ")
        .map_or(false, |n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}
