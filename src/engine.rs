use std::fmt::{self, Debug};

use crate::{
    clock::{Clock, LocalClock},
    config::EngineConfig,
    error::{FormatError, SinkError},
    level::Level,
    logging::LogSink,
    memory::{MemoryProbe, SystemMemory},
    policy::{self, Verdict},
    record::LogRecord,
    registry::{SinkRegistry, SinkRole, Sinks},
};

/// Name of the sink `Engine::read_log` reads from.
pub const LOG_SINK: &str = "log";

pub const GC_MESSAGE_PREFIX: &str = "GC MEM Free: ";

/// Outcome of one sink's share of a log call.
#[derive(Debug)]
pub struct SinkDelivery {
    sink: String,
    record: Result<(), SinkError>,
    diagnostic: Option<Result<(), SinkError>>,
}

impl SinkDelivery {
    pub fn sink(&self) -> &str {
        &self.sink
    }

    pub fn record(&self) -> &Result<(), SinkError> {
        &self.record
    }

    /// Set only for threshold-0 sinks.
    pub fn diagnostic(&self) -> Option<&Result<(), SinkError>> {
        self.diagnostic.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.record.is_ok() && self.diagnostic.as_ref().map_or(true, Result::is_ok)
    }
}

/// What happened to one log call, sink by sink, in dispatch order.
#[derive(Debug)]
pub struct DeliveryReport {
    level: Level,
    accepted: bool,
    deliveries: Vec<SinkDelivery>,
}

impl DeliveryReport {
    fn rejected(level: Level) -> Self {
        Self {
            level,
            accepted: false,
            deliveries: Vec::new(),
        }
    }

    fn accepted(level: Level) -> Self {
        Self {
            level,
            accepted: true,
            deliveries: Vec::new(),
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// False when the level is not enabled; nothing was built or sent.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub fn deliveries(&self) -> &[SinkDelivery] {
        &self.deliveries
    }

    /// Sinks a delivery was attempted on, successful or not.
    pub fn attempted(&self) -> Vec<&str> {
        self.deliveries.iter().map(|d| d.sink()).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SinkError> {
        self.deliveries.iter().flat_map(|d| {
            d.record
                .as_ref()
                .err()
                .into_iter()
                .chain(d.diagnostic.as_ref().and_then(|r| r.as_ref().err()))
        })
    }

    pub fn is_clean(&self) -> bool {
        self.deliveries.iter().all(SinkDelivery::is_ok)
    }
}

/// Leveled logging front end. Owns its configuration and the live sinks, and
/// fans each accepted message out to every sink whose threshold admits it.
///
/// The engine does no locking. Callers sharing one across threads must
/// serialize access themselves.
pub struct Engine {
    config: EngineConfig,
    registry: SinkRegistry,
    sinks: Sinks,
    clock: Box<dyn Clock>,
    hal: Option<Box<dyn Clock>>,
    memory: Box<dyn MemoryProbe>,
}

impl Engine {
    /// Loads the configured sinks with the built-in registry.
    pub fn new(config: EngineConfig) -> Self {
        Builder::new(config).build()
    }

    pub fn builder(config: EngineConfig) -> Builder {
        Builder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_loaded(&self, sink: &str) -> bool {
        self.sinks.contains_key(sink)
    }

    pub fn loaded_sinks(&self) -> Vec<&str> {
        self.sinks.keys().map(String::as_str).collect()
    }

    pub fn timestamp(&self) -> String {
        stamp(&self.hal, &*self.clock)
    }

    pub fn debug(&mut self, args: fmt::Arguments<'_>) -> Result<DeliveryReport, FormatError> {
        self.log(Level::Debug, args)
    }

    pub fn info(&mut self, args: fmt::Arguments<'_>) -> Result<DeliveryReport, FormatError> {
        self.log(Level::Info, args)
    }

    pub fn warning(&mut self, args: fmt::Arguments<'_>) -> Result<DeliveryReport, FormatError> {
        self.log(Level::Warning, args)
    }

    pub fn error(&mut self, args: fmt::Arguments<'_>) -> Result<DeliveryReport, FormatError> {
        self.log(Level::Error, args)
    }

    /// Renders `args` into a record and delivers it to every loaded sink whose
    /// current threshold admits `level`. Sink failures land in the report;
    /// only a failure to render the message is returned as an error.
    pub fn log(
        &mut self,
        level: Level,
        args: fmt::Arguments<'_>,
    ) -> Result<DeliveryReport, FormatError> {
        if !policy::level_enabled(&self.config.levels, level) {
            return Ok(DeliveryReport::rejected(level));
        }

        let mut message = String::new();
        fmt::write(&mut message, args)?;
        let record = LogRecord::new(self.config.name.clone(), self.timestamp(), level, message);

        let Self {
            config,
            sinks,
            clock,
            hal,
            memory,
            ..
        } = self;
        let mut report = DeliveryReport::accepted(level);

        for (name, sink) in sinks.iter_mut() {
            // Thresholds are read here, not at load, so change_level applies
            // to the very next call.
            let Some(sink_config) = config.sinks.get(name) else {
                continue;
            };

            let verdict = policy::verdict(sink_config.threshold, level);
            if verdict == Verdict::Skip {
                continue;
            }

            let delivered = deliver(name, &mut **sink, &record);

            let diagnostic = (verdict == Verdict::DeliverWithDiagnostic).then(|| {
                let free = memory.reclaim();
                let gc = LogRecord::new(
                    config.name.clone(),
                    stamp(hal, &**clock),
                    level,
                    format!("{}{}", GC_MESSAGE_PREFIX, free),
                );
                deliver(name, &mut **sink, &gc)
            });

            report.deliveries.push(SinkDelivery {
                sink: name.clone(),
                record: delivered,
                diagnostic,
            });
        }

        Ok(report)
    }

    /// Logs an unexpected error at debug level together with some context.
    pub fn exception(
        &mut self,
        err: &dyn Debug,
        message: &str,
    ) -> Result<DeliveryReport, FormatError> {
        self.debug(format_args!(
            "Critical exception: {:?} - message: {}",
            err, message
        ))
    }

    /// Sets the threshold of one sink. Unknown names are ignored.
    pub fn change_level(&mut self, sink: &str, threshold: i64) {
        if let Some(config) = self.config.sinks.get_mut(sink) {
            config.threshold = threshold;
        }
    }

    /// Renames the log source and points every network sink at `host`.
    ///
    /// Network sinks are torn down and rebuilt from the updated config. One
    /// that fails to come back is dropped rather than left talking to the old
    /// host. Every other sink is rebuilt from its unchanged config.
    pub fn change_host(&mut self, name: impl Into<String>, host: impl Into<String>) {
        self.config.name = name.into();
        let host = host.into();

        let network: Vec<String> = self
            .config
            .sinks
            .iter()
            .filter(|(sink, config)| self.registry.role_of(sink, config) == Some(SinkRole::Network))
            .map(|(sink, _)| sink.clone())
            .collect();

        for sink in &network {
            if let Some(config) = self.config.sinks.get_mut(sink) {
                config.host = Some(host.clone());
            }
            self.announce(format!("Set {} hostname {}", sink, host));
        }

        let mut previous = std::mem::take(&mut self.sinks);
        let mut rebuilt = Sinks::new();
        let mut outcomes = Vec::new();

        for (sink, config) in &self.config.sinks {
            if network.contains(sink) {
                match self.registry.reload(sink, config, previous.remove(sink)) {
                    Ok(instance) => {
                        rebuilt.insert(sink.clone(), instance);
                        outcomes.push(format!("reloaded sink {}", sink));
                    }
                    Err(err) => {
                        err.emit();
                        outcomes.push(format!("Error: {}", err));
                    }
                }
            } else {
                match self.registry.build(sink, config) {
                    Ok(instance) => {
                        rebuilt.insert(sink.clone(), instance);
                    }
                    Err(report) => SinkError::Load {
                        name: sink.clone(),
                        report,
                    }
                    .emit(),
                }
            }
        }

        for (_, mut old) in previous {
            old.flush();
        }
        self.sinks = rebuilt;

        for outcome in outcomes {
            self.announce(outcome);
        }
    }

    /// Installs a hardware clock; it formats every timestamp from the next
    /// call on.
    pub fn change_hal(&mut self, hal: impl Clock + 'static) {
        self.hal = Some(Box::new(hal));
    }

    /// Records held by the `log` sink. `None` when that sink is not loaded,
    /// cannot be read back, or fails to read.
    pub fn read_log(&self) -> Option<Vec<LogRecord>> {
        let sink = self.sinks.get(LOG_SINK)?;

        match sink.read_all()? {
            Ok(records) => Some(records),
            Err(report) => {
                SinkError::Read {
                    name: LOG_SINK.to_string(),
                    report,
                }
                .emit();
                None
            }
        }
    }

    pub fn flush(&mut self) {
        for sink in self.sinks.values_mut() {
            sink.flush();
        }
    }

    fn announce(&mut self, message: String) {
        if let Err(err) = self.log(Level::Debug, format_args!("{}", message)) {
            log::warn!(target: "ulog", "failed announcing {:?}: {}", message, err);
        }
    }
}

fn stamp(hal: &Option<Box<dyn Clock>>, clock: &dyn Clock) -> String {
    match hal {
        Some(hal) => hal.timestamp(),
        None => clock.timestamp(),
    }
}

fn deliver(name: &str, sink: &mut dyn LogSink, record: &LogRecord) -> Result<(), SinkError> {
    sink.write_log(record).map_err(|report| {
        let err = SinkError::Delivery {
            name: name.to_string(),
            report,
        };
        err.emit();
        err
    })
}

pub struct Builder {
    config: EngineConfig,
    registry: SinkRegistry,
    clock: Box<dyn Clock>,
    hal: Option<Box<dyn Clock>>,
    memory: Box<dyn MemoryProbe>,
}

impl Builder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: SinkRegistry::new(),
            clock: Box::new(LocalClock::new()),
            hal: None,
            memory: Box::new(SystemMemory::new()),
        }
    }

    pub fn with_registry(self, registry: SinkRegistry) -> Self {
        Self { registry, ..self }
    }

    pub fn with_clock(self, clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            ..self
        }
    }

    pub fn with_hal(self, hal: impl Clock + 'static) -> Self {
        Self {
            hal: Some(Box::new(hal)),
            ..self
        }
    }

    pub fn with_memory_probe(self, memory: impl MemoryProbe + 'static) -> Self {
        Self {
            memory: Box::new(memory),
            ..self
        }
    }

    pub fn build(self) -> Engine {
        let sinks = self.registry.load(&self.config.sinks);

        Engine {
            config: self.config,
            registry: self.registry,
            sinks,
            clock: self.clock,
            hal: self.hal,
            memory: self.memory,
        }
    }
}
