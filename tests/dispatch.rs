mod common;

use std::{cell::Cell, rc::Rc};

use common::{is_gc_message, Harness, CLOCK};
use ulog::{
    logging::{MemoryHandle, MemorySink},
    ulog_debug, ulog_error, ulog_info, ulog_warning, Engine, EngineConfig, Level, LogRecord,
    LogSink, SinkConfig, SinkError, SinkRegistry, SinkRole,
};

fn config(sinks: &[(&str, i64)]) -> EngineConfig {
    sinks
        .iter()
        .fold(EngineConfig::default().without_sinks(), |config, (name, threshold)| {
            config.with_sink(*name, SinkConfig::new(*threshold))
        })
}

#[test]
fn disabled_level_touches_no_sink() {
    let config = config(&[("console", 0), ("file", 1)]).with_levels([Level::Info, Level::Error]);
    let mut h = Harness::new(config);

    let report = ulog_debug!(h.engine, "x").unwrap();

    assert!(!report.is_accepted());
    assert!(report.deliveries().is_empty());
    assert!(h.messages("console").is_empty());
    assert!(h.messages("file").is_empty());
}

#[test]
fn every_disabled_level_is_dropped() {
    for level in Level::ALL {
        let enabled = Level::ALL.into_iter().filter(|l| *l != level);
        let mut h = Harness::new(config(&[("console", 0)]).with_levels(enabled));

        let report = h.engine.log(level, format_args!("dropped")).unwrap();

        assert!(!report.is_accepted(), "{}", level);
        assert!(h.messages("console").is_empty(), "{}", level);
    }
}

#[test]
fn formatted_message_reaches_console() {
    let mut h = Harness::new(config(&[("console", 2)]));

    let report = ulog_info!(h.engine, "hello {}", "x").unwrap();

    assert!(report.is_clean());
    assert_eq!(report.attempted(), vec!["console"]);
    assert_eq!(
        h.records("console"),
        vec![LogRecord::new("ulog", CLOCK, Level::Info, "hello x")]
    );
}

#[test]
fn threshold_zero_adds_one_gc_record() {
    let mut h = Harness::new(config(&[("console", 0)]));

    ulog_error!(h.engine, "y").unwrap();

    let records = h.records("console");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].message, "y");
    assert_eq!(records[0].level, Level::Error);
    assert!(is_gc_message(&records[1].message), "{}", records[1].message);
    assert_eq!(records[1].level, Level::Error);
}

#[test]
fn threshold_zero_gc_record_goes_to_that_sink_only() {
    let mut h = Harness::new(config(&[("console", 0), ("file", 1)]));

    for level in Level::ALL {
        h.clear();
        h.engine.log(level, format_args!("m")).unwrap();

        assert_eq!(h.messages("console").len(), 2);
        assert_eq!(h.messages("file"), vec!["m"]);
    }
}

#[test]
fn thresholds_select_sinks() {
    let mut h = Harness::new(config(&[("console", 3), ("file", 1)]));

    ulog_debug!(h.engine, "z").unwrap();

    assert!(h.messages("console").is_empty());
    assert_eq!(h.messages("file"), vec!["z"]);
}

#[test]
fn delivered_iff_threshold_at_most_severity() {
    let mut h = Harness::new(config(&[("console", 1)]));

    for threshold in 1..=4 {
        h.engine.change_level("console", threshold);

        for level in Level::ALL {
            h.clear();
            h.engine.log(level, format_args!("m")).unwrap();

            let delivered = !h.messages("console").is_empty();
            assert_eq!(
                delivered,
                threshold <= level.severity(),
                "threshold {} level {}",
                threshold,
                level
            );
        }
    }
}

#[test]
fn convenience_macros_use_their_level() {
    let mut h = Harness::new(config(&[("console", 1)]));

    ulog_debug!(h.engine, "d").unwrap();
    ulog_info!(h.engine, "i").unwrap();
    ulog_warning!(h.engine, "w").unwrap();
    ulog_error!(h.engine, "e").unwrap();

    let levels: Vec<Level> = h.records("console").iter().map(|r| r.level).collect();
    assert_eq!(levels, Level::ALL.to_vec());
}

#[test]
fn sink_that_fails_to_build_is_absent() {
    let config = EngineConfig::default()
        .without_sinks()
        .with_sink("a", SinkConfig::new(1))
        .with_sink("b", SinkConfig::new(1).with("broken", true));

    let mut h = Harness::new(config);

    assert_eq!(h.engine.loaded_sinks(), vec!["a"]);
    assert!(h.engine.config().sinks.contains_key("b"));

    let report = ulog_info!(h.engine, "still works").unwrap();
    assert_eq!(report.attempted(), vec!["a"]);
    assert_eq!(h.messages("a"), vec!["still works"]);
}

struct Refusing {
    attempts: Rc<Cell<u32>>,
}

impl LogSink for Refusing {
    fn write_log(&mut self, _record: &LogRecord) -> eyre::Result<()> {
        self.attempts.set(self.attempts.get() + 1);
        Err(eyre::eyre!("device busy"))
    }
}

fn refusing_engine(refusing_threshold: i64) -> (Engine, Rc<Cell<u32>>, MemoryHandle) {
    let attempts = Rc::new(Cell::new(0));
    let handle = MemoryHandle::new();

    let counter = attempts.clone();
    let shared = handle.clone();
    let registry = SinkRegistry::empty()
        .with("refusing", SinkRole::Local, move |_, _| {
            Ok(Box::new(Refusing {
                attempts: counter.clone(),
            }))
        })
        .with("memory", SinkRole::Local, move |_, _| {
            Ok(Box::new(MemorySink::new(shared.clone(), None)))
        });

    let config = EngineConfig::default()
        .without_sinks()
        .with_sink("a", SinkConfig::new(refusing_threshold).with_kind("refusing"))
        .with_sink("b", SinkConfig::new(1).with_kind("memory"));

    let engine = Engine::builder(config).with_registry(registry).build();
    (engine, attempts, handle)
}

#[test]
fn failing_sink_does_not_stop_the_others() {
    let (mut engine, attempts, handle) = refusing_engine(1);

    let report = ulog_warning!(engine, "overheat").unwrap();

    assert_eq!(attempts.get(), 1);
    assert_eq!(handle.messages(), vec!["overheat"]);
    assert!(!report.is_clean());
    assert_eq!(report.attempted(), vec!["a", "b"]);

    let failures: Vec<&SinkError> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name(), "a");
    assert!(matches!(failures[0], SinkError::Delivery { .. }));
}

#[test]
fn diagnostic_record_follows_a_failed_delivery() {
    let (mut engine, attempts, _handle) = refusing_engine(0);

    let report = ulog_info!(engine, "boot").unwrap();

    assert_eq!(attempts.get(), 2);
    let delivery = &report.deliveries()[0];
    assert!(delivery.record().is_err());
    assert!(matches!(delivery.diagnostic(), Some(Err(_))));
    assert_eq!(report.failures().count(), 2);
}

#[test]
fn read_log_returns_history_of_the_log_sink() {
    let config = EngineConfig::default()
        .without_sinks()
        .with_sink("log", SinkConfig::new(2).with_kind("memory"));
    let mut engine = Engine::new(config);

    ulog_debug!(engine, "filtered").unwrap();
    ulog_info!(engine, "kept").unwrap();

    let records = engine.read_log().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, "kept");
}

#[test]
fn read_log_is_none_without_a_log_sink() {
    let config = EngineConfig::default()
        .without_sinks()
        .with_sink("memory", SinkConfig::new(1));
    let mut engine = Engine::new(config);

    ulog_info!(engine, "hello").unwrap();

    assert!(engine.read_log().is_none());
}

#[test]
fn log_file_round_trips_through_read_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("device.log");
    let config = EngineConfig::default()
        .without_sinks()
        .with_sink("log", SinkConfig::new(1).with("path", path.to_str().unwrap()));
    let mut engine = Engine::new(config);

    ulog_info!(engine, "first").unwrap();
    ulog_error!(engine, "second {}", 2).unwrap();

    let messages: Vec<String> = engine
        .read_log()
        .unwrap()
        .into_iter()
        .map(|r| r.message)
        .collect();
    assert_eq!(messages, vec!["first", "second 2"]);
}

#[test]
fn rotated_log_file_reads_back_every_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("device.log");
    let config = EngineConfig::default().without_sinks().with_sink(
        "log",
        SinkConfig::new(1)
            .with("path", path.to_str().unwrap())
            .with("max_size", 10),
    );
    let mut engine = Engine::new(config);

    for n in 1..=4 {
        ulog_info!(engine, "entry {}", n).unwrap();
    }

    assert!(dir.path().join("device.log.old").exists());

    let messages: Vec<String> = engine
        .read_log()
        .unwrap()
        .into_iter()
        .map(|r| r.message)
        .collect();
    assert_eq!(messages, vec!["entry 1", "entry 2", "entry 3", "entry 4"]);
}
