use std::{
    cell::RefCell,
    collections::VecDeque,
    fs::File,
    io::{LineWriter, Write},
    path::{Path, PathBuf},
    rc::Rc,
};

use eyre::Context;

use crate::{config::SinkConfig, record::LogRecord};

use super::{DefaultFormatter, JsonFormatter, LogFormatter, LogSink};

pub struct FileSink {
    file: LineWriter<File>,
    file_path: PathBuf,
    formatter: Box<dyn LogFormatter>,
    max_file_size: Option<u64>,
    keeps_records: bool,
}

impl FileSink {
    pub fn new(path: impl AsRef<Path>, formatter: Box<dyn LogFormatter>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = open_append(path)?;

        Ok(Self {
            file: LineWriter::new(file),
            file_path: path.to_path_buf(),
            formatter,
            max_file_size: None,
            keeps_records: false,
        })
    }

    /// A file of JSON lines that can be read back with `read_all`.
    pub fn records(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let sink = Self::new(path, Box::new(JsonFormatter::new()))?;
        Ok(Self {
            keeps_records: true,
            ..sink
        })
    }

    pub fn with_max_file_size(self, max_file_size: Option<u64>) -> Self {
        Self {
            max_file_size,
            ..self
        }
    }

    /// `path` defaults to `<name>.log`; `max_size` enables rotation; `ansi`
    /// colors plain-text output.
    pub fn from_config(name: &str, config: &SinkConfig) -> eyre::Result<Self> {
        let formatter = DefaultFormatter::new(config.get_bool("ansi").unwrap_or(false));
        let sink = Self::new(config_path(name, config), Box::new(formatter))?;
        Ok(sink.with_max_file_size(config.get_u64("max_size")))
    }

    pub fn records_from_config(name: &str, config: &SinkConfig) -> eyre::Result<Self> {
        let sink = Self::records(config_path(name, config))?;
        Ok(sink.with_max_file_size(config.get_u64("max_size")))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn rotate_if_exceeds_max_file_size(&mut self) -> eyre::Result<()> {
        let Some(max_file_size) = self.max_file_size else {
            return Ok(());
        };

        let md = self
            .file
            .get_ref()
            .metadata()
            .context("Can't read log file metadata")?;

        if md.len() > max_file_size {
            let path = self.file_path.display().to_string();

            let mut new_path = format!("{}.old", path);

            let mut counter = 1;
            while std::fs::metadata(&new_path).is_ok() {
                new_path = format!("{}.old{}", path, counter);
                counter += 1;
            }

            self.file.flush().context("Can't flush file")?;
            std::fs::rename(&self.file_path, &new_path)
                .with_context(|| format!("Failed rotating log file {}", path))?;

            self.file = LineWriter::new(open_append(&self.file_path)?);
        }

        Ok(())
    }
}

fn config_path(name: &str, config: &SinkConfig) -> PathBuf {
    config
        .get_str("path")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}.log", name)))
}

fn open_append(path: &Path) -> eyre::Result<File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed opening or creating log file {}", path.display()))
}

impl LogSink for FileSink {
    fn write_log(&mut self, record: &LogRecord) -> eyre::Result<()> {
        self.rotate_if_exceeds_max_file_size()?;

        writeln!(self.file, "{}", self.formatter.format(record))?;
        self.file.flush().context("Can't flush file")
    }

    fn flush(&mut self) {
        if let Err(err) = self.file.flush() {
            log::warn!(target: "ulog", "failed flushing {}: {}", self.file_path.display(), err);
        }
    }

    fn read_all(&self) -> Option<eyre::Result<Vec<LogRecord>>> {
        if !self.keeps_records {
            return None;
        }

        let read = || -> eyre::Result<Vec<LogRecord>> {
            let mut records = Vec::new();
            for path in rotated_paths(&self.file_path) {
                records.extend(read_records(&path)?);
            }
            records.extend(read_records(&self.file_path)?);
            Ok(records)
        };

        Some(read())
    }
}

/// Files left behind by rotation, oldest first: `<path>.old`, `<path>.old1`, ...
fn rotated_paths(path: &Path) -> Vec<PathBuf> {
    let path = path.display().to_string();

    let mut rotated = Vec::new();
    let mut candidate = format!("{}.old", path);
    let mut counter = 1;
    while std::fs::metadata(&candidate).is_ok() {
        rotated.push(PathBuf::from(&candidate));
        candidate = format!("{}.old{}", path, counter);
        counter += 1;
    }

    rotated
}

fn read_records(path: &Path) -> eyre::Result<Vec<LogRecord>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed reading log file {}", path.display()))?;

    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(n, line)| {
            serde_json::from_str::<LogRecord>(line).with_context(|| {
                format!("Malformed record on line {} of {}", n + 1, path.display())
            })
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

pub struct ConsoleSink {
    stream: Stream,
    formatter: Box<dyn LogFormatter>,
}

impl ConsoleSink {
    pub fn new(stream: Stream, formatter: Box<dyn LogFormatter>) -> Self {
        Self { stream, formatter }
    }

    pub fn from_config(config: &SinkConfig) -> eyre::Result<Self> {
        let stream = match config.get_str("stream").unwrap_or("stderr") {
            "stdout" => Stream::Stdout,
            "stderr" => Stream::Stderr,
            other => return Err(eyre::eyre!("Unknown console stream {}", other)),
        };
        let formatter = DefaultFormatter::new(config.get_bool("ansi").unwrap_or(false));

        Ok(Self::new(stream, Box::new(formatter)))
    }
}

impl LogSink for ConsoleSink {
    fn write_log(&mut self, record: &LogRecord) -> eyre::Result<()> {
        let line = self.formatter.format(record);

        match self.stream {
            Stream::Stdout => {
                let mut writer = std::io::stdout().lock();
                writeln!(writer, "{}", line)?;
                writer.flush().context("Can't flush stdout")
            }
            Stream::Stderr => {
                let mut writer = std::io::stderr().lock();
                writeln!(writer, "{}", line)?;
                writer.flush().context("Can't flush stderr")
            }
        }
    }

    fn flush(&mut self) {
        let _ = match self.stream {
            Stream::Stdout => std::io::stdout().lock().flush(),
            Stream::Stderr => std::io::stderr().lock().flush(),
        };
    }
}

/// Shared view of the records a `MemorySink` holds.
#[derive(Clone, Debug, Default)]
pub struct MemoryHandle(Rc<RefCell<VecDeque<LogRecord>>>);

impl MemoryHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.0.borrow().iter().cloned().collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.borrow().iter().map(|r| r.message.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear()
    }
}

/// Keeps the most recent records in RAM, dropping the oldest beyond
/// `capacity`.
pub struct MemorySink {
    handle: MemoryHandle,
    capacity: Option<usize>,
}

impl MemorySink {
    pub fn new(handle: MemoryHandle, capacity: Option<usize>) -> Self {
        Self { handle, capacity }
    }

    pub fn from_config(config: &SinkConfig) -> Self {
        let capacity = config
            .get_u64("capacity")
            .and_then(|c| usize::try_from(c).ok());
        Self::new(MemoryHandle::new(), capacity)
    }

    pub fn handle(&self) -> MemoryHandle {
        self.handle.clone()
    }
}

impl LogSink for MemorySink {
    fn write_log(&mut self, record: &LogRecord) -> eyre::Result<()> {
        let mut records = self.handle.0.borrow_mut();
        records.push_back(record.clone());

        if let Some(capacity) = self.capacity {
            while records.len() > capacity {
                records.pop_front();
            }
        }

        Ok(())
    }

    fn read_all(&self) -> Option<eyre::Result<Vec<LogRecord>>> {
        Some(Ok(self.handle.records()))
    }
}

pub struct NullSink {}

impl NullSink {
    pub fn new() -> Self {
        Self {}
    }
}

impl LogSink for NullSink {
    fn write_log(&mut self, _record: &LogRecord) -> eyre::Result<()> {
        Ok(())
    }
}
