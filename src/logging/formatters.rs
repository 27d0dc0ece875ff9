use crate::{level::Level, record::LogRecord};

use super::LogFormatter;

/// Human readable single-line layout: `[timestamp] name LVL: message`.
pub struct DefaultFormatter {
    use_ansi: bool,
}

impl DefaultFormatter {
    pub fn new(use_ansi: bool) -> Self {
        Self { use_ansi }
    }

    fn timestamp(&self, record: &LogRecord) -> String {
        let color = if self.use_ansi { "\x1b[0;90m" } else { "" };

        format!("{}[{}]{}", color, record.timestamp, self.reset())
    }

    fn format_level(&self, level: Level) -> &str {
        if self.use_ansi {
            match level {
                Level::Error => "\x1b[0;31mERR\x1b[0m",
                Level::Warning => "\x1b[0;33mWRN\x1b[0m",
                Level::Info => "\x1b[0;32mINF\x1b[0m",
                Level::Debug => "\x1b[0;34mDEB\x1b[0m",
            }
        } else {
            match level {
                Level::Error => "ERR",
                Level::Warning => "WRN",
                Level::Info => "INF",
                Level::Debug => "DEB",
            }
        }
    }

    fn reset(&self) -> &str {
        if self.use_ansi {
            "\x1b[0m"
        } else {
            ""
        }
    }

    fn format_msg(&self, message: &str) -> String {
        let color = if self.use_ansi { "\x1b[0;1m" } else { "" };

        format!("{}{}{}", color, message, self.reset())
    }
}

impl LogFormatter for DefaultFormatter {
    fn format(&self, record: &LogRecord) -> String {
        format!(
            "{} {} {}: {}",
            self.timestamp(record),
            record.name,
            self.format_level(record.level),
            self.format_msg(&record.message),
        )
    }
}

/// One JSON object per line, readable back into `LogRecord`s.
pub struct JsonFormatter {}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {}
    }
}

impl LogFormatter for JsonFormatter {
    fn format(&self, record: &LogRecord) -> String {
        // LogRecord only holds strings and a unit enum; serialization can't fail.
        serde_json::to_string(record).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LogRecord {
        LogRecord::new("node", "2024-05-06T07:08:09.010", Level::Warning, "low battery")
    }

    #[test]
    fn plain_layout() {
        let line = DefaultFormatter::new(false).format(&record());
        assert_eq!(line, "[2024-05-06T07:08:09.010] node WRN: low battery");
    }

    #[test]
    fn ansi_layout_colors_the_level() {
        let line = DefaultFormatter::new(true).format(&record());
        assert!(line.contains("\x1b[0;33mWRN\x1b[0m"));
        assert!(line.ends_with("low battery\x1b[0m"));
    }

    #[test]
    fn json_layout_reads_back() {
        let line = JsonFormatter::new().format(&record());
        assert!(line.contains("\"datetime\":\"2024-05-06T07:08:09.010\""));

        let parsed: LogRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, record());
    }
}
