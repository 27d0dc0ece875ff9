// Network sink speaking BSD syslog (RFC 3164 framing) over UDP.
//
// This is the sink `Engine::change_host` retargets: the socket is bound and
// connected once at construction, so a new host means a new instance.

use std::net::UdpSocket;

use eyre::Context;

use crate::{config::SinkConfig, level::Level, record::LogRecord};

use super::LogSink;

pub const DEFAULT_SYSLOG_PORT: u16 = 514;

/// Facility codes from `<syslog.h>`, pre-shifted out (the numeric value is the
/// facility number, not `facility << 3`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyslogFacility {
    Kern = 0,
    User = 1,
    Daemon = 3,
    Local0 = 16,
    Local1 = 17,
    Local2 = 18,
    Local3 = 19,
    Local4 = 20,
    Local5 = 21,
    Local6 = 22,
    Local7 = 23,
}

impl SyslogFacility {
    /// Case-insensitive lookup. Returns `None` for unrecognised names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "kern" => Some(Self::Kern),
            "user" => Some(Self::User),
            "daemon" => Some(Self::Daemon),
            "local0" => Some(Self::Local0),
            "local1" => Some(Self::Local1),
            "local2" => Some(Self::Local2),
            "local3" => Some(Self::Local3),
            "local4" => Some(Self::Local4),
            "local5" => Some(Self::Local5),
            "local6" => Some(Self::Local6),
            "local7" => Some(Self::Local7),
            _ => None,
        }
    }
}

impl Default for SyslogFacility {
    fn default() -> Self {
        Self::User
    }
}

fn severity(level: Level) -> u8 {
    match level {
        Level::Error => 3,
        Level::Warning => 4,
        Level::Info => 6,
        Level::Debug => 7,
    }
}

pub struct SyslogSink {
    socket: UdpSocket,
    facility: SyslogFacility,
    target: String,
}

impl SyslogSink {
    pub fn new(host: &str, port: u16, facility: SyslogFacility) -> eyre::Result<Self> {
        let target = format!("{}:{}", host, port);

        let socket = UdpSocket::bind(("0.0.0.0", 0)).context("Failed binding syslog socket")?;
        socket
            .connect(target.as_str())
            .with_context(|| format!("Failed resolving syslog host {}", target))?;

        Ok(Self {
            socket,
            facility,
            target,
        })
    }

    /// Reads `host` (required), `port` and `facility`.
    pub fn from_config(config: &SinkConfig) -> eyre::Result<Self> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| eyre::eyre!("syslog sink requires a host"))?;

        let port = match config.get_u64("port") {
            Some(port) => u16::try_from(port).context("syslog port out of range")?,
            None => DEFAULT_SYSLOG_PORT,
        };

        let facility = match config.get_str("facility") {
            Some(name) => SyslogFacility::from_name(name)
                .ok_or_else(|| eyre::eyre!("Unknown syslog facility {}", name))?,
            None => SyslogFacility::default(),
        };

        Self::new(host, port, facility)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn frame(&self, record: &LogRecord) -> String {
        let priority = (self.facility as u8) * 8 + severity(record.level);
        format!(
            "<{}>{} {}: {}",
            priority, record.timestamp, record.name, record.message
        )
    }
}

impl LogSink for SyslogSink {
    fn write_log(&mut self, record: &LogRecord) -> eyre::Result<()> {
        let frame = self.frame(record);
        self.socket
            .send(frame.as_bytes())
            .with_context(|| format!("Failed sending to syslog host {}", self.target))?;

        Ok(())
    }
}
