use serde::{Deserialize, Serialize};

use crate::level::Level;

/// One logged event. Built once per accepted call and handed to every
/// qualifying sink by reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub name: String,
    #[serde(rename = "datetime")]
    pub timestamp: String,
    pub level: Level,
    pub message: String,
}

impl LogRecord {
    pub fn new(
        name: impl Into<String>,
        timestamp: impl Into<String>,
        level: Level,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            timestamp: timestamp.into(),
            level,
            message: message.into(),
        }
    }
}
