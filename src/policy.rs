use std::collections::BTreeSet;

use crate::level::Level;

/// Threshold that accepts every level and adds a free-memory record.
pub const DIAGNOSTIC_THRESHOLD: i64 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Skip,
    Deliver,
    /// Deliver, then follow up with a free-memory record.
    DeliverWithDiagnostic,
}

pub fn level_enabled(levels: &BTreeSet<Level>, level: Level) -> bool {
    levels.contains(&level)
}

/// Thresholds are not range checked: anything above 4 never matches and
/// anything negative always does.
pub fn verdict(threshold: i64, level: Level) -> Verdict {
    if threshold == DIAGNOSTIC_THRESHOLD {
        Verdict::DeliverWithDiagnostic
    } else if threshold <= level.severity() {
        Verdict::Deliver
    } else {
        Verdict::Skip
    }
}
