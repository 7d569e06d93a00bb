//! Per-frame presence status.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::associate::Association;

/// Presence status of the desk worker.
///
/// Used both for the raw per-frame label and for the smoothed value the
/// rest of the pipeline acts on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Working,
    Idle,
    Absent,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Working, Status::Idle, Status::Absent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Working => "WORKING",
            Status::Idle => "IDLE",
            Status::Absent => "ABSENT",
        }
    }

    /// Activity-log message for entering this status.
    pub fn message(&self) -> &'static str {
        match self {
            Status::Working => "Now working",
            Status::Idle => "Now idle (person detected but head not visible)",
            Status::Absent => "No person detected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label one frame from its associations.
///
/// No person is ABSENT; any person with a visible head is WORKING;
/// persons without heads are IDLE.
pub fn classify(associations: &[Association]) -> Status {
    if associations.is_empty() {
        Status::Absent
    } else if associations.iter().any(|a| a.head.is_some()) {
        Status::Working
    } else {
        Status::Idle
    }
}
