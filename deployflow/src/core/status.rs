//! Sub-stage type and status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of operation a sub-stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SubStageType {
    /// Clone the target server-group spec into a new group.
    Create,
    /// Gate on the minimum healthy-instance percentage of a group.
    WaitHealthy,
    /// Attach a group to traffic.
    Enable,
    /// Detach a group from traffic immediately.
    Disable,
    /// Detach a group from traffic after a rollback delay.
    ScheduledDisable,
    /// Destroy a group.
    Destroy,
    /// Destroy an excess group beyond the retention count.
    Shrink,
    /// Destroy the group created by the failed flow.
    Rollback,
}

impl fmt::Display for SubStageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "Create"),
            Self::WaitHealthy => write!(f, "WaitHealthy"),
            Self::Enable => write!(f, "Enable"),
            Self::Disable => write!(f, "Disable"),
            Self::ScheduledDisable => write!(f, "ScheduledDisable"),
            Self::Destroy => write!(f, "Destroy"),
            Self::Shrink => write!(f, "Shrink"),
            Self::Rollback => write!(f, "Rollback"),
        }
    }
}

/// The execution status of a sub-stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Sub-stage completed successfully.
    Ok,
    /// Sub-stage was skipped (race on destroy, contingency not triggered).
    Skip,
    /// Sub-stage was cancelled before it was issued.
    Cancel,
    /// Sub-stage failed.
    Fail,
    /// Sub-stage never ran because a predecessor did not succeed.
    Blocked,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Skip => write!(f, "skip"),
            Self::Cancel => write!(f, "cancel"),
            Self::Fail => write!(f, "fail"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status lets dependents proceed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Skip)
    }

    /// Returns true if the status blocks dependents.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail | Self::Cancel | Self::Blocked)
    }
}
