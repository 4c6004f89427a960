//! Sub-stage outcome type with factory methods.

use super::StageStatus;
use serde::{Deserialize, Serialize};

/// The outcome of executing one sub-stage.
///
/// `SubStageOutcome` is immutable once created; use the factory methods to
/// build one for each status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubStageOutcome {
    /// The status of the sub-stage.
    pub status: StageStatus,

    /// The server group the sub-stage acted on, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_group: Option<String>,

    /// Error message (for failed sub-stages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Skip reason (for skipped sub-stages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,

    /// Cancel reason (for cancelled sub-stages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,

    /// The predecessor that blocked this sub-stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<String>,
}

impl SubStageOutcome {
    fn with_status(status: StageStatus) -> Self {
        Self {
            status,
            server_group: None,
            error: None,
            skip_reason: None,
            cancel_reason: None,
            blocked_by: None,
        }
    }

    /// Creates a successful outcome.
    #[must_use]
    pub fn ok() -> Self {
        Self::with_status(StageStatus::Ok)
    }

    /// Creates a successful outcome that acted on a server group.
    #[must_use]
    pub fn ok_for(server_group: impl Into<String>) -> Self {
        Self::ok().on_server_group(server_group)
    }

    /// Creates a skip outcome with a reason.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            skip_reason: Some(reason.into()),
            ..Self::with_status(StageStatus::Skip)
        }
    }

    /// Creates a cancel outcome with a reason.
    #[must_use]
    pub fn cancel(reason: impl Into<String>) -> Self {
        Self {
            cancel_reason: Some(reason.into()),
            ..Self::with_status(StageStatus::Cancel)
        }
    }

    /// Creates a failure outcome with an error message.
    #[must_use]
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::with_status(StageStatus::Fail)
        }
    }

    /// Creates a blocked outcome naming the predecessor that did not succeed.
    #[must_use]
    pub fn blocked(predecessor: impl Into<String>) -> Self {
        Self {
            blocked_by: Some(predecessor.into()),
            ..Self::with_status(StageStatus::Blocked)
        }
    }

    /// Records the server group the sub-stage acted on.
    #[must_use]
    pub fn on_server_group(mut self, server_group: impl Into<String>) -> Self {
        self.server_group = Some(server_group.into());
        self
    }

    /// Returns true if the outcome lets dependents proceed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the outcome blocks dependents.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}
