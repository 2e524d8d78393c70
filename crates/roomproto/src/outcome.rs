//! Per-action execution results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failure,
    /// The action was overridden and never sent.
    Skipped,
}

/// Result of one action in an executed graph.
///
/// Callers inspect `status` on every entry; a report with failures is still a
/// complete report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusOutcome {
    pub action: String,
    pub generator: String,
    pub device: String,
    pub destination_device: String,
    pub status: OutcomeStatus,
    /// Status the device reported back, when its response decoded as a JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_status: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusOutcome {
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    pub fn is_failure(&self) -> bool {
        self.status == OutcomeStatus::Failure
    }

    pub fn is_skipped(&self) -> bool {
        self.status == OutcomeStatus::Skipped
    }
}
