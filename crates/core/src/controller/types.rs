//! Types for the separation controller.

use serde::Serialize;

use crate::song::SongStatus;

/// Acknowledgement of a separation trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerResponse {
    pub id: String,
    pub status: SongStatus,
    /// Set when no new run was started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TriggerResponse {
    /// Whether this trigger started a new run.
    pub fn started(&self) -> bool {
        self.message.is_none() && self.status == SongStatus::Processing
    }
}

/// Snapshot of the controller's runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ControllerStatus {
    /// Ids of songs with a run in flight.
    pub active_runs: Vec<String>,
    /// Runs that committed `READY` since startup.
    pub total_completed: u64,
    /// Runs that committed `FAILED` since startup.
    pub total_failed: u64,
}
