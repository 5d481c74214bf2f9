//! Status payloads shared by the client channel, the cloud push and the HTTP
//! surface.

use serde::{Deserialize, Serialize};

/// Progress of the job the printer link is currently tracking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    /// Percent complete, 0-100.
    pub completion: Option<f32>,
    /// Seconds elapsed.
    pub print_time: Option<u64>,
    /// Seconds remaining, when the host has an estimate.
    pub print_time_left: Option<u64>,
}

/// The merged snapshot published as `socketUpdate` after every printer state
/// event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub heating_up: bool,
    pub current_layer: Option<u32>,
    pub camera: Option<bool>,
    pub user_logged: Option<String>,
    pub job: Option<JobSnapshot>,
}
