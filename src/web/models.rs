//! Contains the data models for API requests and responses.

use serde::{Deserialize, Serialize};

use crate::listener::LinkState;
use crate::session::UserIdentity;

/// Box status as reported to local and remote clients.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BoxStatusResponse {
    pub name: String,
    pub printing: bool,
    pub paused: bool,
    pub operational: bool,
    pub file_name: Option<String>,
    pub camera: bool,
    pub remote_print: bool,
    pub capabilities: Vec<String>,
}

/// Public part of the logged-in identity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
}

impl From<&UserIdentity> for UserInfo {
    fn from(user: &UserIdentity) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserResponse {
    pub user: Option<UserInfo>,
}

/// Everything a client needs to render on first load.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InitialStateResponse {
    pub user: Option<UserInfo>,
    pub connected: bool,
    pub can_print: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CameraStatusResponse {
    pub connected: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PrinterProfileResponse {
    pub driver: String,
    pub max_nozzle_temp: f64,
    pub max_bed_temp: f64,
}

/// Printer state callback from the host communication layer.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LinkStateRequest {
    pub state: LinkState,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LinkStateResponse {
    /// Events raised by the change, in the order they were queued.
    pub events: Vec<String>,
}

/// Commands the host just wrote to the printer.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SentCommandsRequest {
    pub lines: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProgressRequest {
    pub completion: f32,
    pub print_time: u64,
    #[serde(default)]
    pub print_time_left: Option<u64>,
}
