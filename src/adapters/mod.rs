//! Subsystems the orchestrator drives.
//!
//! Each trait is the narrow capability the orchestrator needs; the concrete
//! types in the submodules are what the binary wires up. Every implementation
//! owns its own synchronisation.

pub mod camera;
pub mod cloud;
pub mod material;
pub mod notifier;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::status::StatusSnapshot;

pub use camera::CameraManager;
pub use cloud::{CloudMessage, CloudOutbox};
pub use material::MaterialCounter;
pub use notifier::{BroadcastNotifier, ClientMessage};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0} is unavailable")]
    Unavailable(&'static str),
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AdapterResult<T = ()> = Result<T, AdapterError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOutcome {
    Success,
    Failed,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Success => "success",
            JobOutcome::Failed => "failed",
        }
    }
}

/// Remote cloud account the printer reports to.
#[async_trait]
pub trait CloudSync: Send + Sync {
    async fn report_job_outcome(&self, outcome: JobOutcome, material_used: f64) -> AdapterResult;
    async fn register_print_start(&self, file_name: &str, file_path: &str) -> AdapterResult;
    async fn delete_print_file(&self, path: &str) -> AdapterResult;
    async fn send_current_data(&self, snapshot: &StatusSnapshot) -> AdapterResult;
}

#[async_trait]
pub trait CameraControl: Send + Sync {
    async fn on_capture_success(&self) -> AdapterResult;
    async fn on_capture_error(&self) -> AdapterResult;
    async fn start_timelapse(&self) -> AdapterResult;
    /// Stopping with no timelapse running is a no-op.
    async fn stop_timelapse(&self) -> AdapterResult;
    fn is_active(&self) -> bool;
    /// Re-evaluate availability and return the fresh `is_active`.
    fn check_status(&self) -> bool {
        self.is_active()
    }
    fn capabilities(&self) -> Vec<String>;
}

/// Filament accounting fed from the printer send path.
pub trait MaterialTracker: Send + Sync {
    fn reset(&self);
    /// Millimetres of filament consumed since the last reset. Never decreases
    /// between resets.
    fn total_consumed(&self) -> f64;
    fn observe_command(&self, line: &str);
}

/// Broadcast channel to connected real-time clients. Must return without
/// waiting on any client.
pub trait ClientNotifier: Send + Sync {
    fn publish(&self, event: &str, data: Value) -> AdapterResult;
}
