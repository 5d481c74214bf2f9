// printbridge: printer lifecycle events to cloud, camera, material and client fan-out

pub mod adapters;
pub mod config;
pub mod event;
pub mod gcode;
pub mod listener;
pub mod orchestrator;
pub mod session;
pub mod status;
pub mod web;

pub use event::Event;
pub use listener::{LinkState, PrinterLinkListener};
pub use orchestrator::{Adapters, EventOrchestrator, OrchestratorError, OrchestratorHandle};
pub use session::{JobRef, SessionState, UserIdentity};
pub use status::{JobSnapshot, StatusSnapshot};
