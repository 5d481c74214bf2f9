// src/event.rs - Event vocabulary consumed by the orchestrator
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::session::UserIdentity;

/// Storage name the host uses for files on its own disk.
pub const LOCAL_STORAGE: &str = "local";

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event '{event}' is missing payload field '{field}'")]
    MissingField {
        event: &'static str,
        field: &'static str,
    },
    #[error("Invalid payload for '{event}': {source}")]
    Payload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A fact about a printer, camera, storage or session change.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected,
    Disconnected,
    PrintStarted { file_name: String, file_path: String },
    PrintDone,
    PrintFailed,
    PrintCancelled,
    PrintPaused,
    PrintResumed,
    Error,
    CaptureSucceeded,
    CaptureFailed,
    FileRemoved { storage: String, path: String },
    UserLoggedIn(UserIdentity),
    UserLoggedOut,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Connected => "Connected",
            Event::Disconnected => "Disconnected",
            Event::PrintStarted { .. } => "PrintStarted",
            Event::PrintDone => "PrintDone",
            Event::PrintFailed => "PrintFailed",
            Event::PrintCancelled => "PrintCancelled",
            Event::PrintPaused => "PrintPaused",
            Event::PrintResumed => "PrintResumed",
            Event::Error => "Error",
            Event::CaptureSucceeded => "CaptureSucceeded",
            Event::CaptureFailed => "CaptureFailed",
            Event::FileRemoved { .. } => "FileRemoved",
            Event::UserLoggedIn(_) => "UserLoggedIn",
            Event::UserLoggedOut => "UserLoggedOut",
        }
    }

    /// Printer state events are followed by a status broadcast.
    pub fn is_printer_state(&self) -> bool {
        matches!(
            self,
            Event::Connected
                | Event::Disconnected
                | Event::PrintStarted { .. }
                | Event::PrintDone
                | Event::PrintFailed
                | Event::PrintCancelled
                | Event::PrintPaused
                | Event::PrintResumed
                | Event::Error
        )
    }

    /// Map a host event bus notification onto the event vocabulary.
    ///
    /// Returns `Ok(None)` for names the bridge does not react to.
    pub fn from_host(name: &str, payload: &Value) -> Result<Option<Event>, EventError> {
        let event = match name {
            "Connected" => Event::Connected,
            "Disconnected" => Event::Disconnected,
            "PrintStarted" => Event::PrintStarted {
                file_name: field(payload, "PrintStarted", "name")?,
                file_path: field(payload, "PrintStarted", "path")?,
            },
            "PrintDone" => Event::PrintDone,
            "PrintFailed" => Event::PrintFailed,
            "PrintCancelled" => Event::PrintCancelled,
            "PrintPaused" => Event::PrintPaused,
            "PrintResumed" => Event::PrintResumed,
            "Error" => Event::Error,
            "CaptureDone" | "PostRollEnd" | "MovieRendering" | "MovieDone" => {
                Event::CaptureSucceeded
            }
            "CaptureFailed" | "MovieFailed" => Event::CaptureFailed,
            "FileRemoved" => Event::FileRemoved {
                storage: field(payload, "FileRemoved", "storage")?,
                path: field(payload, "FileRemoved", "path")?,
            },
            "UserLoggedIn" => {
                let identity = UserIdentity::deserialize(payload).map_err(|source| {
                    EventError::Payload {
                        event: "UserLoggedIn",
                        source,
                    }
                })?;
                Event::UserLoggedIn(identity)
            }
            "UserLoggedOut" => Event::UserLoggedOut,
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

fn field(payload: &Value, event: &'static str, field: &'static str) -> Result<String, EventError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(EventError::MissingField { event, field })
}

/// A host notification as it arrives over the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct HostEvent {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}
