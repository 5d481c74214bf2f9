// src/listener.rs - Printer communication callbacks to events
//
// The host's communication layer calls into `PrinterLinkListener` from its
// own thread: once per state change and once per command sent. State
// changes become `Event`s; sent commands feed the layer and heating
// trackers that status queries read.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

use crate::event::Event;
use crate::gcode::SentCommand;
use crate::orchestrator::OrchestratorHandle;
use crate::status::JobSnapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    #[default]
    Offline,
    Operational,
    Printing,
    Paused,
    Error,
}

impl LinkState {
    pub fn is_operational(&self) -> bool {
        !matches!(self, LinkState::Offline | LinkState::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintFile {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Default)]
struct LinkInner {
    state: LinkState,
    selected: Option<PrintFile>,
    heating: bool,
    layer: Option<u32>,
    /// Z of the last counted layer.
    layer_z: Option<f64>,
    /// Last Z seen on a move.
    z: Option<f64>,
    /// Slicer `;LAYER:` comments win over Z tracking once seen.
    layer_comments: bool,
    job: Option<JobSnapshot>,
}

impl LinkInner {
    fn completed(&self) -> bool {
        self.job
            .as_ref()
            .and_then(|job| job.completion)
            .is_some_and(|c| c >= 100.0)
    }

    fn translate(&self, old: LinkState, new: LinkState) -> Option<Event> {
        use LinkState::*;
        match (old, new) {
            (a, b) if a == b => None,
            (_, Offline) => Some(Event::Disconnected),
            (Offline | Error, Operational) => Some(Event::Connected),
            (Operational, Printing) => match &self.selected {
                Some(file) => Some(Event::PrintStarted {
                    file_name: file.name.clone(),
                    file_path: file.path.clone(),
                }),
                None => {
                    tracing::warn!("Printer started printing with no file selected");
                    None
                }
            },
            (Printing, Paused) => Some(Event::PrintPaused),
            (Paused, Printing) => Some(Event::PrintResumed),
            (Printing | Paused, Operational) if self.completed() => Some(Event::PrintDone),
            (Printing | Paused, Operational) => Some(Event::PrintCancelled),
            (Printing | Paused, Error) => Some(Event::PrintFailed),
            (_, Error) => Some(Event::Error),
            _ => None,
        }
    }

    fn track_layer(&mut self, cmd: &SentCommand<'_>) {
        if let Some(z) = cmd.word('Z') {
            self.z = Some(z);
        }
        if self.layer_comments || !cmd.word('E').is_some_and(|e| e > 0.0) {
            return;
        }
        // Travel at a raised Z (z-hop) never extrudes, so only count a layer
        // once material goes down at a new height.
        if let (Some(layer), Some(z)) = (self.layer, self.z) {
            if self.layer_z.is_none_or(|last| z > last + 1e-6) {
                self.layer = Some(layer + 1);
                self.layer_z = Some(z);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct PrinterLinkListener {
    inner: Mutex<LinkInner>,
    sink: Option<OrchestratorHandle>,
}

impl PrinterLinkListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward every translated state change to the orchestrator queue.
    pub fn with_sink(sink: OrchestratorHandle) -> Self {
        Self {
            inner: Mutex::default(),
            sink: Some(sink),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LinkInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn select_file(&self, name: &str, path: &str) {
        self.lock().selected = Some(PrintFile {
            name: name.to_string(),
            path: path.to_string(),
        });
    }

    /// Translate a state change into the events it implies, in order, and
    /// forward them to the sink.
    pub fn on_state_change(&self, new: LinkState) -> Vec<Event> {
        let events = {
            let mut inner = self.lock();
            let old = std::mem::replace(&mut inner.state, new);
            if !new.is_operational() {
                inner.heating = false;
            }
            let mut events = Vec::new();
            // Losing the link mid-job ends the job before the disconnect
            if matches!(old, LinkState::Printing | LinkState::Paused) && new == LinkState::Offline {
                events.push(Event::PrintFailed);
            }
            events.extend(inner.translate(old, new));
            events
        };
        for event in &events {
            tracing::debug!(event = event.name(), ?new, "Printer state changed");
            if let Some(sink) = &self.sink {
                if let Err(e) = sink.submit(event.clone()) {
                    tracing::warn!("Dropped printer event {}: {}", event.name(), e);
                }
            }
        }
        events
    }

    pub fn on_progress(&self, completion: f32, print_time: u64, print_time_left: Option<u64>) {
        let mut inner = self.lock();
        let selected = inner.selected.clone();
        let job = inner.job.get_or_insert_with(|| JobSnapshot {
            file_name: selected.as_ref().map(|f| f.name.clone()),
            file_path: selected.as_ref().map(|f| f.path.clone()),
            ..Default::default()
        });
        job.completion = Some(completion.clamp(0.0, 100.0));
        job.print_time = Some(print_time);
        job.print_time_left = print_time_left;
    }

    pub fn on_command_sent(&self, line: &str) {
        let mut inner = self.lock();
        if let Some(rest) = line.trim().strip_prefix(";LAYER:") {
            if let Ok(layer) = rest.trim().parse::<u32>() {
                if inner.layer.is_some() {
                    inner.layer = Some(layer);
                    inner.layer_comments = true;
                }
            }
            return;
        }
        let Some(cmd) = SentCommand::parse(line) else {
            return;
        };
        match cmd.code.as_str() {
            // Blocking heat-and-wait; the next command goes out once it returns
            "M109" | "M190" | "M191" => inner.heating = inner.state.is_operational(),
            "G0" | "G1" => {
                inner.heating = false;
                inner.track_layer(&cmd);
            }
            _ => inner.heating = false,
        }
    }

    /// A job begins: reset layer tracking and the job snapshot.
    pub fn start_print(&self, file: &PrintFile) {
        let mut inner = self.lock();
        inner.selected = Some(file.clone());
        inner.layer = Some(0);
        inner.layer_z = None;
        inner.z = None;
        inner.layer_comments = false;
        inner.job = Some(JobSnapshot {
            file_name: Some(file.name.clone()),
            file_path: Some(file.path.clone()),
            completion: Some(0.0),
            print_time: Some(0),
            print_time_left: None,
        });
        tracing::info!("Tracking print of {}", file.name);
    }

    /// The job ended without finishing: stop reporting its layer and progress.
    pub fn clear_job(&self) {
        let mut inner = self.lock();
        inner.layer = None;
        inner.layer_z = None;
        inner.layer_comments = false;
        inner.job = None;
    }

    pub fn state(&self) -> LinkState {
        self.lock().state
    }

    pub fn selected_file(&self) -> Option<PrintFile> {
        self.lock().selected.clone()
    }

    pub fn current_layer(&self) -> Option<u32> {
        self.lock().layer
    }

    pub fn job_data(&self) -> Option<JobSnapshot> {
        self.lock().job.clone()
    }

    pub fn is_heating(&self) -> bool {
        let inner = self.lock();
        inner.heating && inner.state.is_operational()
    }
}
