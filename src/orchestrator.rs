// src/orchestrator.rs - Single writer for session state, fan-out to subsystems
//
// Every event goes through `EventOrchestrator::handle`. The session lock is
// held while the state transition and the dispatch plan are computed, then
// released before any subsystem is called. Cloud calls go to a dedicated
// lane so network latency never delays the next event; the remaining effects
// run inline, in table order, each one failing on its own.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::adapters::{
    AdapterResult, CameraControl, ClientNotifier, CloudSync, JobOutcome, MaterialTracker,
};
use crate::event::{Event, LOCAL_STORAGE};
use crate::listener::{LinkState, PrintFile, PrinterLinkListener};
use crate::session::{JobRef, SessionState};
use crate::status::StatusSnapshot;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Orchestrator is shut down")]
    Closed,
    #[error("A printer link listener is already registered")]
    ListenerAlreadyRegistered,
}

/// The four subsystems driven by the orchestrator.
#[derive(Clone)]
pub struct Adapters {
    pub cloud: Arc<dyn CloudSync>,
    pub camera: Arc<dyn CameraControl>,
    pub material: Arc<dyn MaterialTracker>,
    pub notifier: Arc<dyn ClientNotifier>,
}

/// Side effects decided while holding the session lock.
#[derive(Debug, Clone, PartialEq)]
enum Effect {
    CaptureSuccess,
    CaptureError,
    Publish(&'static str, bool),
    ReportOutcome(JobOutcome),
    RegisterPrintStart { file_name: String, file_path: String },
    DeletePrintFile(String),
    StopTimelapse,
    ResetMaterial,
    StartListenerJob(PrintFile),
    ClearListenerJob,
    Epilogue { user_email: Option<String>, push_cloud: bool },
}

enum CloudTask {
    RegisterPrintStart { file_name: String, file_path: String },
    ReportOutcome { outcome: JobOutcome, material_used: f64 },
    DeletePrintFile(String),
    SendCurrentData(StatusSnapshot),
    Flush(oneshot::Sender<()>),
}

enum Command {
    Event(Event),
    SentCommands(Vec<String>),
    Shutdown,
}

/// Cloneable sender side of the orchestrator queue.
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl OrchestratorHandle {
    /// Enqueue an event. Never blocks, so it is safe from the printer thread.
    pub fn submit(&self, event: Event) -> Result<(), OrchestratorError> {
        self.tx
            .send(Command::Event(event))
            .map_err(|_| OrchestratorError::Closed)
    }

    /// Enqueue G-code lines the host wrote to the printer. They share the
    /// event queue so a job's material reset and layer reset always land
    /// before the job's first commands are counted.
    pub fn observe_commands(&self, lines: Vec<String>) -> Result<(), OrchestratorError> {
        self.tx
            .send(Command::SentCommands(lines))
            .map_err(|_| OrchestratorError::Closed)
    }

    /// Stop the worker once the events already queued are handled.
    pub fn shutdown(&self) -> Result<(), OrchestratorError> {
        self.tx
            .send(Command::Shutdown)
            .map_err(|_| OrchestratorError::Closed)
    }
}

pub struct EventOrchestrator {
    state: RwLock<SessionState>,
    adapters: Adapters,
    listener: RwLock<Option<Arc<PrinterLinkListener>>>,
    cloud_lane: mpsc::UnboundedSender<CloudTask>,
}

impl EventOrchestrator {
    /// Create the orchestrator and spawn its cloud lane. Must be called from
    /// within a Tokio runtime.
    pub fn new(adapters: Adapters, initial: SessionState) -> Self {
        let (cloud_lane, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_cloud_lane(adapters.cloud.clone(), rx));
        Self {
            state: RwLock::new(initial),
            adapters,
            listener: RwLock::new(None),
            cloud_lane,
        }
    }

    /// Spawn the worker that drains the event queue one event at a time.
    pub fn spawn(self: Arc<Self>) -> (OrchestratorHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(async move {
            tracing::info!("Event orchestrator started");
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Event(event) => self.handle(event).await,
                    Command::SentCommands(lines) => self.observe_commands(&lines).await,
                    Command::Shutdown => break,
                }
            }
            self.flush_cloud().await;
            tracing::info!("Event orchestrator stopped");
        });
        (OrchestratorHandle { tx }, worker)
    }

    pub async fn register_listener(
        &self,
        listener: Arc<PrinterLinkListener>,
    ) -> Result<(), OrchestratorError> {
        let mut slot = self.listener.write().await;
        if slot.is_some() {
            return Err(OrchestratorError::ListenerAlreadyRegistered);
        }
        *slot = Some(listener);
        tracing::info!("Printer link listener registered");
        Ok(())
    }

    pub async fn unregister_listener(&self) -> Option<Arc<PrinterLinkListener>> {
        let listener = self.listener.write().await.take();
        if listener.is_some() {
            tracing::info!("Printer link listener unregistered");
        }
        listener
    }

    pub async fn listener(&self) -> Option<Arc<PrinterLinkListener>> {
        self.listener.read().await.clone()
    }

    pub async fn session(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub fn camera(&self) -> &Arc<dyn CameraControl> {
        &self.adapters.camera
    }

    /// Current link state, or `None` while no listener is registered.
    pub async fn link_state(&self) -> Option<LinkState> {
        self.listener().await.map(|l| l.state())
    }

    pub async fn status_snapshot(&self) -> StatusSnapshot {
        let user_email = self
            .state
            .read()
            .await
            .identity()
            .map(|user| user.email.clone());
        self.build_snapshot(user_email).await
    }

    async fn build_snapshot(&self, user_logged: Option<String>) -> StatusSnapshot {
        let listener = self.listener().await;
        StatusSnapshot {
            heating_up: listener.as_ref().is_some_and(|l| l.is_heating()),
            current_layer: listener.as_ref().and_then(|l| l.current_layer()),
            camera: Some(self.adapters.camera.is_active()),
            user_logged,
            job: listener.as_ref().and_then(|l| l.job_data()),
        }
    }

    /// Feed sent G-code to material counting and, when a listener is
    /// registered, to its layer and heating trackers.
    pub async fn observe_commands(&self, lines: &[String]) {
        let listener = self.listener().await;
        for line in lines {
            self.adapters.material.observe_command(line);
            if let Some(listener) = &listener {
                listener.on_command_sent(line);
            }
        }
    }

    /// Wait until every cloud call queued so far has run.
    pub async fn flush_cloud(&self) {
        let (tx, rx) = oneshot::channel();
        if self.cloud_lane.send(CloudTask::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Apply one event. Never fails: subsystem errors are logged and the
    /// remaining effects still run.
    pub async fn handle(&self, event: Event) {
        let effects = {
            let mut state = self.state.write().await;
            plan(&mut state, &event)
        };
        tracing::debug!(event = event.name(), effects = effects.len(), "Dispatching event");
        for effect in effects {
            self.apply(event.name(), effect).await;
        }
    }

    async fn apply(&self, event: &'static str, effect: Effect) {
        let result: AdapterResult = match effect {
            Effect::CaptureSuccess => self.adapters.camera.on_capture_success().await,
            Effect::CaptureError => self.adapters.camera.on_capture_error().await,
            Effect::Publish(name, flag) => self.adapters.notifier.publish(name, Value::Bool(flag)),
            Effect::ReportOutcome(outcome) => {
                let material_used = self.adapters.material.total_consumed();
                self.to_cloud(CloudTask::ReportOutcome { outcome, material_used });
                Ok(())
            }
            Effect::RegisterPrintStart { file_name, file_path } => {
                self.to_cloud(CloudTask::RegisterPrintStart { file_name, file_path });
                Ok(())
            }
            Effect::DeletePrintFile(path) => {
                self.to_cloud(CloudTask::DeletePrintFile(path));
                Ok(())
            }
            Effect::StopTimelapse => self.adapters.camera.stop_timelapse().await,
            Effect::ResetMaterial => {
                self.adapters.material.reset();
                Ok(())
            }
            Effect::StartListenerJob(file) => {
                match self.listener().await {
                    Some(listener) => listener.start_print(&file),
                    None => tracing::debug!("No printer link listener, skipping job tracking"),
                }
                Ok(())
            }
            Effect::ClearListenerJob => {
                if let Some(listener) = self.listener().await {
                    listener.clear_job();
                }
                Ok(())
            }
            Effect::Epilogue { user_email, push_cloud } => {
                let snapshot = self.build_snapshot(user_email).await;
                let published = match serde_json::to_value(&snapshot) {
                    Ok(data) => self.adapters.notifier.publish("socketUpdate", data),
                    Err(e) => {
                        tracing::warn!("Failed to encode status snapshot: {}", e);
                        Ok(())
                    }
                };
                if push_cloud {
                    self.to_cloud(CloudTask::SendCurrentData(snapshot));
                }
                published
            }
        };
        if let Err(e) = result {
            tracing::warn!(event, "Subsystem call failed: {}", e);
        }
    }

    fn to_cloud(&self, task: CloudTask) {
        if self.cloud_lane.send(task).is_err() {
            tracing::warn!("Cloud lane closed, dropping cloud update");
        }
    }
}

/// Compute the state transition and the ordered effects for one event.
fn plan(state: &mut SessionState, event: &Event) -> Vec<Effect> {
    let logged_in = state.is_logged_in();
    let mut effects = Vec::new();
    match event {
        Event::CaptureSucceeded => effects.push(Effect::CaptureSuccess),
        Event::CaptureFailed => effects.push(Effect::CaptureError),
        Event::FileRemoved { storage, path } => {
            if storage == LOCAL_STORAGE && logged_in {
                effects.push(Effect::DeletePrintFile(path.clone()));
            }
        }
        Event::Connected => {
            state.set_operational(true);
            effects.push(Effect::Publish("canPrint", true));
        }
        Event::Disconnected => state.set_operational(false),
        Event::PrintCancelled | Event::PrintFailed => {
            state.finish_job();
            effects.push(Effect::Publish("canPrint", true));
            if logged_in {
                effects.push(Effect::ReportOutcome(JobOutcome::Failed));
            }
            effects.push(Effect::StopTimelapse);
            effects.push(Effect::ClearListenerJob);
        }
        Event::PrintDone => {
            let job = state.finish_job();
            if logged_in && job.is_some_and(|j| j.cloud_registered) {
                effects.push(Effect::ReportOutcome(JobOutcome::Success));
            }
            effects.push(Effect::StopTimelapse);
            effects.push(Effect::Publish("canPrint", true));
        }
        Event::PrintStarted { file_name, file_path } => {
            state.begin_job(JobRef::new(file_name, file_path, logged_in));
            effects.push(Effect::Publish("canPrint", false));
            if logged_in {
                effects.push(Effect::RegisterPrintStart {
                    file_name: file_name.clone(),
                    file_path: file_path.clone(),
                });
            }
            effects.push(Effect::ResetMaterial);
            effects.push(Effect::StartListenerJob(PrintFile {
                name: file_name.clone(),
                path: file_path.clone(),
            }));
        }
        Event::PrintPaused | Event::PrintResumed | Event::Error => {}
        Event::UserLoggedIn(identity) => {
            state.log_in(identity.clone());
            effects.push(Effect::Publish("userLogged", true));
        }
        Event::UserLoggedOut => {
            state.log_out();
            effects.push(Effect::Publish("userLoggedOut", true));
        }
    }
    if event.is_printer_state() {
        effects.push(Effect::Epilogue {
            user_email: state.identity().map(|user| user.email.clone()),
            push_cloud: state.is_logged_in(),
        });
    }
    effects
}

async fn run_cloud_lane(cloud: Arc<dyn CloudSync>, mut rx: mpsc::UnboundedReceiver<CloudTask>) {
    while let Some(task) = rx.recv().await {
        let (call, result) = match task {
            CloudTask::RegisterPrintStart { file_name, file_path } => (
                "register_print_start",
                cloud.register_print_start(&file_name, &file_path).await,
            ),
            CloudTask::ReportOutcome { outcome, material_used } => {
                tracing::info!(outcome = outcome.as_str(), material_used, "Reporting job outcome");
                (
                    "report_job_outcome",
                    cloud.report_job_outcome(outcome, material_used).await,
                )
            }
            CloudTask::DeletePrintFile(path) => {
                ("delete_print_file", cloud.delete_print_file(&path).await)
            }
            CloudTask::SendCurrentData(snapshot) => {
                ("send_current_data", cloud.send_current_data(&snapshot).await)
            }
            CloudTask::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };
        if let Err(e) = result {
            tracing::warn!(call, "Cloud sync failed: {}", e);
        }
    }
}
