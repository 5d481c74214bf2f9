// Recording fakes for the orchestrator's subsystems
#![allow(dead_code)]

use async_trait::async_trait;
use printbridge::adapters::{
    AdapterError, AdapterResult, CameraControl, ClientNotifier, CloudSync, JobOutcome,
    MaterialCounter, MaterialTracker,
};
use printbridge::{Adapters, EventOrchestrator, SessionState, StatusSnapshot, UserIdentity};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Publish(String, Value),
    CloudRegister(String, String),
    CloudReport(JobOutcome, f64),
    CloudDelete(String),
    CloudCurrentData(StatusSnapshot),
    CaptureSuccess,
    CaptureError,
    StartTimelapse,
    StopTimelapse,
    MaterialReset,
}

impl Call {
    pub fn is_cloud(&self) -> bool {
        matches!(
            self,
            Call::CloudRegister(..) | Call::CloudReport(..) | Call::CloudDelete(_) | Call::CloudCurrentData(_)
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn cloud_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_cloud).collect()
    }

    pub fn published(&self, event: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Publish(name, data) if name == event => Some(data),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

pub struct FakeCloud {
    rec: Recorder,
    fail: bool,
    gate: Option<Arc<Semaphore>>,
}

impl FakeCloud {
    async fn call(&self, call: Call) -> AdapterResult {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.rec.push(call);
        if self.fail {
            Err(AdapterError::Network("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CloudSync for FakeCloud {
    async fn report_job_outcome(&self, outcome: JobOutcome, material_used: f64) -> AdapterResult {
        self.call(Call::CloudReport(outcome, material_used)).await
    }

    async fn register_print_start(&self, file_name: &str, file_path: &str) -> AdapterResult {
        self.call(Call::CloudRegister(file_name.to_string(), file_path.to_string()))
            .await
    }

    async fn delete_print_file(&self, path: &str) -> AdapterResult {
        self.call(Call::CloudDelete(path.to_string())).await
    }

    async fn send_current_data(&self, snapshot: &StatusSnapshot) -> AdapterResult {
        self.call(Call::CloudCurrentData(snapshot.clone())).await
    }
}

pub struct FakeCamera {
    rec: Recorder,
    fail: bool,
    active: AtomicBool,
}

impl FakeCamera {
    fn result(&self) -> AdapterResult {
        if self.fail {
            Err(AdapterError::Unavailable("camera"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CameraControl for FakeCamera {
    async fn on_capture_success(&self) -> AdapterResult {
        self.rec.push(Call::CaptureSuccess);
        self.active.store(true, Ordering::SeqCst);
        self.result()
    }

    async fn on_capture_error(&self) -> AdapterResult {
        self.rec.push(Call::CaptureError);
        self.active.store(false, Ordering::SeqCst);
        self.result()
    }

    async fn start_timelapse(&self) -> AdapterResult {
        self.rec.push(Call::StartTimelapse);
        self.result()
    }

    async fn stop_timelapse(&self) -> AdapterResult {
        self.rec.push(Call::StopTimelapse);
        self.result()
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["video".to_string()]
    }
}

/// Real counter that also records resets.
pub struct FakeMaterial {
    rec: Recorder,
    counter: MaterialCounter,
}

impl MaterialTracker for FakeMaterial {
    fn reset(&self) {
        self.rec.push(Call::MaterialReset);
        self.counter.reset();
    }

    fn total_consumed(&self) -> f64 {
        self.counter.total_consumed()
    }

    fn observe_command(&self, line: &str) {
        self.counter.observe_command(line);
    }
}

pub struct FakeNotifier {
    rec: Recorder,
    fail: bool,
}

impl ClientNotifier for FakeNotifier {
    fn publish(&self, event: &str, data: Value) -> AdapterResult {
        self.rec.push(Call::Publish(event.to_string(), data));
        if self.fail {
            Err(AdapterError::ChannelClosed("clients"))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct HarnessOptions {
    pub logged_in: bool,
    pub failing_cloud: bool,
    pub failing_camera: bool,
    pub failing_notifier: bool,
    pub cloud_gate: Option<Arc<Semaphore>>,
    pub camera: Option<Arc<dyn CameraControl>>,
}

pub struct Harness {
    pub orchestrator: Arc<EventOrchestrator>,
    pub rec: Recorder,
    pub material: Arc<FakeMaterial>,
}

pub fn user() -> UserIdentity {
    UserIdentity {
        user_id: "u-1".to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
    }
}

pub fn harness(options: HarnessOptions) -> Harness {
    let rec = Recorder::default();
    let material = Arc::new(FakeMaterial {
        rec: rec.clone(),
        counter: MaterialCounter::new(),
    });
    let camera = options.camera.unwrap_or_else(|| {
        Arc::new(FakeCamera {
            rec: rec.clone(),
            fail: options.failing_camera,
            active: AtomicBool::new(false),
        })
    });
    let adapters = Adapters {
        cloud: Arc::new(FakeCloud {
            rec: rec.clone(),
            fail: options.failing_cloud,
            gate: options.cloud_gate,
        }),
        camera,
        material: material.clone(),
        notifier: Arc::new(FakeNotifier {
            rec: rec.clone(),
            fail: options.failing_notifier,
        }),
    };
    let identity = options.logged_in.then(user);
    let orchestrator = Arc::new(EventOrchestrator::new(
        adapters,
        SessionState::with_identity(identity),
    ));
    Harness {
        orchestrator,
        rec,
        material,
    }
}

pub fn print_started(name: &str) -> printbridge::Event {
    printbridge::Event::PrintStarted {
        file_name: name.to_string(),
        file_path: format!("/{}", name),
    }
}
