// src/adapters/camera.rs - Camera availability and timelapse state
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{AdapterError, AdapterResult, CameraControl};
use crate::config::CameraConfig;

/// Tracks whether the camera pipeline is producing frames and whether a
/// timelapse is recording. Capture itself happens in the host's camera
/// process; this only follows its completion callbacks.
#[derive(Debug)]
pub struct CameraManager {
    enabled: bool,
    capabilities: Vec<String>,
    active: AtomicBool,
    timelapse: AtomicBool,
}

impl CameraManager {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            enabled: config.enabled,
            capabilities: config.capabilities.clone(),
            active: AtomicBool::new(false),
            timelapse: AtomicBool::new(false),
        }
    }

    pub fn is_timelapse_running(&self) -> bool {
        self.timelapse.load(Ordering::SeqCst)
    }

    pub async fn shutdown(&self) {
        tracing::info!("Shutting down camera manager");
        if let Err(e) = self.stop_timelapse().await {
            tracing::warn!("Failed to stop timelapse during shutdown: {}", e);
        }
        self.active.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl CameraControl for CameraManager {
    async fn on_capture_success(&self) -> AdapterResult {
        if !self.enabled {
            tracing::debug!("Capture succeeded but camera is disabled in config");
            return Ok(());
        }
        if !self.active.swap(true, Ordering::SeqCst) {
            tracing::info!("Camera connected");
        }
        Ok(())
    }

    async fn on_capture_error(&self) -> AdapterResult {
        if self.active.swap(false, Ordering::SeqCst) {
            tracing::warn!("Camera capture failed, marking camera inactive");
        }
        Ok(())
    }

    async fn start_timelapse(&self) -> AdapterResult {
        if !self.is_active() {
            return Err(AdapterError::Unavailable("camera"));
        }
        if !self.timelapse.swap(true, Ordering::SeqCst) {
            tracing::info!("Timelapse started");
        }
        Ok(())
    }

    async fn stop_timelapse(&self) -> AdapterResult {
        if self.timelapse.swap(false, Ordering::SeqCst) {
            tracing::info!("Timelapse stopped");
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// A disabled camera is never reported active.
    fn check_status(&self) -> bool {
        if !self.enabled {
            self.active.store(false, Ordering::SeqCst);
        }
        self.is_active()
    }

    fn capabilities(&self) -> Vec<String> {
        if self.is_active() {
            self.capabilities.clone()
        } else {
            Vec::new()
        }
    }
}
