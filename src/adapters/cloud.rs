// src/adapters/cloud.rs - Outbound cloud traffic
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use super::{AdapterError, AdapterResult, CloudSync, JobOutcome};
use crate::config::CloudConfig;
use crate::status::StatusSnapshot;

/// One message bound for the cloud account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CloudMessage {
    PrintStarted { file_name: String, file_path: String },
    JobOutcome { outcome: JobOutcome, material_used: f64 },
    DeletePrintFile { path: String },
    CurrentData { snapshot: StatusSnapshot },
}

/// `CloudSync` that hands every message to an outbox channel. Whatever owns
/// the receiving end is the transport.
#[derive(Debug, Clone)]
pub struct CloudOutbox {
    tx: mpsc::UnboundedSender<CloudMessage>,
}

impl CloudOutbox {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CloudMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn push(&self, message: CloudMessage) -> AdapterResult {
        self.tx
            .send(message)
            .map_err(|_| AdapterError::ChannelClosed("cloud outbox"))
    }
}

#[async_trait]
impl CloudSync for CloudOutbox {
    async fn report_job_outcome(&self, outcome: JobOutcome, material_used: f64) -> AdapterResult {
        self.push(CloudMessage::JobOutcome { outcome, material_used })
    }

    async fn register_print_start(&self, file_name: &str, file_path: &str) -> AdapterResult {
        self.push(CloudMessage::PrintStarted {
            file_name: file_name.to_string(),
            file_path: file_path.to_string(),
        })
    }

    async fn delete_print_file(&self, path: &str) -> AdapterResult {
        self.push(CloudMessage::DeletePrintFile {
            path: path.to_string(),
        })
    }

    async fn send_current_data(&self, snapshot: &StatusSnapshot) -> AdapterResult {
        self.push(CloudMessage::CurrentData {
            snapshot: snapshot.clone(),
        })
    }
}

/// Drain the outbox, logging each message against the configured endpoint.
/// Returns the number of messages seen once every sender is gone.
pub async fn drain_outbox(mut rx: mpsc::UnboundedReceiver<CloudMessage>, cloud: CloudConfig) -> usize {
    let mut count = 0;
    while let Some(message) = rx.recv().await {
        count += 1;
        match serde_json::to_string(&message) {
            Ok(body) => tracing::info!(api_host = %cloud.api_host, "Cloud message: {}", body),
            Err(e) => tracing::warn!("Failed to encode cloud message: {}", e),
        }
    }
    tracing::info!("Cloud outbox closed after {} messages", count);
    count
}
