// src/session.rs - Login and print-in-progress state
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user logged in to the cloud account linked to this printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

/// One print attempt, from `PrintStarted` until it finishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRef {
    pub id: String,
    pub file_name: String,
    pub file_path: String,
    pub started_at: DateTime<Utc>,
    /// Whether the start of this job was registered with the cloud.
    pub cloud_registered: bool,
}

impl JobRef {
    pub fn new(file_name: &str, file_path: &str, cloud_registered: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            file_path: file_path.to_string(),
            started_at: Utc::now(),
            cloud_registered,
        }
    }
}

/// The orchestrator's record of who is logged in and whether a print is
/// running.
///
/// Invariant: `currently_printing` is `Some` only while `can_start_new_print`
/// is false. Only the orchestrator mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    logged_in: Option<UserIdentity>,
    currently_printing: Option<JobRef>,
    can_start_new_print: bool,
}

impl SessionState {
    /// Rebuild the state at process start from whatever login survived.
    pub fn with_identity(identity: Option<UserIdentity>) -> Self {
        Self {
            logged_in: identity,
            ..Self::default()
        }
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.logged_in.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.is_some()
    }

    pub fn current_job(&self) -> Option<&JobRef> {
        self.currently_printing.as_ref()
    }

    pub fn can_start_new_print(&self) -> bool {
        self.can_start_new_print
    }

    pub fn is_consistent(&self) -> bool {
        self.currently_printing.is_none() || !self.can_start_new_print
    }

    pub(crate) fn log_in(&mut self, identity: UserIdentity) {
        self.logged_in = Some(identity);
    }

    pub(crate) fn log_out(&mut self) -> Option<UserIdentity> {
        self.logged_in.take()
    }

    /// The printer became operational (`true`) or went away (`false`).
    pub(crate) fn set_operational(&mut self, operational: bool) {
        self.can_start_new_print = operational && self.currently_printing.is_none();
        debug_assert!(self.is_consistent());
    }

    pub(crate) fn begin_job(&mut self, job: JobRef) {
        self.currently_printing = Some(job);
        self.can_start_new_print = false;
        debug_assert!(self.is_consistent());
    }

    /// Clear the running job and return it, if one was registered.
    pub(crate) fn finish_job(&mut self) -> Option<JobRef> {
        let job = self.currently_printing.take();
        self.can_start_new_print = true;
        job
    }
}
