//! Remote job submission
//!
//! A job runs `obi-launch` with a [`LaunchArgs`](crate::LaunchArgs) on a
//! compute allocation. The transport sits behind [`JobLauncher`];
//! [`submit_job`] turns its raw answer into a job id.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ClientError;
use crate::launch::LaunchArgs;

/// Default wall-clock limit of a launched job
pub const DEFAULT_TIME_LIMIT: &str = "00:10";

/// Compute resources requested for a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResources {
    /// CPU cores
    pub cores: u32,
    /// Memory in GiB
    pub memory: u32,
    /// Wall-clock limit as `HH:MM`
    pub timelimit: String,
}

impl Default for JobResources {
    fn default() -> Self {
        Self {
            cores: 1,
            memory: 2,
            timelimit: DEFAULT_TIME_LIMIT.to_string(),
        }
    }
}

/// Code the job executes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCode {
    /// Repository holding the launcher
    pub location: String,
    /// Revision to check out
    #[serde(rename = "ref")]
    pub reference: String,
    /// Executable inside the repository
    pub path: String,
}

/// Notification the job service sends on a job event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCallback {
    /// Event name, e.g. `job_on_success`
    pub event_type: String,
    pub url: String,
}

/// Request sent to the job service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub resources: JobResources,
    pub code: JobCode,
    /// Command line arguments of the executable
    pub inputs: Vec<String>,
    pub project_id: Uuid,
    pub virtual_lab_id: Uuid,
    #[serde(default)]
    pub callbacks: Vec<JobCallback>,
}

impl JobSubmission {
    /// Build the submission that runs `obi-launch` with `args`
    #[must_use]
    pub fn for_launch(args: &LaunchArgs, code: JobCode) -> Self {
        Self {
            resources: JobResources::default(),
            code,
            inputs: args.to_command_line(),
            project_id: args.project_id,
            virtual_lab_id: args.virtual_lab_id,
            callbacks: Vec::new(),
        }
    }

    /// Add an event callback
    #[must_use]
    pub fn with_callback(mut self, event_type: impl Into<String>, url: impl Into<String>) -> Self {
        self.callbacks.push(JobCallback {
            event_type: event_type.into(),
            url: url.into(),
        });
        self
    }

    /// Override requested resources
    #[must_use]
    pub fn with_resources(mut self, resources: JobResources) -> Self {
        self.resources = resources;
        self
    }
}

/// Raw answer of the job service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResponse {
    /// HTTP-like status code
    pub status: u16,
    pub body: JsonValue,
}

impl JobResponse {
    /// Check for a 2xx status
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport to the job service
pub trait JobLauncher {
    /// Send one submission
    ///
    /// # Errors
    /// Returns error if the service cannot be reached
    fn submit(&self, job: &JobSubmission) -> Result<JobResponse, ClientError>;
}

/// Submit a job and return its id
///
/// # Errors
/// Returns [`ClientError::JobRejected`] on a non-success status and
/// [`ClientError::MissingJobId`] if the answer carries no `id`
pub fn submit_job(launcher: &dyn JobLauncher, job: &JobSubmission) -> Result<String, ClientError> {
    let response = launcher.submit(job)?;
    if !response.is_success() {
        let message = response
            .body
            .get("message")
            .and_then(JsonValue::as_str)
            .map_or_else(|| response.body.to_string(), str::to_string);
        warn!(status = response.status, %message, "job submission rejected");
        return Err(ClientError::JobRejected {
            status: response.status,
            message,
        });
    }

    let id = response
        .body
        .get("id")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| ClientError::MissingJobId(response.body.to_string()))?;
    info!(job_id = id, "job submitted");
    Ok(id.to_string())
}
