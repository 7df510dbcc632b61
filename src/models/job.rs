use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::case::CaseType;

/// Backend-assigned job identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A video analysis job created by one submission.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub case_type: CaseType,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, case_type: CaseType) -> Self {
        Self {
            id,
            case_type,
            submitted_at: Utc::now(),
        }
    }
}

/// Status of a backend job as reported by `GET /status/{job_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Processing,
    Completed { video_url: Option<String> },
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

/// Response from POST /upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub job_id: JobId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Processing,
    Completed,
    Error,
    /// Anything else the backend may report while the job is still running.
    #[serde(other)]
    Pending,
}

/// Response from GET /status/{job_id}
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: StatusKind,
    #[serde(default)]
    pub video_url: Option<String>,
}

impl From<StatusResponse> for JobStatus {
    fn from(resp: StatusResponse) -> Self {
        match resp.status {
            StatusKind::Completed => JobStatus::Completed {
                video_url: resp.video_url,
            },
            StatusKind::Error => JobStatus::Error,
            StatusKind::Processing | StatusKind::Pending => JobStatus::Processing,
        }
    }
}
