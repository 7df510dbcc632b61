use chrono::{DateTime, Utc};
use serde::Serialize;

use super::job::Job;
use super::report::Report;

/// Lifecycle phase of the client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Processing,
    Completed,
    Error,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the session ended in `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Job creation was rejected or never reached the backend.
    SubmissionFailed,
    /// The backend reported `status=error` for the job.
    JobFailed,
}

impl FailureReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::SubmissionFailed => "The video could not be submitted for analysis. Please try again.",
            Self::JobFailed => {
                "The AI service encountered an unexpected state. Please check the video format."
            }
        }
    }
}

/// Everything the presentation layer needs to render one session.
#[derive(Debug, Clone, Serialize)]
pub struct ClientState {
    pub phase: Phase,
    pub job: Option<Job>,
    pub report: Report,
    pub video_url: Option<String>,
    pub failure: Option<FailureReason>,
    pub updated_at: DateTime<Utc>,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            job: None,
            report: Report::default(),
            video_url: None,
            failure: None,
            updated_at: Utc::now(),
        }
    }
}
