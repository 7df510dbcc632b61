//! Scripted in-memory backend for unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::models::case::CaseType;
use crate::models::job::{JobId, JobStatus};
use crate::models::report::{DetectionRecord, Report};
use crate::services::backend::{BackendError, JobBackend, VideoUpload};

/// Scripted response: `Err(code)` becomes `BackendError::UnexpectedStatus`.
pub type Scripted<T> = Result<T, u16>;

/// Build a report with `n` records, frames `0..n`.
pub fn records(n: usize) -> Report {
    (0..n)
        .map(|i| DetectionRecord {
            frame: i as i64,
            vehicle_id: format!("v{i}"),
            detection_type: "car".to_string(),
            plate_or_result: Some(format!("PLATE{i}")),
            extracted_number: None,
            crop_image_ref: Some(format!("/crops/{i}.jpg")),
            full_image_ref: None,
        })
        .collect()
}

fn failure(status: u16) -> BackendError {
    BackendError::UnexpectedStatus {
        status,
        body: "scripted failure".to_string(),
    }
}

#[derive(Default)]
struct Script {
    job_id: Option<String>,
    fail_upload: bool,
    statuses: VecDeque<Scripted<JobStatus>>,
    reports: VecDeque<Scripted<Report>>,
    report_delays: VecDeque<Duration>,
    uploads: Vec<(String, CaseType)>,
    upload_attempts: usize,
    status_calls: Vec<Instant>,
    report_calls: usize,
}

/// Answers backend calls from queued scripts. Exhausted status scripts keep
/// answering `Processing`; exhausted report scripts answer an empty report.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job_id(self, id: &str) -> Self {
        self.script.lock().unwrap().job_id = Some(id.to_string());
        self
    }

    pub fn failing_upload(self) -> Self {
        self.script.lock().unwrap().fail_upload = true;
        self
    }

    pub fn with_statuses(self, statuses: Vec<Scripted<JobStatus>>) -> Self {
        self.script.lock().unwrap().statuses = statuses.into();
        self
    }

    pub fn with_reports(self, reports: Vec<Scripted<Report>>) -> Self {
        self.script.lock().unwrap().reports = reports.into();
        self
    }

    /// Latency for successive report calls; calls past the list answer immediately.
    pub fn with_report_delays(self, delays: Vec<Duration>) -> Self {
        self.script.lock().unwrap().report_delays = delays.into();
        self
    }

    pub fn uploads(&self) -> Vec<(String, CaseType)> {
        self.script.lock().unwrap().uploads.clone()
    }

    pub fn upload_attempts(&self) -> usize {
        self.script.lock().unwrap().upload_attempts
    }

    pub fn status_calls(&self) -> usize {
        self.script.lock().unwrap().status_calls.len()
    }

    pub fn status_call_times(&self) -> Vec<Instant> {
        self.script.lock().unwrap().status_calls.clone()
    }

    pub fn report_calls(&self) -> usize {
        self.script.lock().unwrap().report_calls
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn create_job(&self, upload: VideoUpload, case: CaseType) -> Result<JobId, BackendError> {
        let mut script = self.script.lock().unwrap();
        script.upload_attempts += 1;
        if script.fail_upload {
            return Err(failure(502));
        }
        script.uploads.push((upload.file_name, case));
        let id = script
            .job_id
            .clone()
            .unwrap_or_else(|| format!("job-{}", script.uploads.len()));
        Ok(JobId::new(id))
    }

    async fn job_status(&self, _job_id: &JobId) -> Result<JobStatus, BackendError> {
        let mut script = self.script.lock().unwrap();
        script.status_calls.push(Instant::now());
        match script.statuses.pop_front() {
            Some(Ok(status)) => Ok(status),
            Some(Err(code)) => Err(failure(code)),
            None => Ok(JobStatus::Processing),
        }
    }

    async fn job_report(&self, _job_id: &JobId) -> Result<Report, BackendError> {
        let (next, delay) = {
            let mut script = self.script.lock().unwrap();
            script.report_calls += 1;
            (script.reports.pop_front(), script.report_delays.pop_front())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match next {
            Some(Ok(report)) => Ok(report),
            Some(Err(code)) => Err(failure(code)),
            None => Ok(Report::default()),
        }
    }
}
