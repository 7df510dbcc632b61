use async_trait::async_trait;
use reqwest::multipart;
use reqwest::{Client, Response};
use std::path::Path;
use std::time::Duration;

use crate::models::case::CaseType;
use crate::models::job::{JobId, JobStatus, StatusResponse, UploadResponse};
use crate::models::report::Report;

/// MIME type sent with every uploaded video.
pub const VIDEO_MIME: &str = "video/mp4";

/// A video selected for submission.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl VideoUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a video from disk.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.mp4")
            .to_string();
        Ok(Self { file_name, bytes })
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The three backend calls the job lifecycle depends on.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// `POST /upload`, returns the new job identifier.
    async fn create_job(&self, upload: VideoUpload, case: CaseType) -> Result<JobId, BackendError>;

    /// `GET /status/{job_id}`
    async fn job_status(&self, job_id: &JobId) -> Result<JobStatus, BackendError>;

    /// `GET /report/{job_id}`, always a full snapshot.
    async fn job_report(&self, job_id: &JobId) -> Result<Report, BackendError>;
}

/// Client for the Smart Traffic AI HTTP backend.
pub struct HttpBackend {
    http: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl JobBackend for HttpBackend {
    async fn create_job(&self, upload: VideoUpload, case: CaseType) -> Result<JobId, BackendError> {
        let form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(upload.bytes)
                    .file_name(upload.file_name)
                    .mime_str(VIDEO_MIME)?,
            )
            .text("case_type", case.as_ref().to_string());

        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let body: UploadResponse = Self::check(response).await?.json().await?;
        if body.job_id.as_str().is_empty() {
            return Err(BackendError::Malformed("upload response has an empty job_id".into()));
        }
        Ok(body.job_id)
    }

    async fn job_status(&self, job_id: &JobId) -> Result<JobStatus, BackendError> {
        let response = self
            .http
            .get(format!("{}/status/{}", self.base_url, job_id))
            .send()
            .await?;

        let body: StatusResponse = Self::check(response).await?.json().await?;
        Ok(body.into())
    }

    async fn job_report(&self, job_id: &JobId) -> Result<Report, BackendError> {
        let response = self
            .http
            .get(format!("{}/report/{}", self.base_url, job_id))
            .send()
            .await?;

        let report: Report = Self::check(response).await?.json().await?;
        Ok(report)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    Malformed(String),
}
