use std::sync::Arc;

use crate::models::case::CaseType;
use crate::models::job::JobId;
use crate::services::backend::{BackendError, JobBackend, VideoUpload};

/// Packages a video and case into one job-creation request.
///
/// No retries and no idempotency key: each call creates a distinct job.
#[derive(Clone)]
pub struct SubmissionGateway {
    backend: Arc<dyn JobBackend>,
}

impl SubmissionGateway {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        Self { backend }
    }

    pub async fn submit(&self, upload: VideoUpload, case: CaseType) -> Result<JobId, SubmissionError> {
        if upload.is_empty() {
            return Err(SubmissionError::EmptyFile);
        }

        let file_name = upload.file_name.clone();
        let size_bytes = upload.bytes.len();
        tracing::info!(file = %file_name, size_bytes, case = %case, "Submitting video for analysis");

        match self.backend.create_job(upload, case).await {
            Ok(job_id) => {
                metrics::counter!("jobs_submitted_total").increment(1);
                tracing::info!(job_id = %job_id, case = %case, "Job created");
                Ok(job_id)
            }
            Err(e) => {
                tracing::error!(file = %file_name, error = %e, "Upload failed");
                Err(SubmissionError::Backend(e))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("No video selected")]
    EmptyFile,

    #[error("Submission failed: {0}")]
    Backend(#[from] BackendError),
}
