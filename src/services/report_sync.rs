use std::sync::Arc;

use crate::models::job::JobId;
use crate::models::report::Report;
use crate::services::backend::{BackendError, JobBackend};

/// Fetches the full current report snapshot for a job.
///
/// The returned report replaces whatever the caller held; nothing is merged.
#[derive(Clone)]
pub struct ReportSynchronizer {
    backend: Arc<dyn JobBackend>,
}

impl ReportSynchronizer {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        Self { backend }
    }

    pub async fn sync(&self, job_id: &JobId) -> Result<Report, ReportFetchError> {
        match self.backend.job_report(job_id).await {
            Ok(report) => {
                tracing::debug!(job_id = %job_id, records = report.len(), "Report synced");
                Ok(report)
            }
            Err(e) => {
                metrics::counter!("report_fetch_failures_total").increment(1);
                Err(ReportFetchError(e))
            }
        }
    }
}

/// Transient failure reaching `/report`. The previous report stays valid.
#[derive(Debug, thiserror::Error)]
#[error("Failed to fetch report: {0}")]
pub struct ReportFetchError(#[from] pub BackendError);
