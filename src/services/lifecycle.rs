use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::models::case::CaseType;
use crate::models::job::{Job, JobId};
use crate::models::report::{Report, ReportRow};
use crate::models::session::{ClientState, FailureReason, Phase};
use crate::services::backend::{BackendError, HttpBackend, JobBackend, VideoUpload};
use crate::services::media::MediaResolver;
use crate::services::poller::{JobPoller, PollEvent, PollerError, PollerState};
use crate::services::submission::{SubmissionError, SubmissionGateway};

/// Owns one client session: `idle → processing → completed | error`.
///
/// All writes to [`ClientState`] go through this type. Poll events are
/// applied only when they belong to the current job, so responses that
/// arrive after a reset or for a superseded job are dropped. Dropping the
/// lifecycle stops its poller.
///
/// Poll events queue on an unbounded channel, one report snapshot per tick.
/// Callers must keep it drained while a job runs (`step`, `drain` or
/// `run_until_settled`); otherwise each undrained tick holds a full report.
pub struct JobLifecycle {
    backend: Arc<dyn JobBackend>,
    gateway: SubmissionGateway,
    resolver: MediaResolver,
    poll_interval: Duration,
    poller: Option<JobPoller>,
    state: ClientState,
    events_tx: mpsc::UnboundedSender<PollEvent>,
    events_rx: mpsc::UnboundedReceiver<PollEvent>,
}

impl JobLifecycle {
    pub fn new(backend: Arc<dyn JobBackend>, resolver: MediaResolver, poll_interval: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            gateway: SubmissionGateway::new(backend.clone()),
            backend,
            resolver,
            poll_interval,
            poller: None,
            state: ClientState::default(),
            events_tx,
            events_rx,
        }
    }

    /// Build a lifecycle talking HTTP to the configured backend.
    pub fn from_config(config: &AppConfig) -> Result<Self, BackendError> {
        let backend = HttpBackend::new(config.base_url(), config.request_timeout())?;
        Ok(Self::new(
            Arc::new(backend),
            MediaResolver::new(config.base_url()),
            config.poll_interval(),
        ))
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn report(&self) -> &Report {
        &self.state.report
    }

    pub fn resolver(&self) -> &MediaResolver {
        &self.resolver
    }

    pub fn report_rows(&self) -> Vec<ReportRow> {
        self.resolver.report_rows(&self.state.report)
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller
            .as_ref()
            .map_or(PollerState::Idle, JobPoller::state)
    }

    /// Submit a video and start polling the new job.
    ///
    /// A submission failure moves the session straight to `error` and is
    /// also returned to the caller. There is no automatic retry.
    pub async fn submit(&mut self, upload: VideoUpload, case: CaseType) -> Result<JobId, LifecycleError> {
        if self.state.phase != Phase::Idle {
            tracing::warn!(phase = %self.state.phase, "Submission rejected, session not idle");
            return Err(LifecycleError::Busy {
                phase: self.state.phase,
            });
        }

        let job_id = match self.gateway.submit(upload, case).await {
            Ok(job_id) => job_id,
            Err(e) => {
                self.state.failure = Some(FailureReason::SubmissionFailed);
                self.transition(Phase::Error);
                return Err(e.into());
            }
        };

        let mut poller = JobPoller::new(self.backend.clone(), self.poll_interval);
        poller.start(job_id.clone(), self.events_tx.clone())?;
        self.poller = Some(poller);

        self.state.job = Some(Job::new(job_id.clone(), case));
        self.state.report = Report::default();
        self.state.video_url = None;
        self.state.failure = None;
        self.transition(Phase::Processing);

        Ok(job_id)
    }

    /// Apply one poll event. Returns whether it changed the session.
    pub fn apply(&mut self, event: PollEvent) -> bool {
        let is_current = self
            .state
            .job
            .as_ref()
            .is_some_and(|job| &job.id == event.job_id());
        if !is_current {
            tracing::debug!(job_id = %event.job_id(), "Discarding event for superseded job");
            return false;
        }

        match event {
            // accepted after a terminal transition too: it is the freshest snapshot
            PollEvent::ReportSynced { report, .. } => {
                self.state.report = report;
                self.state.updated_at = Utc::now();
                true
            }
            PollEvent::JobCompleted { job_id, video_url } => {
                if self.state.phase != Phase::Processing {
                    return false;
                }
                self.stop_poller();
                self.state.video_url = self.resolver.resolve(video_url.as_deref());
                metrics::counter!("jobs_completed_total").increment(1);
                self.record_duration();
                tracing::info!(
                    job_id = %job_id,
                    records = self.state.report.len(),
                    video_url = self.state.video_url.as_deref().unwrap_or("-"),
                    "Analysis complete"
                );
                self.transition(Phase::Completed);
                true
            }
            PollEvent::JobFailed { job_id } => {
                if self.state.phase != Phase::Processing {
                    return false;
                }
                self.stop_poller();
                self.state.failure = Some(FailureReason::JobFailed);
                metrics::counter!("jobs_failed_total").increment(1);
                self.record_duration();
                tracing::warn!(job_id = %job_id, "Analysis pipeline interrupted");
                self.transition(Phase::Error);
                true
            }
        }
    }

    /// Wait for the next poll event and apply it.
    ///
    /// Never resolves while no poller has been started for this session.
    pub async fn step(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => self.apply(event),
            None => false,
        }
    }

    /// Apply every event already queued without waiting. Returns how many changed the session.
    ///
    /// Queued snapshots are applied in arrival order, so the last one wins.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.apply(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Drive the session until it leaves `processing`.
    pub async fn run_until_settled(&mut self) -> Phase {
        while self.state.phase == Phase::Processing {
            self.step().await;
        }
        self.drain();
        self.state.phase
    }

    /// Start a new session: stop any poller and discard job, report and video URL.
    pub fn reset(&mut self) {
        self.stop_poller();
        self.poller = None;

        // late events from the old poller land in a channel nobody reads
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.events_tx = events_tx;
        self.events_rx = events_rx;

        let previous = self.state.phase;
        self.state = ClientState::default();
        tracing::info!(previous = %previous, "New session started");
    }

    fn stop_poller(&mut self) {
        if let Some(poller) = self.poller.as_mut() {
            poller.stop();
        }
    }

    fn record_duration(&self) {
        if let Some(job) = &self.state.job {
            let elapsed = Utc::now() - job.submitted_at;
            metrics::histogram!("job_duration_seconds")
                .record(elapsed.num_milliseconds() as f64 / 1000.0);
        }
    }

    fn transition(&mut self, to: Phase) {
        let from = self.state.phase;
        self.state.phase = to;
        self.state.updated_at = Utc::now();
        tracing::info!(
            job_id = self.state.job.as_ref().map(|j| j.id.as_str()).unwrap_or("-"),
            from = %from,
            to = %to,
            "Session phase changed"
        );
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Cannot submit while session is {phase}")]
    Busy { phase: Phase },

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Poller(#[from] PollerError),
}
