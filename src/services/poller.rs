use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::job::{JobId, JobStatus};
use crate::models::report::Report;
use crate::services::backend::JobBackend;
use crate::services::report_sync::ReportSynchronizer;

/// Signals emitted by a running poller, each tagged with the job it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    ReportSynced { job_id: JobId, report: Report },
    JobCompleted { job_id: JobId, video_url: Option<String> },
    JobFailed { job_id: JobId },
}

impl PollEvent {
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::ReportSynced { job_id, .. }
            | Self::JobCompleted { job_id, .. }
            | Self::JobFailed { job_id } => job_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Running,
    Stopped,
}

/// Periodically checks one job's status and re-syncs its report.
///
/// Ticks are spaced by the interval regardless of how long their requests
/// take, so requests from consecutive ticks may overlap. Stopping prevents
/// further ticks; requests already in flight still complete and emit.
pub struct JobPoller {
    backend: Arc<dyn JobBackend>,
    synchronizer: ReportSynchronizer,
    interval: Duration,
    state: PollerState,
    job_id: Option<JobId>,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl JobPoller {
    pub fn new(backend: Arc<dyn JobBackend>, interval: Duration) -> Self {
        Self {
            synchronizer: ReportSynchronizer::new(backend.clone()),
            backend,
            interval,
            state: PollerState::Idle,
            job_id: None,
            token: CancellationToken::new(),
            handle: None,
        }
    }

    pub fn state(&self) -> PollerState {
        match self.state {
            // a tick saw a terminal status and cancelled the loop itself
            PollerState::Running if self.token.is_cancelled() => PollerState::Stopped,
            state => state,
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    /// Begin polling `job_id`. Only valid once, from `Idle`.
    pub fn start(
        &mut self,
        job_id: JobId,
        sink: mpsc::UnboundedSender<PollEvent>,
    ) -> Result<(), PollerError> {
        if self.state != PollerState::Idle {
            return Err(PollerError::AlreadyStarted {
                job_id: self.job_id.clone(),
            });
        }

        tracing::info!(
            job_id = %job_id,
            interval_ms = self.interval.as_millis() as u64,
            "Starting job poller"
        );

        let ctx = Arc::new(TickContext {
            backend: self.backend.clone(),
            synchronizer: self.synchronizer.clone(),
            job_id: job_id.clone(),
            sink,
            token: self.token.clone(),
        });
        self.handle = Some(tokio::spawn(run_loop(ctx, self.interval)));
        self.job_id = Some(job_id);
        self.state = PollerState::Running;
        Ok(())
    }

    /// Stop scheduling ticks. Safe to call repeatedly, or before `start`.
    pub fn stop(&mut self) {
        if self.state == PollerState::Idle {
            return;
        }
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
            if let Some(job_id) = &self.job_id {
                tracing::debug!(job_id = %job_id, "Job poller stopped");
            }
        }
        self.state = PollerState::Stopped;
    }
}

impl Drop for JobPoller {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

struct TickContext {
    backend: Arc<dyn JobBackend>,
    synchronizer: ReportSynchronizer,
    job_id: JobId,
    sink: mpsc::UnboundedSender<PollEvent>,
    token: CancellationToken,
}

async fn run_loop(ctx: Arc<TickContext>, period: Duration) {
    // first tick one full interval after start
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = ctx.token.cancelled() => break,
            _ = ticker.tick() => {
                tick += 1;
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move { ctx.run_tick(tick).await });
            }
        }
    }

    tracing::debug!(job_id = %ctx.job_id, ticks = tick, "Poll loop exited");
}

impl TickContext {
    async fn run_tick(&self, tick: u64) {
        metrics::counter!("poll_ticks_total").increment(1);

        let status = match self.backend.job_status(&self.job_id).await {
            Ok(status) => Some(status),
            Err(e) => {
                metrics::counter!("status_check_failures_total").increment(1);
                tracing::warn!(
                    job_id = %self.job_id,
                    tick,
                    error = %e,
                    "Status check failed, retrying next tick"
                );
                None
            }
        };

        if status.as_ref().is_some_and(JobStatus::is_terminal) {
            self.token.cancel();
        }

        // the report is fetched on every tick, even when the status check failed
        match self.synchronizer.sync(&self.job_id).await {
            Ok(report) => self.emit(PollEvent::ReportSynced {
                job_id: self.job_id.clone(),
                report,
            }),
            Err(e) => tracing::warn!(
                job_id = %self.job_id,
                tick,
                error = %e,
                "Report fetch failed, keeping previous report"
            ),
        }

        match status {
            Some(JobStatus::Completed { video_url }) => {
                tracing::info!(job_id = %self.job_id, tick, "Job completed");
                self.emit(PollEvent::JobCompleted {
                    job_id: self.job_id.clone(),
                    video_url,
                });
            }
            Some(JobStatus::Error) => {
                tracing::warn!(job_id = %self.job_id, tick, "Backend reported job error");
                self.emit(PollEvent::JobFailed {
                    job_id: self.job_id.clone(),
                });
            }
            Some(JobStatus::Processing) | None => {}
        }
    }

    fn emit(&self, event: PollEvent) {
        if self.sink.send(event).is_err() {
            tracing::debug!(job_id = %self.job_id, "Session gone, dropping poll event");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("Poller already started (job {job_id:?})")]
    AlreadyStarted { job_id: Option<JobId> },
}
