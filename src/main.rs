use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use smart_traffic_client::{
    config::AppConfig,
    models::{case::CaseType, report::ReportRow, session::Phase},
    services::{backend::VideoUpload, evidence::EvidenceLoader, lifecycle::JobLifecycle},
};

#[derive(Parser)]
#[command(
    name = "smart-traffic-client",
    about = "Submit traffic videos for AI analysis and follow the results"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a video and follow the job until it finishes
    Run {
        /// Path to the .mp4 video
        video: PathBuf,
        /// Detection case identifier (see `cases`)
        #[arg(long, default_value = "anpr")]
        case: CaseType,
        /// Download each evidence crop and report the ones that fail to load
        #[arg(long)]
        probe_evidence: bool,
    },
    /// List the available detection cases
    Cases,
}

#[derive(Serialize)]
struct Summary<'a> {
    job_id: Option<&'a str>,
    case_type: Option<CaseType>,
    phase: Phase,
    video_url: Option<&'a str>,
    report: Vec<ReportRow>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Cases => {
            for case in CaseType::catalog() {
                println!("{:<12} {:<16} {}", case, case.title(), case.description());
            }
            Ok(())
        }
        Command::Run {
            video,
            case,
            probe_evidence,
        } => run(video, case, probe_evidence).await,
    }
}

fn describe_metrics() {
    metrics::describe_counter!("jobs_submitted_total", "Total analysis jobs created");
    metrics::describe_counter!("jobs_completed_total", "Total analysis jobs completed");
    metrics::describe_counter!(
        "jobs_failed_total",
        "Total analysis jobs the backend reported as failed"
    );
    metrics::describe_counter!("poll_ticks_total", "Total poll ticks executed");
    metrics::describe_counter!(
        "status_check_failures_total",
        "Status checks that failed to reach the backend"
    );
    metrics::describe_counter!(
        "report_fetch_failures_total",
        "Report fetches that failed to reach the backend"
    );
    metrics::describe_histogram!(
        "job_duration_seconds",
        "Time from job creation to a terminal status"
    );
}

async fn run(video: PathBuf, case: CaseType, probe_evidence: bool) -> Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration from environment")?;
    describe_metrics();

    tracing::info!(
        api_base_url = %config.base_url(),
        poll_interval_ms = config.poll_interval_ms,
        "Initializing smart-traffic-client"
    );

    let upload = VideoUpload::from_path(&video)
        .await
        .with_context(|| format!("Failed to read video {}", video.display()))?;
    if upload.is_empty() {
        bail!("Video {} is empty", video.display());
    }

    let mut lifecycle =
        JobLifecycle::from_config(&config).context("Failed to initialize backend client")?;

    tracing::info!(case = %case, title = case.title(), "Running detection module");
    if let Err(e) = lifecycle.submit(upload, case).await {
        tracing::error!(error = %e, "Submission failed");
    }

    let mut last_len = None;
    while lifecycle.phase() == Phase::Processing {
        let interrupted = tokio::select! {
            _ = tokio::signal::ctrl_c() => true,
            _ = lifecycle.step() => false,
        };
        if interrupted {
            tracing::warn!("Interrupted, stopping poller");
            lifecycle.reset();
            bail!("Interrupted before the analysis finished");
        }

        let len = lifecycle.report().len();
        if last_len != Some(len) {
            tracing::info!(records = len, "Live violation stream updated");
            last_len = Some(len);
        }
    }
    lifecycle.drain();

    let rows = lifecycle.report_rows();
    if probe_evidence {
        probe(&config, &rows).await?;
    }

    let state = lifecycle.state();
    let summary = Summary {
        job_id: state.job.as_ref().map(|j| j.id.as_str()),
        case_type: state.job.as_ref().map(|j| j.case_type),
        phase: state.phase,
        video_url: state.video_url.as_deref(),
        report: rows,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    match (state.phase, state.failure) {
        (Phase::Completed, _) => Ok(()),
        (_, Some(reason)) => bail!(reason.message()),
        (phase, None) => bail!("Session ended in unexpected phase {phase}"),
    }
}

async fn probe(config: &AppConfig, rows: &[ReportRow]) -> Result<()> {
    let loader = EvidenceLoader::new(config.request_timeout())
        .context("Failed to initialize evidence loader")?;

    let mut failed = 0usize;
    for row in rows {
        let evidence = loader.load(row.crop_url.as_deref()).await;
        if let Some(marker) = evidence.placeholder() {
            if row.crop_url.is_some() {
                failed += 1;
            }
            tracing::info!(frame = row.frame, vehicle_id = %row.vehicle_id, marker, "Evidence placeholder");
        }
    }

    tracing::info!(rows = rows.len(), failed, "Evidence probe complete");
    Ok(())
}
