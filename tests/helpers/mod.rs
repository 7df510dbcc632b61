//! In-process fake of the Smart Traffic AI backend for integration tests

#![allow(dead_code)]

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// One scripted HTTP answer.
#[derive(Debug, Clone)]
pub struct Scripted {
    pub code: StatusCode,
    pub body: Value,
}

impl Scripted {
    pub fn ok(body: Value) -> Self {
        Self {
            code: StatusCode::OK,
            body,
        }
    }

    pub fn fail(code: StatusCode) -> Self {
        Self {
            code,
            body: json!({ "detail": "scripted failure" }),
        }
    }
}

/// Multipart upload as received by the fake `/upload`.
#[derive(Debug, Clone, Default)]
pub struct ReceivedUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub file_len: usize,
    pub case_type: Option<String>,
}

#[derive(Default)]
pub struct FakeState {
    pub job_id: Mutex<String>,
    pub upload_status: Mutex<Option<StatusCode>>,
    pub statuses: Mutex<VecDeque<Scripted>>,
    pub reports: Mutex<VecDeque<Scripted>>,
    pub last_status: Mutex<Option<Scripted>>,
    pub last_report: Mutex<Option<Scripted>>,
    pub uploads: Mutex<Vec<ReceivedUpload>>,
    pub status_hits: Mutex<Vec<String>>,
    pub report_hits: Mutex<Vec<String>>,
    pub images: Mutex<Vec<(String, Vec<u8>)>>,
}

/// Fake backend bound to an ephemeral local port. Scripts are consumed in
/// order; once exhausted the last answer repeats.
pub struct FakeBackend {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        *state.job_id.lock().unwrap() = "job-1".to_string();

        let app = Router::new()
            .route("/upload", post(upload))
            .route("/status/{job_id}", get(status))
            .route("/report/{job_id}", get(report))
            .route("/media/{name}", get(media))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("No local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake backend error");
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_job_id(&self, id: &str) {
        *self.state.job_id.lock().unwrap() = id.to_string();
    }

    pub fn fail_uploads(&self, code: StatusCode) {
        *self.state.upload_status.lock().unwrap() = Some(code);
    }

    pub fn push_status(&self, answer: Scripted) {
        self.state.statuses.lock().unwrap().push_back(answer);
    }

    pub fn push_report(&self, answer: Scripted) {
        self.state.reports.lock().unwrap().push_back(answer);
    }

    pub fn add_image(&self, name: &str, bytes: &[u8]) {
        self.state
            .images
            .lock()
            .unwrap()
            .push((name.to_string(), bytes.to_vec()));
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub fn status_hits(&self) -> Vec<String> {
        self.state.status_hits.lock().unwrap().clone()
    }

    pub fn report_hits(&self) -> Vec<String> {
        self.state.report_hits.lock().unwrap().clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);
    format!("http://{}", addr)
}

fn respond(answer: Scripted) -> Response {
    (answer.code, Json(answer.body)).into_response()
}

fn next_answer(
    queue: &Mutex<VecDeque<Scripted>>,
    last: &Mutex<Option<Scripted>>,
    fallback: Value,
) -> Scripted {
    let mut last = last.lock().unwrap();
    if let Some(answer) = queue.lock().unwrap().pop_front() {
        *last = Some(answer.clone());
        return answer;
    }
    last.clone().unwrap_or_else(|| Scripted::ok(fallback))
}

async fn upload(State(state): State<Arc<FakeState>>, mut multipart: Multipart) -> Response {
    let mut received = ReceivedUpload::default();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                received.file_name = field.file_name().map(str::to_string);
                received.content_type = field.content_type().map(str::to_string);
                received.file_len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
            }
            Some("case_type") => {
                received.case_type = field.text().await.ok();
            }
            _ => {}
        }
    }

    state.uploads.lock().unwrap().push(received);

    if let Some(code) = *state.upload_status.lock().unwrap() {
        return respond(Scripted::fail(code));
    }
    let job_id = state.job_id.lock().unwrap().clone();
    respond(Scripted::ok(json!({ "job_id": job_id })))
}

async fn status(State(state): State<Arc<FakeState>>, Path(job_id): Path<String>) -> Response {
    state.status_hits.lock().unwrap().push(job_id);
    respond(next_answer(
        &state.statuses,
        &state.last_status,
        json!({ "status": "processing" }),
    ))
}

async fn report(State(state): State<Arc<FakeState>>, Path(job_id): Path<String>) -> Response {
    state.report_hits.lock().unwrap().push(job_id);
    respond(next_answer(&state.reports, &state.last_report, json!([])))
}

async fn media(State(state): State<Arc<FakeState>>, Path(name): Path<String>) -> Response {
    let images = state.images.lock().unwrap();
    match images.iter().find(|(n, _)| *n == name) {
        Some((_, bytes)) => ([(header::CONTENT_TYPE, "image/png")], bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
