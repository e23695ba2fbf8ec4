//! In-process mock of the generation backend, served by axum on a random port.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub const KNOWN_JOB_ID: &str = "abc123";

/// Scripted backend state shared with the handlers.
#[derive(Default)]
pub struct MockBackend {
    /// Responses served for `KNOWN_JOB_ID`, one per poll. The last one
    /// repeats once the queue runs dry.
    pub job_responses: Mutex<VecDeque<(StatusCode, Value)>>,
    last_job_response: Mutex<Option<(StatusCode, Value)>>,
    pub submit_response: Mutex<Option<(StatusCode, Value)>>,
    pub submitted: Mutex<Vec<Value>>,
    pub voice_uploads: Mutex<Vec<(String, Bytes)>>,
    pub job_hits: AtomicUsize,
}

impl MockBackend {
    pub fn with_job_responses(responses: Vec<(StatusCode, Value)>) -> Arc<Self> {
        let backend = Self::default();
        *backend.job_responses.lock().unwrap() = responses.into();
        Arc::new(backend)
    }

    pub fn job_hits(&self) -> usize {
        self.job_hits.load(Ordering::SeqCst)
    }
}

pub fn job_json(status: &str, progress: i64, download_url: Option<&str>) -> Value {
    let mut body = json!({
        "jobId": KNOWN_JOB_ID,
        "status": status,
        "progress": progress,
        "message": format!("{} {}%", status.to_lowercase(), progress),
    });
    if let Some(url) = download_url {
        body["downloadUrl"] = json!(url);
    }
    body
}

async fn submit_story(
    State(backend): State<Arc<MockBackend>>,
    Json(body): Json<Value>,
) -> Response {
    backend.submitted.lock().unwrap().push(body);
    match backend.submit_response.lock().unwrap().clone() {
        Some((status, value)) => (status, Json(value)).into_response(),
        None => Json(json!({ "jobId": KNOWN_JOB_ID })).into_response(),
    }
}

async fn get_job(State(backend): State<Arc<MockBackend>>, Path(job_id): Path<String>) -> Response {
    backend.job_hits.fetch_add(1, Ordering::SeqCst);
    if job_id != KNOWN_JOB_ID {
        // Mirrors the backend: unknown ids are rejected with 400 and plain text.
        return (
            StatusCode::BAD_REQUEST,
            format!("Job not found: {}", job_id),
        )
            .into_response();
    }

    let next = backend.job_responses.lock().unwrap().pop_front();
    let response = match next {
        Some(response) => {
            *backend.last_job_response.lock().unwrap() = Some(response.clone());
            response
        }
        None => backend
            .last_job_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or((StatusCode::OK, job_json("RUNNING", 0, None))),
    };
    (response.0, Json(response.1)).into_response()
}

async fn clone_voice(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.starts_with("multipart/form-data") {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "expected multipart" })))
            .into_response();
    }
    let has_label = String::from_utf8_lossy(&body).contains("name=\"label\"");
    backend
        .voice_uploads
        .lock()
        .unwrap()
        .push((content_type, body));
    Json(json!({
        "voiceId": "voice-42",
        "label": if has_label { json!("Narrator") } else { Value::Null },
    }))
    .into_response()
}

/// Serve `backend` on a random local port and return its base URL.
pub async fn spawn_mock_backend(backend: Arc<MockBackend>) -> (String, tokio::task::JoinHandle<()>) {
    let router = Router::new()
        .route("/api/v1/stories", post(submit_story))
        .route("/api/v1/jobs/{job_id}", get(get_job))
        .route("/api/v1/voices", post(clone_voice))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to random port");
    let addr = listener.local_addr().expect("get local addr");
    let base_url = format!("http://{}", addr);

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    (base_url, handle)
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to random port");
    let addr = listener.local_addr().expect("get local addr");
    drop(listener);
    format!("http://{}", addr)
}
