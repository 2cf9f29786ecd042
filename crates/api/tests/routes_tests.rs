//! Route-level tests exercising the full router and middleware stack
//! against a scripted transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use prism_core::artifact::OutputDescriptor;
use prism_core::status::ProviderStatus;
use prism_core::tools::SubmitField;
use prism_core::types::TaskId;
use prism_orchestrator::{ProviderTransport, TransportError};

use prism_api::config::ServerConfig;
use prism_api::router::build_app_router;
use prism_api::state::AppState;
use prism_api::task_index::{InMemoryTaskIndex, TaskIndex, TaskRecord};

#[derive(Default)]
struct MockTransport {
    submit_results: Mutex<VecDeque<Result<TaskId, TransportError>>>,
    statuses: Mutex<VecDeque<Result<ProviderStatus, TransportError>>>,
    outputs: Mutex<Vec<OutputDescriptor>>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
    outputs_calls: AtomicUsize,
}

#[async_trait]
impl ProviderTransport for MockTransport {
    async fn upload_asset(&self, _file_name: &str, _bytes: Vec<u8>) -> Result<String, TransportError> {
        Ok("asset-1".to_string())
    }

    async fn submit(&self, _endpoint: &str, _fields: &[SubmitField]) -> Result<TaskId, TransportError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submit_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("task-9".to_string()))
    }

    async fn fetch_status(&self, _task_id: &str) -> Result<ProviderStatus, TransportError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(ProviderStatus {
                raw_status: "RUNNING".to_string(),
                progress: None,
            })
        })
    }

    async fn fetch_outputs(&self, _task_id: &str) -> Result<Vec<OutputDescriptor>, TransportError> {
        self.outputs_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outputs.lock().unwrap().clone())
    }
}

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 5,
        provider_base_url: "http://provider.invalid".to_string(),
        provider_api_key: String::new(),
        poll_interval_secs: 1,
        poll_max_attempts: 200,
        poll_transient_retries: 3,
        history_capacity: 50,
    }
}

fn app(transport: Arc<MockTransport>) -> (Router, Arc<InMemoryTaskIndex>) {
    let config = test_config();
    let task_index = Arc::new(InMemoryTaskIndex::new(config.history_capacity));
    let state = AppState {
        transport,
        task_index: Arc::clone(&task_index) as Arc<dyn TaskIndex>,
        config: Arc::new(config.clone()),
    };
    (build_app_router(state, &config), task_index)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

const BOUNDARY: &str = "test-boundary";

fn multipart_params(params: &Value) -> (String, Body) {
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"params\"\r\n\r\n{params}\r\n--{BOUNDARY}--\r\n"
    );
    (
        format!("multipart/form-data; boundary={BOUNDARY}"),
        Body::from(body),
    )
}

fn generate_request(tool_id: &str, params: &Value) -> Request<Body> {
    let (content_type, body) = multipart_params(params);
    Request::builder()
        .method("POST")
        .uri(format!("/api/v1/generate/{tool_id}"))
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (app, _) = app(Arc::new(MockTransport::default()));

    let response = app.oneshot(get("/healthz")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn tools_listing_exposes_the_registry() {
    let (app, _) = app(Arc::new(MockTransport::default()));

    let response = app.oneshot(get("/api/v1/tools")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let tools = body["data"].as_array().unwrap();
    assert!(tools.iter().any(|t| t["id"] == "text-to-image"));

    let i2i = tools.iter().find(|t| t["id"] == "image-to-image").unwrap();
    assert_eq!(i2i["assetKeys"], json!(["image"]));
    assert_eq!(i2i["expectedOutputs"], json!(["image"]));
}

#[tokio::test]
async fn generate_accepts_and_returns_the_task_handle() {
    let transport = Arc::new(MockTransport::default());
    let (app, index) = app(Arc::clone(&transport));

    let response = app
        .oneshot(generate_request(
            "text-to-image",
            &json!({ "prompt": "a red balloon" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["taskId"], "task-9");
    assert_eq!(transport.submit_calls.load(Ordering::SeqCst), 1);

    // The submission is recorded for later status lookups.
    assert!(index.get("task-9").await.is_some());
}

#[tokio::test]
async fn generate_rejects_unknown_tools() {
    let (app, _) = app(Arc::new(MockTransport::default()));

    let response = app
        .oneshot(generate_request("text-to-music", &json!({ "prompt": "x" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNKNOWN_TOOL");
}

#[tokio::test]
async fn generate_requires_the_params_part() {
    let (app, _) = app(Arc::new(MockTransport::default()));

    let body = format!("--{BOUNDARY}--\r\n");
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/generate/text-to-image")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generate_surfaces_validation_errors() {
    let transport = Arc::new(MockTransport::default());
    let (app, _) = app(Arc::clone(&transport));

    let response = app
        .oneshot(generate_request("text-to-image", &json!({ "prompt": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(transport.submit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn generate_maps_queue_full_to_conflict() {
    let transport = Arc::new(MockTransport::default());
    transport
        .submit_results
        .lock()
        .unwrap()
        .push_back(Err(TransportError::Api {
            code: 42901,
            message: "queue is full".to_string(),
        }));
    let (app, _) = app(Arc::clone(&transport));

    let response = app
        .oneshot(generate_request(
            "text-to-image",
            &json!({ "prompt": "a red balloon" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["code"], "QUEUE_FULL");
}

#[tokio::test]
async fn status_of_unknown_task_is_not_found() {
    let (app, _) = app(Arc::new(MockTransport::default()));

    let response = app
        .oneshot(get("/api/v1/tasks/task-404/status"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNKNOWN_TASK");
}

#[tokio::test]
async fn status_translates_and_reports_progress() {
    let transport = Arc::new(MockTransport::default());
    transport.statuses.lock().unwrap().push_back(Ok(ProviderStatus {
        raw_status: "IN_PROGRESS".to_string(),
        progress: Some(40),
    }));
    let (app, index) = app(Arc::clone(&transport));
    index
        .insert(TaskRecord::new("task-9".into(), "text-to-image"))
        .await;

    let response = app
        .oneshot(get("/api/v1/tasks/task-9/status"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "running");
    assert_eq!(body["data"]["progress"], 40);
    assert!(body["data"].get("artifacts").is_none());
}

#[tokio::test]
async fn status_progress_is_monotonic_across_requests() {
    let transport = Arc::new(MockTransport::default());
    {
        let mut statuses = transport.statuses.lock().unwrap();
        statuses.push_back(Ok(ProviderStatus {
            raw_status: "RUNNING".to_string(),
            progress: Some(60),
        }));
        statuses.push_back(Ok(ProviderStatus {
            raw_status: "RUNNING".to_string(),
            progress: Some(30),
        }));
    }
    let (app, index) = app(Arc::clone(&transport));
    index
        .insert(TaskRecord::new("task-9".into(), "text-to-image"))
        .await;

    let first = app
        .clone()
        .oneshot(get("/api/v1/tasks/task-9/status"))
        .await
        .unwrap();
    assert_eq!(body_json(first).await["data"]["progress"], 60);

    let second = app
        .oneshot(get("/api/v1/tasks/task-9/status"))
        .await
        .unwrap();
    assert_eq!(body_json(second).await["data"]["progress"], 60);
}

#[tokio::test]
async fn status_of_completed_task_includes_artifacts() {
    let transport = Arc::new(MockTransport::default());
    transport.statuses.lock().unwrap().push_back(Ok(ProviderStatus {
        raw_status: "COMPLETED".to_string(),
        progress: None,
    }));
    transport.outputs.lock().unwrap().push(OutputDescriptor {
        file_url: "https://x/img.png".to_string(),
        file_type: Some("image/png".to_string()),
    });
    let (app, index) = app(Arc::clone(&transport));
    index
        .insert(TaskRecord::new("task-9".into(), "text-to-image"))
        .await;

    let response = app
        .oneshot(get("/api/v1/tasks/task-9/status"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["progress"], 100);
    assert_eq!(body["data"]["artifacts"], json!(["https://x/img.png"]));
}

#[tokio::test]
async fn status_of_a_terminal_task_is_served_from_the_index() {
    let transport = Arc::new(MockTransport::default());
    transport.statuses.lock().unwrap().push_back(Ok(ProviderStatus {
        raw_status: "COMPLETED".to_string(),
        progress: None,
    }));
    transport.outputs.lock().unwrap().push(OutputDescriptor {
        file_url: "https://x/img.png".to_string(),
        file_type: Some("image/png".to_string()),
    });
    let (app, index) = app(Arc::clone(&transport));
    index
        .insert(TaskRecord::new("task-9".into(), "text-to-image"))
        .await;

    let first = app
        .clone()
        .oneshot(get("/api/v1/tasks/task-9/status"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // The second request never reaches the provider.
    let second = app
        .oneshot(get("/api/v1/tasks/task-9/status"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let body = body_json(second).await;
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["progress"], 100);
    assert_eq!(body["data"]["artifacts"], json!(["https://x/img.png"]));
    assert_eq!(transport.status_calls.load(Ordering::SeqCst), 1);
    assert_eq!(transport.outputs_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_task_keeps_its_error_across_requests() {
    let transport = Arc::new(MockTransport::default());
    transport.statuses.lock().unwrap().push_back(Ok(ProviderStatus {
        raw_status: "FAILED".to_string(),
        progress: None,
    }));
    let (app, index) = app(Arc::clone(&transport));
    index
        .insert(TaskRecord::new("task-9".into(), "text-to-image"))
        .await;

    let first = app
        .clone()
        .oneshot(get("/api/v1/tasks/task-9/status"))
        .await
        .unwrap();
    let first_body = body_json(first).await;
    assert_eq!(first_body["data"]["status"], "failed");
    assert!(first_body["data"]["error"]
        .as_str()
        .unwrap()
        .contains("FAILED"));

    let second = app
        .oneshot(get("/api/v1/tasks/task-9/status"))
        .await
        .unwrap();
    let second_body = body_json(second).await;
    assert_eq!(second_body["data"], first_body["data"]);
    assert_eq!(transport.status_calls.load(Ordering::SeqCst), 1);
}
