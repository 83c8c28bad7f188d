use super::*;
use crate::model::{OutputTone, SubmitConfig, CONNECTION_FAILURE_MESSAGE, PROCESS_QUERY_PATH};
use crate::orchestrator::{SubmissionController, SubmitStatus, UiHandle};
use axum::{
    extract::{Multipart, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
struct ReceivedPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[derive(Clone, Default)]
struct Captured {
    hits: Arc<Mutex<usize>>,
    content_type: Arc<Mutex<Option<String>>>,
    parts: Arc<Mutex<Vec<ReceivedPart>>>,
}

/// Behaves like the analysis backend; the `prompt` field selects the reply.
async fn process_query(
    State(captured): State<Captured>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    *captured.hits.lock().unwrap() += 1;
    *captured.content_type.lock().unwrap() = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        parts.push(ReceivedPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    let prompt = parts
        .iter()
        .find(|p| p.name == "prompt")
        .map(|p| String::from_utf8_lossy(&p.data).into_owned());
    *captured.parts.lock().unwrap() = parts;

    match prompt.as_deref() {
        Some("reject") => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": "Invalid file type" })),
        ),
        Some("crash") => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))),
        _ => (
            StatusCode::OK,
            Json(json!({
                "thread_id": 1,
                "response": "OK-42",
                "status": "Succès",
                "model_used": "gemini"
            })),
        ),
    }
}

async fn bad_gateway() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "<html><body>Bad Gateway</body></html>")
}

async fn spawn_backend(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn spawn_process_query_backend() -> (String, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route(PROCESS_QUERY_PATH, post(process_query))
        .with_state(captured.clone());
    (spawn_backend(app).await, captured)
}

fn config_for(base_url: &str) -> SubmitConfig {
    SubmitConfig {
        base_url: base_url.to_string(),
        endpoint: format!("{base_url}{PROCESS_QUERY_PATH}"),
        user_agent: "query-submit-cli/test".into(),
        certificate_path: None,
    }
}

#[derive(Default)]
struct ScreenUi {
    busy: Mutex<bool>,
    output: Mutex<Option<(String, OutputTone)>>,
}

impl ScreenUi {
    fn output(&self) -> (String, OutputTone) {
        self.output.lock().unwrap().clone().expect("output written")
    }
}

impl UiHandle for ScreenUi {
    fn set_busy(&self, busy: bool) {
        *self.busy.lock().unwrap() = busy;
    }

    fn set_output(&self, text: &str, tone: OutputTone) {
        *self.output.lock().unwrap() = Some((text.to_string(), tone));
    }
}

fn controller_for(base_url: &str) -> SubmissionController<QueryClient, ScreenUi> {
    let client = QueryClient::new(&config_for(base_url)).unwrap();
    SubmissionController::new(client, ScreenUi::default())
}

fn form_with_prompt(prompt: &str) -> FormSubmission {
    let mut form = FormSubmission::default();
    form.push_text("prompt", prompt);
    form.push_file(
        "files",
        "ventes_mars.csv",
        "text/csv",
        b"ligne,montant\n45,1500000\n".to_vec(),
    );
    form.push_file("files", "scan.pdf", "application/pdf", vec![0x25, 0x50, 0x44, 0x46]);
    form
}

#[tokio::test]
async fn posts_multipart_form_to_fixed_path() {
    let (base_url, captured) = spawn_process_query_backend().await;
    let ctrl = controller_for(&base_url);

    let status = ctrl.submit(form_with_prompt("analyse")).await;

    assert!(matches!(status, SubmitStatus::Settled(_)));
    assert_eq!(*captured.hits.lock().unwrap(), 1);

    let content_type = captured.content_type.lock().unwrap().clone().unwrap();
    assert!(
        content_type.starts_with("multipart/form-data; boundary="),
        "unexpected content type {content_type}"
    );

    let parts = captured.parts.lock().unwrap().clone();
    let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["prompt", "files", "files"]);
    assert_eq!(parts[0].data, b"analyse");
    assert_eq!(parts[0].file_name, None);
    assert_eq!(parts[1].file_name.as_deref(), Some("ventes_mars.csv"));
    assert_eq!(parts[1].content_type.as_deref(), Some("text/csv"));
    assert_eq!(parts[1].data, b"ligne,montant\n45,1500000\n");
    assert_eq!(parts[2].file_name.as_deref(), Some("scan.pdf"));
    assert_eq!(parts[2].data, [0x25, 0x50, 0x44, 0x46]);
}

#[tokio::test]
async fn success_body_is_displayed_in_neutral_tone() {
    let (base_url, _) = spawn_process_query_backend().await;
    let ctrl = controller_for(&base_url);

    let status = ctrl.submit(form_with_prompt("analyse")).await;

    assert_eq!(ctrl.ui().output(), ("OK-42".to_string(), OutputTone::Neutral));
    assert!(!*ctrl.ui().busy.lock().unwrap());
    match status {
        SubmitStatus::Settled(crate::model::Outcome::Success {
            thread_id,
            model_used,
            ..
        }) => {
            assert_eq!(thread_id, Some(1));
            assert_eq!(model_used.as_deref(), Some("gemini"));
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn rejection_shows_status_and_detail() {
    let (base_url, _) = spawn_process_query_backend().await;
    let ctrl = controller_for(&base_url);

    ctrl.submit(form_with_prompt("reject")).await;

    let (text, tone) = ctrl.ui().output();
    assert!(text.contains("422"), "{text}");
    assert!(text.contains("Invalid file type"), "{text}");
    assert_eq!(tone, OutputTone::Error);
}

#[tokio::test]
async fn rejection_without_detail_uses_fallback() {
    let (base_url, _) = spawn_process_query_backend().await;
    let ctrl = controller_for(&base_url);

    ctrl.submit(form_with_prompt("crash")).await;

    assert_eq!(
        ctrl.ui().output(),
        ("Error 500: Unknown error".to_string(), OutputTone::Error)
    );
}

#[tokio::test]
async fn non_json_body_is_a_connection_failure() {
    let app = Router::new().route(PROCESS_QUERY_PATH, post(bad_gateway));
    let base_url = spawn_backend(app).await;
    let ctrl = controller_for(&base_url);

    let status = ctrl.submit(form_with_prompt("analyse")).await;

    assert_eq!(
        ctrl.ui().output(),
        (CONNECTION_FAILURE_MESSAGE.to_string(), OutputTone::Error)
    );
    assert!(matches!(
        status,
        SubmitStatus::Settled(crate::model::Outcome::Transport { .. })
    ));
}

#[tokio::test]
async fn unreachable_backend_is_a_connection_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let ctrl = controller_for(&format!("http://{addr}"));

    ctrl.submit(form_with_prompt("analyse")).await;

    assert_eq!(
        ctrl.ui().output(),
        (CONNECTION_FAILURE_MESSAGE.to_string(), OutputTone::Error)
    );
    assert!(!*ctrl.ui().busy.lock().unwrap());
}

#[tokio::test]
async fn transport_reports_raw_status_and_body() {
    let (base_url, _) = spawn_process_query_backend().await;
    let client = QueryClient::new(&config_for(&base_url)).unwrap();
    assert_eq!(client.endpoint(), format!("{base_url}/api/process_query"));

    let raw = client.post_form(form_with_prompt("reject")).await.unwrap();

    assert_eq!(raw.status, 422);
    assert!(!raw.is_success());
    let body: Value = serde_json::from_slice(&raw.body).unwrap();
    assert_eq!(body["detail"], "Invalid file type");
}

#[test]
fn unreadable_certificate_fails_client_construction() {
    let mut cfg = config_for("https://127.0.0.1:8443");
    cfg.certificate_path = Some("/definitely/missing/ca.pem".into());
    assert!(QueryClient::new(&cfg).is_err());
}
