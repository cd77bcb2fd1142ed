use std::path::{Path, PathBuf};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use cndocs_backend::config::{Config, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

fn content_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cndocs-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(dir.join("networking")).expect("create content dir");
    std::fs::write(
        dir.join("networking").join("osi.mdx"),
        "---\ntitle: \"OSI Model\"\ndescription: Seven layers\n---\n\n# OSI\n\nThe network layer routes packets.\n",
    )
    .expect("write doc");
    dir
}

fn test_config(content_dir: &Path) -> Config {
    Config {
        server_address: "127.0.0.1:0".to_string(),
        llm_api_key: "sk-test".to_string(),
        llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
        llm_model: DEFAULT_LLM_MODEL.to_string(),
        posthog_host: url::Url::parse("http://localhost:8000").expect("url"),
        posthog_project_id: "1".to_string(),
        posthog_api_key: "phx_test".to_string(),
        content_dir: content_dir.to_string_lossy().into_owned(),
        public_rps: 100,
        lockdown_warning_seconds: 5,
        session_ttl_minutes: 60,
        shuffle_options: false,
    }
}

fn app() -> Router {
    let dir = content_dir();
    let config = test_config(&dir);
    let state = cndocs_backend::AppState::new(&config).expect("app state");
    cndocs_backend::routes::router(state, config.public_rps)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["trackedSessions"], 0);
}

#[tokio::test]
async fn mdx_returns_document_with_frontmatter() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/mdx",
        Some(json!({ "filePath": "networking/osi" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "OSI Model");
    assert_eq!(body["description"], "Seven layers");
    assert!(body["content"].as_str().unwrap().contains("routes packets"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/mdx",
        Some(json!({ "filePath": "networking/missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, "POST", "/api/mdx", Some(json!({ "filePath": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quiz_session_flow_over_http() {
    let app = app();
    let quiz = json!({
        "title": "OSI Model",
        "questions": [
            {
                "type": "multiple-choice",
                "question": "Which layer routes packets?",
                "options": ["Physical", "Network", "Session"],
                "correctAnswer": 1,
                "explanation": "Layer 3."
            },
            {
                "type": "fill-blank",
                "question": "The ____ layer sits above the network layer.",
                "correctAnswer": "Transport"
            }
        ]
    });

    let (status, view) = send(
        &app,
        "POST",
        "/api/quiz/sessions",
        Some(json!({ "quiz": quiz, "lockdownSupported": false })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(view["phase"], "inProgress");
    assert_eq!(view["totalQuestions"], 2);
    assert!(view["question"].get("correctAnswer").is_none());
    let id = view["id"].as_str().unwrap().to_string();

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["trackedSessions"], 1);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/quiz/sessions/{}/advance", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, view) = send(
        &app,
        "PUT",
        &format!("/api/quiz/sessions/{}/answer", id),
        Some(json!({ "answer": { "kind": "option", "value": 0 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["answered"], true);
    assert!(view.get("feedback").is_none());
    // a wrong answer must not reveal the right one before submission
    for view in [
        view,
        send(&app, "GET", &format!("/api/quiz/sessions/{}", id), None).await.1,
    ] {
        let text = view.to_string();
        assert!(!text.contains("correctAnswer"));
        assert!(!text.contains("isCorrect"));
        assert!(!text.contains("Layer 3."));
    }

    let (status, view) = send(
        &app,
        "PUT",
        &format!("/api/quiz/sessions/{}/answer", id),
        Some(json!({ "answer": { "kind": "option", "value": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["answered"], true);
    assert!(view.get("feedback").is_none());
    assert_eq!(view["nextAction"], "next");

    let (status, view) = send(
        &app,
        "POST",
        &format!("/api/quiz/sessions/{}/advance", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["currentIndex"], 1);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/quiz/sessions/{}/answer", id),
        Some(json!({ "answer": { "kind": "text", "value": "  transport " } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, report) = send(
        &app,
        "POST",
        &format!("/api/quiz/sessions/{}/submit", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["correctCount"], 2);
    assert_eq!(report["percentage"], 100);
    assert_eq!(report["tier"], "mastery");
    assert_eq!(report["answers"][0]["correctAnswer"], "Network");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/quiz/sessions/{}/submit", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "DELETE", &format!("/api/quiz/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/api/quiz/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_quiz_is_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/quiz/sessions",
        Some(json!({
            "quiz": {
                "title": "Broken",
                "questions": [
                    { "type": "multiple-choice", "question": "Pick one", "options": ["a"], "correctAnswer": 0 }
                ]
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("question 1"));

    let (status, _) = send(&app, "POST", "/api/quiz/sessions", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn analytics_rejects_bad_period() {
    let app = app();
    let (status, _) = send(&app, "GET", "/api/analytics?period=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, "GET", "/api/analytics/sessions?period=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
