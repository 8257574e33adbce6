use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hushlog_anonymizer::JobContext;
use hushlog_core::models::model::ModelSelector;
use hushlog_core::models::project::ProjectId;
use hushlog_core::models::query_record::QueryRecord;
use hushlog_lambda::router;
use hushlog_lambda::state::AppState;
use hushlog_openai::client::OpenAiClient;
use hushlog_storage::memory::{InMemoryQueryLogStore, InMemoryUsageRecorder};

struct TestApp {
    router: axum::Router,
    store: InMemoryQueryLogStore,
    usage: InMemoryUsageRecorder,
    server: MockServer,
}

async fn build_app() -> TestApp {
    let server = MockServer::start().await;
    let store = InMemoryQueryLogStore::new();
    let usage = InMemoryUsageRecorder::new();
    let completions =
        OpenAiClient::new(format!("{}/v1", server.uri()), Duration::from_secs(5)).expect("client");

    let state = AppState {
        job: JobContext {
            store: Arc::new(store.clone()),
            usage: Arc::new(usage.clone()),
            completions: Arc::new(completions),
            model: ModelSelector::ANONYMIZER,
            default_api_key: "sk-test".to_string(),
        },
    };

    TestApp {
        router: router(state),
        store,
        usage,
        server,
    }
}

fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 90, "completion_tokens": 60, "total_tokens": 150 }
    })
}

async fn send(app: &TestApp, method: &str, uri: &str) -> (StatusCode, header::HeaderMap, Value) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, headers, json)
}

async fn seed_abc(store: &InMemoryQueryLogStore, project: &ProjectId) {
    for id in ["a", "b", "c"] {
        store
            .insert(
                project,
                QueryRecord::new(id, Some(&format!("I am Dana ({id})")), Some("Hello Dana")),
            )
            .await;
    }
}

#[tokio::test]
async fn post_is_rejected_with_allow_header() {
    let app = build_app().await;

    let (status, headers, body) = send(&app, "POST", "/").await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers.get(header::ALLOW).unwrap(), "GET");
    assert!(body["error"].is_string());

    let (status, _, _) = send(&app, "DELETE", "/anonymize?projectId=p1").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn get_for_project_anonymizes_batch() {
    let app = build_app().await;
    let project = ProjectId::new("p1").unwrap();
    seed_abc(&app.store, &project).await;

    let reply = json!([
        { "id": "a", "prompt": "I am [NAME] (a)", "response": "Hello [NAME]" },
        { "id": "b", "prompt": "I am [NAME] (b)", "response": "Hello [NAME]" },
        { "id": "c", "prompt": "I am [NAME] (c)", "response": "Hello [NAME]" }
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&reply.to_string())))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, _, body) = send(&app, "GET", "/?projectId=p1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "processed": 3 }));
    for id in ["a", "b", "c"] {
        let record = app.store.get(&project, id).await.unwrap();
        assert!(record.processed);
        assert_eq!(record.response.as_deref(), Some("Hello [NAME]"));
    }

    let events = app.usage.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tokens, 150);
}

#[tokio::test]
async fn idle_project_makes_no_completion_call() {
    let app = build_app().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("[]")))
        .expect(0)
        .mount(&app.server)
        .await;

    let (status, _, body) = send(&app, "GET", "/anonymize?projectId=empty").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 0);
    assert_eq!(app.store.write_count().await, 0);
}

#[tokio::test]
async fn malformed_model_output_reports_zero() {
    let app = build_app().await;
    let project = ProjectId::new("p1").unwrap();
    seed_abc(&app.store, &project).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body("Here you go: not json")),
        )
        .mount(&app.server)
        .await;

    let (status, _, body) = send(&app, "GET", "/?projectId=p1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "processed": 0 }));
    assert_eq!(app.store.write_count().await, 0);
}

#[tokio::test]
async fn upstream_error_still_returns_ok() {
    let app = build_app().await;
    let project = ProjectId::new("p1").unwrap();
    seed_abc(&app.store, &project).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "message": "upstream exploded", "type": "server_error" }
        })))
        .mount(&app.server)
        .await;

    let (status, _, body) = send(&app, "GET", "/?projectId=p1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 0);
    assert!(!app.store.get(&project, "a").await.unwrap().processed);
}

#[tokio::test]
async fn without_project_walks_the_backlog() {
    let app = build_app().await;
    let p1 = ProjectId::new("p1").unwrap();
    let p2 = ProjectId::new("p2").unwrap();
    app.store
        .insert(&p1, QueryRecord::new("x", Some("Call me Sam"), None))
        .await;
    app.store
        .insert(&p2, QueryRecord::new("y", Some("Call me Alex"), None))
        .await;

    // Both projects get the same canned answer; only the id matching each
    // project's record is written, the other entry is a logged miss.
    let reply = json!([
        { "id": "x", "prompt": "Call me [NAME]", "response": null },
        { "id": "y", "prompt": "Call me [NAME]", "response": null }
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&reply.to_string())))
        .expect(2)
        .mount(&app.server)
        .await;

    let (status, _, body) = send(&app, "GET", "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 4);
    assert!(app.store.get(&p1, "x").await.unwrap().processed);
    assert!(app.store.get(&p2, "y").await.unwrap().processed);
}

#[tokio::test]
async fn empty_project_id_means_backlog() {
    let app = build_app().await;
    let (status, _, body) = send(&app, "GET", "/?projectId=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 0);
}

#[tokio::test]
async fn unreadable_query_falls_back_to_backlog() {
    let app = build_app().await;
    let project = ProjectId::new("p3").unwrap();
    seed_abc(&app.store, &project).await;

    let reply = json!([
        { "id": "a", "prompt": "I am [NAME] (a)", "response": "Hello [NAME]" },
        { "id": "b", "prompt": "I am [NAME] (b)", "response": "Hello [NAME]" },
        { "id": "c", "prompt": "I am [NAME] (c)", "response": "Hello [NAME]" }
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&reply.to_string())))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, _, body) = send(&app, "GET", "/anonymize?projectId=p1&projectId=p2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "processed": 3 }));
    assert!(app.store.get(&project, "a").await.unwrap().processed);
}

#[tokio::test]
async fn health_is_ok() {
    let app = build_app().await;
    let (status, _, body) = send(&app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
