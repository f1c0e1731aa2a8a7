//! Adapter integration tests.
//!
//! Starts a stub axum server on an ephemeral port and exercises it with the
//! real adapter.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use notes_client::{
    api::{CallOptions, ClientError, NotesApi},
    config::ClientConfig,
    model::{Note, NoteDraft},
    resilience::RetryPolicy,
    state::{NOTE_CREATED, NOTE_DELETED, NotesController, NotesView},
};
use reqwest::Method;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

type Hits = Arc<AtomicU32>;

fn note_json(id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "content": format!("{title} body"),
        "created_at": "2024-01-02T03:04:05Z",
        "updated_at": "2024-01-02T03:04:05Z",
    })
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::from_millis(10),
        ..RetryPolicy::default()
    }
}

fn api_for(api_url: String) -> NotesApi {
    let cfg = ClientConfig {
        api_url,
        ..ClientConfig::default()
    };
    NotesApi::new(&cfg).unwrap().with_retry_policy(fast_retry())
}

/// Bind to port 0 and return the API base URL.
async fn start_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

async fn flaky_list(State(hits): State<Hits>) -> Response {
    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "message": "Internal server error"})),
        )
            .into_response();
    }
    Json(json!({"success": true, "data": [note_json(1, "A")]})).into_response()
}

async fn missing_note(State(hits): State<Hits>) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::NOT_FOUND,
        Json(json!({"success": false, "message": "Resource not found"})),
    )
        .into_response()
}

async fn rejected_create(State(hits): State<Hits>) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "success": false,
            "message": "Validation failed",
            "errors": {
                "content": ["The content field is required."],
                "title": ["The title field is required."],
            },
        })),
    )
        .into_response()
}

#[tokio::test]
async fn server_error_then_success_retries_once() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/api/notes", get(flaky_list))
        .with_state(hits.clone());
    let api = api_for(start_stub(app).await);

    let (result, report) = api
        .execute::<Vec<Note>, ()>(Method::GET, "/notes", None, CallOptions::default())
        .await;

    let envelope = result.unwrap();
    assert!(envelope.success);
    assert_eq!(envelope.data.unwrap()[0].title, "A");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(report.attempts, 2);
    assert_eq!(report.delays, [Duration::from_millis(10)]);
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api_url = format!("http://{addr}/api");
    let api = api_for(api_url.clone());

    let (result, report) = api
        .execute::<Vec<Note>, ()>(Method::GET, "/notes", None, CallOptions::default())
        .await;

    let error = result.unwrap_err();
    assert!(error.is_network());
    assert_eq!(
        error.to_string(),
        format!("Cannot connect to server. Please check if the backend is running on {api_url}")
    );
    assert_eq!(report.attempts, 4);
    assert_eq!(
        report.delays,
        [
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(40)
        ]
    );
}

#[tokio::test]
async fn validation_errors_are_joined_and_not_retried() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/api/notes", get(flaky_list).post(rejected_create))
        .with_state(hits.clone());
    let api = api_for(start_stub(app).await);

    let draft = NoteDraft {
        title: String::new(),
        content: String::new(),
    };
    let error = api.create(&draft).await.unwrap_err();

    match error {
        ClientError::Validation { message, errors } => {
            assert_eq!(
                message,
                "The content field is required., The title field is required."
            );
            assert!(errors.contains_key("title"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn not_found_uses_server_message_once() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/api/notes/{id}", get(missing_note))
        .with_state(hits.clone());
    let api = api_for(start_stub(app).await);

    let error = api.get(42).await.unwrap_err();

    assert!(matches!(
        &error,
        ClientError::Server { status, .. } if *status == StatusCode::NOT_FOUND
    ));
    assert_eq!(error.to_string(), "Resource not found");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn explicit_timeout_overrides_verb_default() {
    let app = Router::new().route(
        "/api/notes",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Json(json!({"success": true, "data": []}))
        }),
    );
    let api = api_for(start_stub(app).await).with_retry_policy(RetryPolicy {
        max_retries: 0,
        ..fast_retry()
    });

    let (result, report) = api
        .execute::<Vec<Note>, ()>(
            Method::GET,
            "/notes",
            None,
            CallOptions {
                timeout: Some(Duration::from_millis(50)),
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(ClientError::Network {
            timed_out: true,
            ..
        })
    ));
    assert_eq!(report.attempts, 1);
}

#[tokio::test]
async fn controller_reconciles_view_without_refetch() {
    let hits = Hits::default();
    let app = Router::new()
        .route(
            "/api/notes",
            get(|State(hits): State<Hits>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!({"success": true, "data": [note_json(1, "A")]}))
            })
            .post(|| async {
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "success": true,
                        "message": "Note created successfully",
                        "data": note_json(2, "B"),
                    })),
                )
            }),
        )
        .route(
            "/api/notes/{id}",
            axum::routing::delete(|| async {
                Json(json!({"success": true, "message": "Note deleted successfully"}))
            }),
        )
        .with_state(hits.clone());
    let api = api_for(start_stub(app).await);

    let mut view = NotesView::new(Duration::from_secs(3));
    let controller = NotesController::new(api, view.sender());

    controller.refresh().await;
    controller
        .create(NoteDraft {
            title: "B".to_string(),
            content: "B body".to_string(),
        })
        .await;
    view.drain();

    let state = view.state();
    assert!(!state.loading);
    assert_eq!(state.notes.iter().map(|n| n.id).collect::<Vec<_>>(), [2, 1]);
    assert_eq!(
        state.notice.as_ref().map(|n| n.message.as_str()),
        Some(NOTE_CREATED)
    );

    controller.delete(1).await;
    view.drain();

    let state = view.state();
    assert_eq!(state.notes.iter().map(|n| n.id).collect::<Vec<_>>(), [2]);
    assert_eq!(
        state.notice.as_ref().map(|n| n.message.as_str()),
        Some(NOTE_DELETED)
    );
    assert_eq!(state.error, None);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn controller_records_classified_failure() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/api/notes/{id}", get(missing_note).put(missing_note))
        .with_state(hits);
    let api = api_for(start_stub(app).await);

    let mut view = NotesView::new(Duration::from_secs(3));
    let controller = NotesController::new(api, view.sender());

    controller
        .update(
            7,
            NoteDraft {
                title: "T".to_string(),
                content: "C".to_string(),
            },
        )
        .await;
    view.drain();

    let state = view.state();
    assert_eq!(state.error.as_deref(), Some("Resource not found"));
    assert!(!state.in_flight.updating);
    assert_eq!(state.notice, None);
}

#[tokio::test]
async fn concurrent_commands_keep_independent_flags() {
    let gate = Arc::new(Semaphore::new(0));
    let app = Router::new()
        .route(
            "/api/notes",
            axum::routing::post(|State(gate): State<Arc<Semaphore>>| async move {
                gate.acquire().await.unwrap().forget();
                (
                    StatusCode::CREATED,
                    Json(json!({"success": true, "data": note_json(2, "B")})),
                )
            }),
        )
        .route(
            "/api/notes/{id}",
            axum::routing::delete(|State(gate): State<Arc<Semaphore>>| async move {
                gate.acquire().await.unwrap().forget();
                Json(json!({"success": true, "message": "Note deleted successfully"}))
            }),
        )
        .with_state(gate.clone());
    let api = api_for(start_stub(app).await);

    let mut view = NotesView::new(Duration::from_secs(3));
    let controller = NotesController::new(api, view.sender());

    let observe = async {
        view.next().await;
        view.next().await;
        let in_flight = view.state().in_flight;
        gate.add_permits(2);
        in_flight
    };
    let (in_flight, (), ()) = tokio::join!(
        observe,
        controller.create(NoteDraft {
            title: "B".to_string(),
            content: "B body".to_string(),
        }),
        controller.delete(1),
    );

    assert!(in_flight.creating);
    assert!(in_flight.deleting);
    assert!(!in_flight.updating);

    view.drain();
    let state = view.state();
    assert!(!state.in_flight.creating);
    assert!(!state.in_flight.deleting);
    assert_eq!(state.notes.iter().map(|n| n.id).collect::<Vec<_>>(), [2]);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn invalid_draft_is_rejected_before_sending() {
    let hits = Hits::default();
    let app = Router::new()
        .route("/api/notes", get(flaky_list).post(rejected_create))
        .with_state(hits.clone());
    let api = api_for(start_stub(app).await);

    let mut view = NotesView::new(Duration::from_secs(3));
    let controller = NotesController::new(api, view.sender());

    controller
        .create(NoteDraft {
            title: "x".repeat(256),
            content: "  ".to_string(),
        })
        .await;
    view.drain();

    let state = view.state();
    assert_eq!(
        state.error.as_deref(),
        Some(
            "The title field must not be greater than 255 characters., \
             The content field is required."
        )
    );
    assert!(!state.in_flight.creating);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
