pub mod config;
pub mod dto;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use std::sync::Arc;

use handlers::rest;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use error::ErrorPolicy;
use service::NoteService;

/// Builds the whole HTTP surface: `/api` (normalized JSON envelopes), the
/// Swagger UI and a plain-text root.
pub fn router(service: Arc<NoteService>, policy: ErrorPolicy) -> Router {
    let api_router = Router::new()
        .route("/notes", get(rest::get_all_notes).post(rest::create_note))
        .route(
            "/notes/{id}",
            get(rest::get_one_note)
                .put(rest::update_note)
                .delete(rest::delete_note),
        )
        .fallback(error::route_not_found)
        .with_state(service)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(middleware::from_fn_with_state(policy, error::normalize_errors));

    Router::new()
        .route("/", get(root))
        .nest("/api", api_router)
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", rest::ApiDoc::openapi()),
        )
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Response {
    (StatusCode::OK, "Notes service is up").into_response()
}
