use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};
use axum_macros::debug_handler;
use utoipa::OpenApi;

use std::sync::Arc;

use crate::{
    dto::{NoteRequest, NoteResponse},
    envelope::{self, Envelope},
    error::{ApiError, NoteId},
    service::NoteService,
};

pub const NOTE_CREATED: &str = "Note created successfully";
pub const NOTE_UPDATED: &str = "Note updated successfully";
pub const NOTE_DELETED: &str = "Note deleted successfully";

#[derive(OpenApi)]
#[openapi(
    info(title = "Notes Service API", description = "RESTful API for managing notes"),
    servers((url = "/api", description = "API Server")),
    paths(create_note, update_note, delete_note, get_one_note, get_all_notes),
    components(schemas(NoteResponse, NoteRequest)),
    tags(
        (name = "notes", description = "Notes management API")
    )
)]
pub struct ApiDoc;

#[utoipa::path(
    post,
    path = "/notes",
    request_body = NoteRequest,
    responses(
        (status = 201, description = "Note created successfully", body = Envelope<NoteResponse>),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn create_note(
    State(service): State<Arc<NoteService>>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let note = service.create_note(payload).await?;

    Ok(envelope::respond(
        StatusCode::CREATED,
        Envelope::with_message(NOTE_CREATED, note),
    ))
}

#[utoipa::path(
    put,
    path = "/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    request_body = NoteRequest,
    responses(
        (status = 200, description = "Note updated successfully", body = Envelope<NoteResponse>),
        (status = 404, description = "Note not found"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn update_note(
    State(service): State<Arc<NoteService>>,
    NoteId(id): NoteId,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let note = service.update_note(id, payload).await?;

    Ok(envelope::respond(
        StatusCode::OK,
        Envelope::with_message(NOTE_UPDATED, note),
    ))
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note deleted successfully"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn delete_note(
    State(service): State<Arc<NoteService>>,
    NoteId(id): NoteId,
) -> Result<Response, ApiError> {
    service.delete_note(id).await?;

    Ok(envelope::respond(
        StatusCode::OK,
        Envelope::acknowledge(NOTE_DELETED),
    ))
}

#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note found", body = Envelope<NoteResponse>),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_one_note(
    State(service): State<Arc<NoteService>>,
    NoteId(id): NoteId,
) -> Result<Response, ApiError> {
    let note = service.get_one_note(id).await?;

    Ok(envelope::respond(StatusCode::OK, Envelope::data(note)))
}

#[utoipa::path(
    get,
    path = "/notes",
    responses(
        (status = 200, description = "List of all notes, newest first", body = Envelope<Vec<NoteResponse>>),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_all_notes(
    State(service): State<Arc<NoteService>>,
) -> Result<Response, ApiError> {
    let notes = service.get_all_notes().await?;

    Ok(envelope::respond(StatusCode::OK, Envelope::data(notes)))
}
