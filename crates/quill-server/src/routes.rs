//! HTTP routes
//!
//! - `POST /api/chapters/patch`: patch RPC, always 200 with an envelope
//! - `GET /api/chapters/{id}/fields/{field}`: current field text
//! - `POST /api/chapters/metadata`: unload beacon target, any content type

use crate::error::EndpointError;
use crate::metadata::MetadataService;
use crate::patch::PatchService;
use quill_protocol::{ApiResponse, FieldValue, PatchApplied, PatchRequest};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, warn};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Patch endpoint logic
    pub patches: Arc<PatchService>,
    /// Metadata endpoint logic
    pub metadata: Arc<MetadataService>,
    /// Largest accepted request body in bytes
    pub max_body_bytes: u64,
}

/// All routes, with rejections rendered as JSON
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    patch_route(state.clone())
        .or(field_route(state.clone()))
        .or(metadata_route(state))
        .recover(handle_rejection)
        .with(warp::trace::request())
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn patch_route(state: AppState) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path!("api" / "chapters" / "patch")
        .and(warp::post())
        .and(warp::body::content_length_limit(state.max_body_bytes))
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(handle_patch)
}

fn field_route(state: AppState) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path!("api" / "chapters" / String / "fields" / String)
        .and(warp::get())
        .and(with_state(state))
        .and_then(handle_read_field)
}

fn metadata_route(state: AppState) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path!("api" / "chapters" / "metadata")
        .and(warp::post())
        .and(warp::body::content_length_limit(state.max_body_bytes))
        .and(warp::body::bytes())
        .and(with_state(state))
        .and_then(handle_metadata)
}

async fn handle_patch(request: PatchRequest, state: AppState) -> Result<Response, Infallible> {
    let patches = Arc::clone(&state.patches);
    let PatchRequest {
        record_id,
        field,
        patch_text,
    } = request;
    let task = {
        let (record_id, field) = (record_id.clone(), field.clone());
        tokio::spawn(async move {
            patches
                .apply_field_patch(&record_id, &field, &patch_text)
                .await
        })
    };
    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(err) => Err(EndpointError::Unexpected(err.to_string())),
    };

    let reply = match outcome {
        Ok(applied) => ApiResponse::ok(applied),
        Err(err) => {
            let code = err.code();
            if code.is_validation() || code.is_conflict() {
                warn!(%record_id, %field, %code, error = %err, "patch rejected");
            } else {
                error!(%record_id, %field, %code, error = %err, "patch failed");
            }
            ApiResponse::<PatchApplied>::failure(code, err.to_string())
        }
    };
    Ok(warp::reply::json(&reply).into_response())
}

async fn handle_read_field(id: String, field: String, state: AppState) -> Result<Response, Infallible> {
    let reply = match state.patches.read_field(&id, &field).await {
        Ok(value) => ApiResponse::ok(value),
        Err(err) => ApiResponse::<FieldValue>::failure(err.code(), err.to_string()),
    };
    Ok(warp::reply::json(&reply).into_response())
}

async fn handle_metadata(body: Bytes, state: AppState) -> Result<Response, Infallible> {
    let response = match state.metadata.save(&body).await {
        Ok(ack) => warp::reply::json(&ack).into_response(),
        Err(err) => warp::reply::with_status(
            warp::reply::json(&json!({ "success": false, "error": err.to_string() })),
            err.status(),
        )
        .into_response(),
    };
    Ok(response)
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {err}"))
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
    } else if rejection.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        warn!(?rejection, "unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "success": false, "error": message })),
        status,
    )
    .into_response())
}
