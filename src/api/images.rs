//! Scene image endpoints
//!
//! GET /image            - Redirect a scene request to its canonical image URL
//! GET /api/image/{id}   - Serve (or generate) the scene image
//! POST /api/generate    - Content id for a free-form prompt payload

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{error::ApiError, public_origin, AppState, QueryParams};
use crate::hashing;
use crate::images::CacheKey;
use crate::scene::{SceneRequest, DEFAULT_DIMENSION, DEFAULT_ROOM};

/// Cached scene images never change for a given URL
pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Query parameter carrying an explicit cache-bust version
pub const VERSION_PARAM: &str = "v";

/// Build the images router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/image", get(redirect_image))
        .route("/api/image/{*file}", get(get_image))
        .route("/api/generate", post(generate))
}

/// Redirect `/image?room=&state=&seed=` to `/api/image/<id>.jpg?...`
async fn redirect_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, ApiError> {
    let params = QueryParams::parse(uri.query());
    let request = SceneRequest::from_query(
        params.get("room"),
        params.get("state"),
        params.get("seed"),
        None,
    )
    .ok_or_else(|| ApiError::BadRequest("Missing ?room=".to_string()))?;

    let image_id = hashing::image_id(&request.id_payload())?;

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("room", &request.room)
        .append_pair("state", &request.state)
        .append_pair("seed", &request.seed_token);
    if let Some(version) = params.get(VERSION_PARAM).filter(|v| !v.trim().is_empty()) {
        query.append_pair(VERSION_PARAM, version.trim());
    }

    let location = format!(
        "{}/api/image/{}.jpg?{}",
        public_origin(&state.config, &headers),
        image_id,
        query.finish()
    );
    debug!("Redirecting room '{}' to {}", request.room, location);

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// Serve a scene image, generating it on a cache miss
///
/// The `{id}` path segment is only a label; the image is always derived from
/// the query parameters.
async fn get_image(
    Path(file): Path<String>,
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Response, ApiError> {
    let params = QueryParams::parse(uri.query());
    let request = SceneRequest::from_query(
        params.get("room"),
        params.get("state"),
        params.get("seed"),
        Some(DEFAULT_ROOM),
    )
    .ok_or_else(|| ApiError::BadRequest("Missing ?room=".to_string()))?;

    let key = CacheKey::new("GET", uri.path(), uri.query());
    debug!("Image request {} for room '{}'", file, request.room);

    let rendered = state.pipeline.render(key, &request).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, rendered.image.mime_type),
            (header::CACHE_CONTROL, IMAGE_CACHE_CONTROL.to_string()),
        ],
        rendered.image.data,
    )
        .into_response())
}

/// Normalized `/api/generate` payload; field order is significant
#[derive(Debug, Serialize)]
struct GeneratePayload {
    prompt: String,
    seed: Value,
    w: Value,
    h: Value,
}

/// Generate response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub ok: bool,
    pub image_id: String,
    pub url: String,
}

/// Compute the content id and image URL for a prompt payload
async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    let body: Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Invalid JSON".to_string()))?;

    let prompt = body
        .get("prompt")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing prompt".to_string()))?;

    let payload = GeneratePayload {
        prompt: prompt.to_string(),
        seed: field_or(&body, "seed", Value::from(0)),
        w: field_or(&body, "w", Value::from(DEFAULT_DIMENSION)),
        h: field_or(&body, "h", Value::from(DEFAULT_DIMENSION)),
    };
    let image_id = hashing::image_id(&payload)?;
    let url = format!(
        "{}/api/image/{}.jpg",
        public_origin(&state.config, &headers),
        image_id
    );

    Ok(Json(GenerateResponse {
        ok: true,
        image_id,
        url,
    }))
}

/// Field value, or `default` when absent or null
fn field_or(body: &Value, name: &str, default: Value) -> Value {
    match body.get(name) {
        Some(Value::Null) | None => default,
        Some(value) => value.clone(),
    }
}
