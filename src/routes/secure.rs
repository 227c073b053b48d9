//! Gated management endpoints. Token mint/revoke are loopback-only; the
//! recipe mutations require loopback plus a live bearer token and otherwise
//! behave exactly like their public counterparts.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    middleware::access::{BearerToken, LocalCaller},
    models::token::{RevokeRequest, TokenRequest},
    routes::{bad_request, images, not_found, recipes, ApiError},
    AppState,
};

/// POST /api/secure/token — mint a bearer token (loopback only).
pub async fn create_token(
    State(state): State<AppState>,
    _local: LocalCaller,
    body: Option<Json<TokenRequest>>,
) -> (StatusCode, Json<Value>) {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let hours = request.ttl_hours(
        state.config.default_token_ttl_hours,
        state.config.max_token_ttl_hours,
    );
    let (token, expires_at) = state.tokens.issue(hours);
    tracing::info!(hours, "issued API token");

    (
        StatusCode::CREATED,
        Json(json!({
            "message": "API token generated successfully",
            "token": token,
            "expires_at": expires_at.to_rfc3339(),
            "expires_in_hours": hours
        })),
    )
}

/// POST /api/secure/token/revoke — drop a token (loopback only).
pub async fn revoke_token(
    State(state): State<AppState>,
    _local: LocalCaller,
    Json(body): Json<RevokeRequest>,
) -> Result<Json<Value>, ApiError> {
    let token = body
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| bad_request("Token is required."))?;

    if state.tokens.revoke(&token) {
        Ok(Json(json!({ "message": "Token revoked successfully" })))
    } else {
        Err(not_found("Token not found or already revoked"))
    }
}

/// POST /api/secure/recipes
pub async fn create_recipe(
    State(state): State<AppState>,
    _local: LocalCaller,
    _token: BearerToken,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    recipes::create_recipe_inner(&state, body).await
}

/// PUT /api/secure/recipes/{id}
pub async fn update_recipe(
    State(state): State<AppState>,
    _local: LocalCaller,
    _token: BearerToken,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    recipes::update_recipe_inner(&state, id, body).await
}

/// DELETE /api/secure/recipes/{id}
pub async fn delete_recipe(
    State(state): State<AppState>,
    _local: LocalCaller,
    _token: BearerToken,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    recipes::delete_recipe_inner(&state, id).await
}

/// POST /api/secure/recipes/{id}/image
pub async fn upload_recipe_image(
    State(state): State<AppState>,
    _local: LocalCaller,
    _token: BearerToken,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    images::upload_recipe_image_inner(&state, id, multipart).await
}
