use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

/// GET /health — liveness plus a store round-trip, reporting how many
/// recipes are stored.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recipes")
        .fetch_one(&state.db)
        .await
    {
        Ok(recipes) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "db": "connected", "recipes": recipes })),
        ),
        Err(e) => {
            tracing::error!("health probe failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "db": "unavailable" })),
            )
        }
    }
}
