use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
};

use crate::{
    routes::{internal, ApiError},
    AppState,
};

/// GET /api/download-database — the raw store file as an attachment.
pub async fn download_database(State(state): State<AppState>) -> Result<Response, ApiError> {
    let path = std::path::Path::new(&state.config.database_path);
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| internal(anyhow::anyhow!("failed to read database file: {e}")))?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("database.db");
    let content_type = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(bytes))
        .map_err(|e| internal(e.into()))
}
