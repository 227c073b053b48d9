use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde_json::{json, Value};

use crate::{
    models::image::{allowed_file, ALLOWED_EXTENSIONS},
    routes::{bad_request, internal, not_found, ApiError},
    services::{images::ImageService, recipes::RecipeService},
    AppState,
};

/// GET /api/recipes/{id}/image — raw bytes of the recipe's display image.
pub async fn get_recipe_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    if RecipeService::get(&state.db, id)
        .await
        .map_err(internal)?
        .is_none()
    {
        return Err(not_found(format!("Recipe with id {id} not found.")));
    }

    match ImageService::display_image(&state.db, id)
        .await
        .map_err(internal)?
    {
        Some(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "image/jpeg")
            .body(Body::from(bytes))
            .map_err(|e| internal(e.into())),
        None => Err(not_found(format!("No image found for recipe {id}."))),
    }
}

/// POST /api/recipes/{id}/image — multipart upload, field name `image`.
pub async fn upload_recipe_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    upload_recipe_image_inner(&state, id, multipart).await
}

pub(crate) async fn upload_recipe_image_inner(
    state: &AppState,
    id: i64,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if RecipeService::get(&state.db, id)
        .await
        .map_err(internal)?
        .is_none()
    {
        return Err(not_found(format!("Recipe with id {id} not found.")));
    }

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Malformed multipart request: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        if filename.is_empty() {
            return Err(bad_request("No selected file."));
        }
        if !allowed_file(&filename) {
            return Err(bad_request(format!(
                "Invalid file type. Allowed types: {}.",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Failed to read uploaded file: {e}")))?;
        if data.is_empty() {
            return Err(bad_request("Uploaded file is empty."));
        }

        // Newest upload becomes the recipe's primary image.
        let image_id = ImageService::add(&state.db, id, &data, Some(&filename), true)
            .await
            .map_err(internal)?;

        return Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "Image uploaded successfully",
                "data": { "recipe_id": id, "image_id": image_id }
            })),
        ));
    }

    Err(bad_request("No image file part in the request."))
}
