use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Query as MultiQuery;
use serde_json::{json, Map, Value};

use crate::{
    models::recipe::{RandomQuery, RecipeListQuery, RecipePayload},
    routes::{bad_request, internal, not_found, ApiError},
    services::recipes::{RecipeFilters, RecipeService},
    AppState,
};

/// GET /api/recipes — filtered, sorted, paginated listing.
pub async fn list_recipes(
    State(state): State<AppState>,
    MultiQuery(query): MultiQuery<RecipeListQuery>,
) -> Result<Json<Value>, ApiError> {
    let filters = RecipeFilters::from(query);
    let (recipes, pagination) = RecipeService::list(&state.db, &filters)
        .await
        .map_err(internal)?;
    Ok(Json(json!({ "data": recipes, "pagination": pagination })))
}

/// GET /api/recipes/{id}
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    match RecipeService::get(&state.db, id).await.map_err(internal)? {
        Some(recipe) => Ok(Json(json!({ "data": recipe }))),
        None => Err(not_found(format!("Recipe with id {id} not found."))),
    }
}

/// GET /api/recipes/random?count=N
pub async fn random_recipes(
    State(state): State<AppState>,
    Query(query): Query<RandomQuery>,
) -> Result<Json<Value>, ApiError> {
    let recipes = RecipeService::random(&state.db, query.count.unwrap_or(3))
        .await
        .map_err(internal)?;
    Ok(Json(json!({ "data": recipes })))
}

/// POST /api/recipes
pub async fn create_recipe(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create_recipe_inner(&state, body).await
}

/// PUT /api/recipes/{id}
pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    update_recipe_inner(&state, id, body).await
}

/// DELETE /api/recipes/{id}
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    delete_recipe_inner(&state, id).await
}

// The secure endpoints share these with the public ones; only the gating
// differs.

pub(crate) async fn create_recipe_inner(
    state: &AppState,
    body: Value,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let payload = extract_recipe_data(&body)?;
    let input = payload.validate(false).map_err(validation_failed)?;
    let recipe = RecipeService::create(&state.db, &input)
        .await
        .map_err(internal)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Recipe created successfully", "data": recipe })),
    ))
}

pub(crate) async fn update_recipe_inner(
    state: &AppState,
    id: i64,
    body: Value,
) -> Result<Json<Value>, ApiError> {
    if RecipeService::get(&state.db, id)
        .await
        .map_err(internal)?
        .is_none()
    {
        return Err(not_found(format!("Recipe with id {id} not found.")));
    }

    let payload = extract_recipe_data(&body)?;
    let input = payload.validate(true).map_err(validation_failed)?;

    let changed = RecipeService::update(&state.db, id, &input)
        .await
        .map_err(internal)?;
    let current = RecipeService::get(&state.db, id).await.map_err(internal)?;

    let message = if changed {
        "Recipe updated successfully"
    } else {
        "Recipe update operation completed, but did not change the record."
    };
    Ok(Json(json!({ "message": message, "data": current })))
}

pub(crate) async fn delete_recipe_inner(
    state: &AppState,
    id: i64,
) -> Result<Json<Value>, ApiError> {
    if RecipeService::get(&state.db, id)
        .await
        .map_err(internal)?
        .is_none()
    {
        return Err(not_found(format!("Recipe with id {id} not found.")));
    }

    if RecipeService::delete(&state.db, id).await.map_err(internal)? {
        Ok(Json(json!({
            "message": "Recipe deleted successfully",
            "data": { "id": id }
        })))
    } else {
        Err(internal(anyhow::anyhow!(
            "delete affected no rows for recipe {id}"
        )))
    }
}

/// Pull the nested `recipeData` object out of the request body.
fn extract_recipe_data(body: &Value) -> Result<RecipePayload, ApiError> {
    let data = body
        .get("recipeData")
        .filter(|v| v.is_object())
        .ok_or_else(|| {
            bad_request("Missing or invalid 'recipeData' field in request body.")
        })?;
    serde_json::from_value(data.clone())
        .map_err(|_| bad_request("Malformed 'recipeData' field in request body."))
}

fn validation_failed(errors: Map<String, Value>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "message": "Validation failed within 'recipeData'",
            "errors": errors
        })),
    )
}
