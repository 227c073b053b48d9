use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::{
    models::menu::{MenuDateQuery, MonthQuery, SaveMenuQuery, SaveMenuRequest},
    routes::{bad_request, internal, not_found, ApiError},
    services::menus::{MenuSaveError, MenuService},
    AppState,
};

/// Strict YYYY-MM-DD parsing; anything else is a client error.
fn parse_date(raw: Option<&str>) -> Result<NaiveDate, ApiError> {
    let raw = raw.ok_or_else(|| bad_request("Missing 'date' query parameter."))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| bad_request("Invalid date format. Please use YYYY-MM-DD."))
}

/// GET /api/daily-menus/?date=YYYY-MM-DD — latest version details plus the
/// full version list for the date.
pub async fn get_daily_menu(
    State(state): State<AppState>,
    Query(query): Query<MenuDateQuery>,
) -> Result<Json<Value>, ApiError> {
    let date = parse_date(query.date.as_deref())?;

    let latest_menu = MenuService::latest(&state.db, date).await.map_err(internal)?;
    let versions = MenuService::versions(&state.db, date)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "latest_menu": latest_menu,
        "versions": versions
    })))
}

/// GET /api/daily-menus/dates
pub async fn menu_dates(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let dates = MenuService::dates(&state.db).await.map_err(internal)?;
    Ok(Json(json!({ "dates": dates })))
}

/// GET /api/daily-menus/dates-in-month?year=YYYY&month=M
pub async fn menu_dates_in_month(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Value>, ApiError> {
    let (year, month) = match (query.year, query.month) {
        (Some(y), Some(m)) => (y, m),
        _ => return Err(bad_request("Missing 'year' or 'month' query parameter.")),
    };
    if !(1..=12).contains(&month) {
        return Err(bad_request("Invalid month parameter: must be between 1 and 12."));
    }
    if !(1900..=2100).contains(&year) {
        return Err(bad_request("Invalid year parameter: out of reasonable range."));
    }

    let dates = MenuService::dates_in_month(&state.db, year, month)
        .await
        .map_err(internal)?;
    Ok(Json(json!({ "dates": dates })))
}

/// POST /api/daily-menus/?date=YYYY-MM-DD&overwrite=true|false
pub async fn save_daily_menu(
    State(state): State<AppState>,
    Query(query): Query<SaveMenuQuery>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let date = parse_date(query.date.as_deref())?;
    let overwrite = match query.overwrite.as_deref() {
        None | Some("false") => false,
        Some("true") => true,
        Some(_) => {
            return Err(bad_request("Invalid 'overwrite' parameter. Use 'true' or 'false'."))
        }
    };

    let recipes = body
        .get("recipes")
        .ok_or_else(|| bad_request("Missing 'recipes' field in request body."))?;
    let recipes = recipes
        .as_array()
        .ok_or_else(|| bad_request("'recipes' field must be a list."))?;

    let request = SaveMenuRequest {
        recipes: Some(recipes.clone()),
    };
    let entries = request.validated_entries();
    if entries.is_empty() && !recipes.is_empty() {
        return Err(bad_request(
            "No valid recipe data found in 'recipes' list. Each item needs at least 'recipe_id' (integer).",
        ));
    }

    let new_menu_id = match MenuService::save(&state.db, date, &entries, overwrite).await {
        Ok(id) => id,
        Err(MenuSaveError::VersionConflict { .. }) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "message": "Failed to save menu. Possible reasons: database error, \
                                or trying to overwrite version 1 when it already exists."
                })),
            ));
        }
        Err(MenuSaveError::Store(e)) => return Err(internal(e.into())),
    };

    let saved_menu = MenuService::latest(&state.db, date).await.map_err(internal)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Menu saved successfully.",
            "new_menu_id": new_menu_id,
            "saved_menu": saved_menu
        })),
    ))
}

/// GET /api/daily-menus/{menu_id} — one specific version's details.
pub async fn get_menu_version(
    State(state): State<AppState>,
    Path(menu_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let version_info = MenuService::version_info(&state.db, menu_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("Menu version with id {menu_id} not found.")))?;

    let recipes = MenuService::details(&state.db, menu_id)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "version_info": version_info,
        "recipes": recipes
    })))
}
