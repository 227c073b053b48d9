pub mod health;
pub mod images;
pub mod menus;
pub mod recipes;
pub mod secure;
pub mod utils;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Full application router with its middleware stack.
pub fn router(state: AppState) -> Router {
    // The API serves browser frontends from arbitrary origins.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health::health_check))
        // Recipes
        .route(
            "/api/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route("/api/recipes/random", get(recipes::random_recipes))
        .route(
            "/api/recipes/{id}",
            get(recipes::get_recipe)
                .put(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/api/recipes/{id}/image",
            get(images::get_recipe_image).post(images::upload_recipe_image),
        )
        // Daily menus (registered with and without trailing slash; the
        // frontend calls both forms)
        .route(
            "/api/daily-menus",
            get(menus::get_daily_menu).post(menus::save_daily_menu),
        )
        .route(
            "/api/daily-menus/",
            get(menus::get_daily_menu).post(menus::save_daily_menu),
        )
        .route("/api/daily-menus/dates", get(menus::menu_dates))
        .route(
            "/api/daily-menus/dates-in-month",
            get(menus::menu_dates_in_month),
        )
        .route("/api/daily-menus/{menu_id}", get(menus::get_menu_version))
        // Token administration (loopback only)
        .route("/api/secure/token", post(secure::create_token))
        .route("/api/secure/token/revoke", post(secure::revoke_token))
        // Gated recipe management (loopback + bearer token)
        .route("/api/secure/recipes", post(secure::create_recipe))
        .route(
            "/api/secure/recipes/{id}",
            put(secure::update_recipe).delete(secure::delete_recipe),
        )
        .route(
            "/api/secure/recipes/{id}/image",
            post(secure::upload_recipe_image),
        )
        // Utilities
        .route("/api/download-database", get(utils::download_database))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Covers image uploads
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
        .with_state(state)
}

pub(crate) type ApiError = (StatusCode, Json<Value>);

/// Log the detail server-side and return a generic 500.
pub(crate) fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!("{err:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Internal server error." })),
    )
}

pub(crate) fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": message.into() })),
    )
}

pub(crate) fn not_found(message: impl Into<String>) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": message.into() })),
    )
}
