use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::recipe::{decode_list, Ingredient};

/// One immutable menu snapshot for a calendar date.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailyMenu {
    pub id: i64,
    pub menu_date: NaiveDate,
    pub version: i64,
    pub created_at: NaiveDateTime,
}

/// Row shape for a menu's recipe entries joined out to the recipe table,
/// with the first stored image (lowest id) pulled in as a subquery.
#[derive(Debug, FromRow)]
pub struct MenuRecipeRow {
    pub id: i64,
    pub daily_menu_id: i64,
    pub recipe_id: i64,
    pub meal_type: String,
    pub recipe_name: String,
    pub recipe_description: Option<String>,
    pub ingredients: String,
    pub cook_time_minutes: Option<i64>,
    pub difficulty: Option<String>,
    pub tags: Option<String>,
    pub recipe_image_data: Option<Vec<u8>>,
}

/// Menu recipe entry as served: lists decoded, image base64-encoded.
#[derive(Debug, Serialize)]
pub struct MenuRecipeDetail {
    pub id: i64,
    pub daily_menu_id: i64,
    pub recipe_id: i64,
    pub meal_type: String,
    pub recipe_name: String,
    pub recipe_description: Option<String>,
    pub ingredients: Vec<Ingredient>,
    pub cook_time_minutes: Option<i64>,
    pub difficulty: Option<String>,
    pub tags: Vec<String>,
    pub recipe_image_data: Option<String>,
}

/// Latest (or specific) menu version with its recipe entries.
#[derive(Debug, Serialize)]
pub struct MenuDetails {
    pub version_info: DailyMenu,
    pub recipes: Vec<MenuRecipeDetail>,
}

/// Query params for GET /api/daily-menus/.
#[derive(Debug, Deserialize)]
pub struct MenuDateQuery {
    pub date: Option<String>,
}

/// Query params for POST /api/daily-menus/.
#[derive(Debug, Deserialize)]
pub struct SaveMenuQuery {
    pub date: Option<String>,
    pub overwrite: Option<String>,
}

/// Query params for GET /api/daily-menus/dates-in-month.
#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Body for POST /api/daily-menus/.
#[derive(Debug, Deserialize)]
pub struct SaveMenuRequest {
    pub recipes: Option<Vec<Value>>,
}

/// A validated menu entry: recipe reference plus meal-type label.
#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub recipe_id: i64,
    pub meal_type: String,
}

pub const DEFAULT_MEAL_TYPE: &str = "other";

impl SaveMenuRequest {
    /// Keep entries carrying a valid integer recipe_id; everything else is
    /// silently dropped. Meal type defaults when absent.
    pub fn validated_entries(&self) -> Vec<MenuEntry> {
        self.recipes
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                let recipe_id = obj.get("recipe_id")?.as_i64()?;
                let meal_type = obj
                    .get("meal_type")
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(DEFAULT_MEAL_TYPE)
                    .to_string();
                Some(MenuEntry {
                    recipe_id,
                    meal_type,
                })
            })
            .collect()
    }
}

impl From<MenuRecipeRow> for MenuRecipeDetail {
    fn from(row: MenuRecipeRow) -> Self {
        use base64::{engine::general_purpose::STANDARD, Engine};
        MenuRecipeDetail {
            id: row.id,
            daily_menu_id: row.daily_menu_id,
            recipe_id: row.recipe_id,
            meal_type: row.meal_type,
            recipe_name: row.recipe_name,
            recipe_description: row.recipe_description,
            ingredients: decode_list(Some(&row.ingredients)),
            cook_time_minutes: row.cook_time_minutes,
            difficulty: row.difficulty,
            tags: decode_list(row.tags.as_deref()),
            recipe_image_data: row.recipe_image_data.map(|data| STANDARD.encode(data)),
        }
    }
}
