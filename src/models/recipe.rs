use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

/// One ingredient line. Quantity is free-form (e.g. "2 cups", a bare number)
/// and kept as supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Value>,
}

/// Raw recipe row: list fields still JSON-encoded as stored.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub ingredients: String,
    pub instructions: String,
    pub image_url: Option<String>,
    pub tags: Option<String>,
    pub difficulty: Option<String>,
    pub cuisine: Option<String>,
    pub prep_time_minutes: Option<i64>,
    pub cook_time_minutes: Option<i64>,
    pub servings: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Recipe as served to clients, list fields decoded.
#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub difficulty: Option<String>,
    pub cuisine: Option<String>,
    pub prep_time_minutes: Option<i64>,
    pub cook_time_minutes: Option<i64>,
    pub servings: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Decode a JSON-encoded list column; malformed data degrades to empty.
pub fn decode_list<T: DeserializeOwned>(raw: Option<&str>) -> Vec<T> {
    raw.and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default()
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Recipe {
            id: row.id,
            name: row.name,
            description: row.description,
            ingredients: decode_list(Some(&row.ingredients)),
            instructions: decode_list(Some(&row.instructions)),
            image_url: row.image_url,
            tags: decode_list(row.tags.as_deref()),
            difficulty: row.difficulty,
            cuisine: row.cuisine,
            prep_time_minutes: row.prep_time_minutes,
            cook_time_minutes: row.cook_time_minutes,
            servings: row.servings,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Client-supplied recipe fields, loosely typed so validation can report
/// per-field errors instead of rejecting the whole body.
#[derive(Debug, Default, Deserialize)]
pub struct RecipePayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<Value>>,
    pub instructions: Option<Vec<Value>>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub difficulty: Option<String>,
    pub cuisine: Option<String>,
    pub prep_time_minutes: Option<Value>,
    pub cook_time_minutes: Option<Value>,
    pub servings: Option<Value>,
}

/// Validated recipe fields ready for the store.
#[derive(Debug, Default, Clone)]
pub struct RecipeInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub instructions: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub difficulty: Option<String>,
    pub cuisine: Option<String>,
    pub prep_time_minutes: Option<i64>,
    pub cook_time_minutes: Option<i64>,
    pub servings: Option<i64>,
}

impl RecipePayload {
    /// Validate the payload. With `partial` set, absent fields are left
    /// untouched (update semantics); otherwise name/ingredients/instructions
    /// are required. Returns a per-field error map on failure.
    pub fn validate(self, partial: bool) -> Result<RecipeInput, Map<String, Value>> {
        let mut errors = Map::new();
        let mut input = RecipeInput {
            description: self.description,
            image_url: self.image_url,
            tags: self.tags,
            difficulty: self.difficulty,
            cuisine: self.cuisine,
            ..Default::default()
        };

        match &self.name {
            Some(name) if !name.trim().is_empty() => input.name = Some(name.clone()),
            Some(_) => {
                let msg = if partial {
                    "Name cannot be empty."
                } else {
                    "Required field 'name' cannot be empty."
                };
                errors.insert("name".into(), msg.into());
            }
            None if !partial => {
                errors.insert("name".into(), "Missing required field: name".into());
            }
            None => {}
        }

        match &self.ingredients {
            Some(list) if !list.is_empty() => {
                let mut item_errors = Vec::new();
                let mut parsed = Vec::new();
                for (index, item) in list.iter().enumerate() {
                    match item.as_object() {
                        Some(obj) => {
                            let name = obj.get("name").and_then(Value::as_str).unwrap_or("");
                            if name.trim().is_empty() {
                                item_errors.push(serde_json::json!({
                                    "index": index,
                                    "errors": {
                                        "name": format!(
                                            "Ingredient {}: Name is required and cannot be empty.",
                                            index + 1
                                        )
                                    }
                                }));
                            } else {
                                parsed.push(Ingredient {
                                    name: name.to_string(),
                                    quantity: obj.get("quantity").filter(|q| !q.is_null()).cloned(),
                                });
                            }
                        }
                        None => item_errors.push(serde_json::json!({
                            "index": index,
                            "errors": {
                                "general": format!("Ingredient at index {index} must be an object.")
                            }
                        })),
                    }
                }
                if item_errors.is_empty() {
                    input.ingredients = Some(parsed);
                } else {
                    errors.insert("ingredients".into(), Value::Array(item_errors));
                }
            }
            Some(_) => {
                errors.insert(
                    "ingredients".into(),
                    "Required field 'ingredients' must be a non-empty list.".into(),
                );
            }
            None if !partial => {
                errors.insert(
                    "ingredients".into(),
                    "Missing required field: ingredients".into(),
                );
            }
            None => {}
        }

        match &self.instructions {
            Some(list) if !list.is_empty() => {
                let mut item_errors = Vec::new();
                let mut parsed = Vec::new();
                for (index, item) in list.iter().enumerate() {
                    match item.as_str() {
                        Some(s) if !s.trim().is_empty() => parsed.push(s.to_string()),
                        _ => item_errors.push(serde_json::json!({
                            "index": index,
                            "error": "Instruction must be a non-empty string."
                        })),
                    }
                }
                if item_errors.is_empty() {
                    input.instructions = Some(parsed);
                } else {
                    errors.insert("instructions".into(), Value::Array(item_errors));
                }
            }
            Some(_) => {
                errors.insert(
                    "instructions".into(),
                    "Required field 'instructions' must be a non-empty list.".into(),
                );
            }
            None if !partial => {
                errors.insert(
                    "instructions".into(),
                    "Missing required field: instructions".into(),
                );
            }
            None => {}
        }

        for (field, value, slot) in [
            (
                "prep_time_minutes",
                &self.prep_time_minutes,
                &mut input.prep_time_minutes,
            ),
            (
                "cook_time_minutes",
                &self.cook_time_minutes,
                &mut input.cook_time_minutes,
            ),
            ("servings", &self.servings, &mut input.servings),
        ] {
            if let Some(value) = value {
                match non_negative_number(field, value) {
                    Ok(parsed) => *slot = parsed,
                    Err(msg) => {
                        errors.insert(field.into(), msg.into());
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(input)
        } else {
            Err(errors)
        }
    }
}

/// Accept a JSON number or numeric string; reject negatives.
fn non_negative_number(field: &str, value: &Value) -> Result<Option<i64>, String> {
    if value.is_null() {
        return Ok(None);
    }
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v < 0.0 => Err(format!("{} cannot be negative.", title_case(field))),
        Some(v) => Ok(Some(v as i64)),
        None => Err(format!(
            "{} must be a valid number if provided.",
            title_case(field)
        )),
    }
}

fn title_case(field: &str) -> String {
    field
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Query params for GET /api/recipes.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub search: Option<String>,
    /// Comma-separated ingredient-name substrings; a recipe must match all.
    pub ingredients: Option<String>,
    /// Repeatable exact tag values; a recipe may match any.
    #[serde(default)]
    pub tags: Vec<String>,
    pub difficulty: Option<String>,
    pub cuisine: Option<String>,
    #[serde(rename = "prepTimeMin")]
    pub prep_time_min: Option<i64>,
    #[serde(rename = "prepTimeMax")]
    pub prep_time_max: Option<i64>,
    #[serde(rename = "cookTimeMin")]
    pub cook_time_min: Option<i64>,
    #[serde(rename = "cookTimeMax")]
    pub cook_time_max: Option<i64>,
    #[serde(rename = "servingsMin")]
    pub servings_min: Option<i64>,
    #[serde(rename = "servingsMax")]
    pub servings_max: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Query params for GET /api/recipes/random.
#[derive(Debug, Deserialize)]
pub struct RandomQuery {
    pub count: Option<i64>,
}
