use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// Stored image metadata (the payload itself is fetched separately).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeImage {
    pub id: i64,
    pub recipe_id: i64,
    pub alt_text: Option<String>,
    pub is_primary: bool,
    pub created_at: NaiveDateTime,
}

/// File extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Check the file extension against the allow-list.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
