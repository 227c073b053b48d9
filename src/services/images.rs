use sqlx::SqlitePool;

use crate::models::image::RecipeImage;

pub struct ImageService;

impl ImageService {
    /// Store an image for a recipe. When the new image is primary, the
    /// previous primary flag for that recipe is cleared in the same
    /// transaction, so the at-most-one-primary invariant holds at every
    /// commit point.
    pub async fn add(
        pool: &SqlitePool,
        recipe_id: i64,
        data: &[u8],
        alt_text: Option<&str>,
        is_primary: bool,
    ) -> anyhow::Result<i64> {
        let mut tx = pool.begin().await?;

        if is_primary {
            sqlx::query("UPDATE recipe_images SET is_primary = 0 WHERE recipe_id = ?")
                .bind(recipe_id)
                .execute(&mut *tx)
                .await?;
        }

        let result = sqlx::query(
            "INSERT INTO recipe_images (recipe_id, image_data, alt_text, is_primary)
             VALUES (?, ?, ?, ?)",
        )
        .bind(recipe_id)
        .bind(data)
        .bind(alt_text)
        .bind(is_primary)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    /// Image bytes to display for a recipe: the primary image if one is
    /// flagged, otherwise the earliest stored one.
    pub async fn display_image(
        pool: &SqlitePool,
        recipe_id: i64,
    ) -> anyhow::Result<Option<Vec<u8>>> {
        let data = sqlx::query_scalar(
            "SELECT image_data FROM recipe_images
             WHERE recipe_id = ?
             ORDER BY is_primary DESC, id ASC
             LIMIT 1",
        )
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;
        Ok(data)
    }

    /// Image metadata for a recipe, oldest first.
    pub async fn list(pool: &SqlitePool, recipe_id: i64) -> anyhow::Result<Vec<RecipeImage>> {
        let images = sqlx::query_as(
            "SELECT id, recipe_id, alt_text, is_primary, created_at
             FROM recipe_images
             WHERE recipe_id = ?
             ORDER BY id ASC",
        )
        .bind(recipe_id)
        .fetch_all(pool)
        .await?;
        Ok(images)
    }

    /// True when the recipe has at least one stored image.
    pub async fn has_image(pool: &SqlitePool, recipe_id: i64) -> anyhow::Result<bool> {
        let exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM recipe_images WHERE recipe_id = ? LIMIT 1")
                .bind(recipe_id)
                .fetch_optional(pool)
                .await?;
        Ok(exists.is_some())
    }
}
