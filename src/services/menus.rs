use chrono::NaiveDate;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::models::menu::{DailyMenu, MenuDetails, MenuEntry, MenuRecipeDetail, MenuRecipeRow};

#[derive(Debug, Error)]
pub enum MenuSaveError {
    /// The (date, version) pair is already taken. Hit when overwrite targets
    /// version 1 and version 1 exists, or when two appends race.
    #[error("menu version {version} already exists for {date}")]
    VersionConflict { date: NaiveDate, version: i64 },
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// Column list shared by the menu-detail queries: entries joined to their
/// recipe, plus the recipe's first stored image (lowest id).
const MENU_DETAIL_COLUMNS: &str = "dmr.id, dmr.daily_menu_id, dmr.recipe_id, dmr.meal_type,
       r.name AS recipe_name, r.description AS recipe_description,
       r.ingredients, r.cook_time_minutes, r.difficulty, r.tags,
       (SELECT ri.image_data FROM recipe_images ri
        WHERE ri.recipe_id = r.id ORDER BY ri.id ASC LIMIT 1) AS recipe_image_data";

pub struct MenuService;

impl MenuService {
    /// Save a snapshot of `entries` as a new version for `date`, inside a
    /// single transaction.
    ///
    /// Version assignment: overwrite targets version 1 (the insert fails
    /// with a conflict if version 1 already exists — no delete-then-insert);
    /// otherwise the next version after the current maximum, starting at 1.
    /// Concurrent appends for the same date are serialized by the store; the
    /// loser of a (date, version) race gets a VersionConflict, never a
    /// partial menu.
    pub async fn save(
        pool: &SqlitePool,
        date: NaiveDate,
        entries: &[MenuEntry],
        overwrite: bool,
    ) -> Result<i64, MenuSaveError> {
        let mut tx = pool.begin().await?;

        let max_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM daily_menus WHERE menu_date = ?")
                .bind(date)
                .fetch_one(&mut *tx)
                .await?;
        let max_version = max_version.unwrap_or(0);

        let version = if overwrite {
            1
        } else if max_version > 0 {
            max_version + 1
        } else {
            1
        };

        let result = sqlx::query("INSERT INTO daily_menus (menu_date, version) VALUES (?, ?)")
            .bind(date)
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db) = &e {
                    if db.is_unique_violation() {
                        return MenuSaveError::VersionConflict { date, version };
                    }
                }
                MenuSaveError::Store(e)
            })?;
        let menu_id = result.last_insert_rowid();

        for entry in entries {
            sqlx::query(
                "INSERT INTO daily_menu_recipes (daily_menu_id, recipe_id, meal_type)
                 VALUES (?, ?, ?)",
            )
            .bind(menu_id)
            .bind(entry.recipe_id)
            .bind(&entry.meal_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(%date, version, menu_id, "saved menu version");
        Ok(menu_id)
    }

    /// All versions for a date, ascending.
    pub async fn versions(pool: &SqlitePool, date: NaiveDate) -> anyhow::Result<Vec<DailyMenu>> {
        let versions = sqlx::query_as(
            "SELECT * FROM daily_menus WHERE menu_date = ? ORDER BY version ASC",
        )
        .bind(date)
        .fetch_all(pool)
        .await?;
        Ok(versions)
    }

    pub async fn version_info(pool: &SqlitePool, menu_id: i64) -> anyhow::Result<Option<DailyMenu>> {
        let info = sqlx::query_as("SELECT * FROM daily_menus WHERE id = ?")
            .bind(menu_id)
            .fetch_optional(pool)
            .await?;
        Ok(info)
    }

    /// Recipe entries for one menu version, in insertion order.
    pub async fn details(
        pool: &SqlitePool,
        menu_id: i64,
    ) -> anyhow::Result<Vec<MenuRecipeDetail>> {
        let rows: Vec<MenuRecipeRow> = sqlx::query_as(&format!(
            "SELECT {MENU_DETAIL_COLUMNS}
             FROM daily_menu_recipes dmr
             JOIN recipes r ON r.id = dmr.recipe_id
             WHERE dmr.daily_menu_id = ?
             ORDER BY dmr.id ASC"
        ))
        .bind(menu_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(MenuRecipeDetail::from).collect())
    }

    /// Highest-version menu for a date with its entries, or None.
    pub async fn latest(pool: &SqlitePool, date: NaiveDate) -> anyhow::Result<Option<MenuDetails>> {
        let version_info: Option<DailyMenu> = sqlx::query_as(
            "SELECT * FROM daily_menus WHERE menu_date = ? ORDER BY version DESC LIMIT 1",
        )
        .bind(date)
        .fetch_optional(pool)
        .await?;

        match version_info {
            Some(version_info) => {
                let recipes = Self::details(pool, version_info.id).await?;
                Ok(Some(MenuDetails {
                    version_info,
                    recipes,
                }))
            }
            None => Ok(None),
        }
    }

    /// Every date with at least one saved menu, newest first.
    pub async fn dates(pool: &SqlitePool) -> anyhow::Result<Vec<NaiveDate>> {
        let dates =
            sqlx::query_scalar("SELECT DISTINCT menu_date FROM daily_menus ORDER BY menu_date DESC")
                .fetch_all(pool)
                .await?;
        Ok(dates)
    }

    /// Dates with saved menus inside one calendar month, ascending.
    pub async fn dates_in_month(
        pool: &SqlitePool,
        year: i32,
        month: u32,
    ) -> anyhow::Result<Vec<NaiveDate>> {
        let dates = sqlx::query_scalar(
            "SELECT DISTINCT menu_date FROM daily_menus
             WHERE strftime('%Y', menu_date) = ? AND strftime('%m', menu_date) = ?
             ORDER BY menu_date ASC",
        )
        .bind(year.to_string())
        .bind(format!("{month:02}"))
        .fetch_all(pool)
        .await?;
        Ok(dates)
    }
}
