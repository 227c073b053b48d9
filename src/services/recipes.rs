use anyhow::Context;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::recipe::{Recipe, RecipeInput, RecipeListQuery, RecipeRow};

pub const DEFAULT_PAGE_SIZE: i64 = 8;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Columns a caller may sort by. Free-form column names never reach the SQL
/// text; anything outside this list falls back to the default ordering.
const SORTABLE_COLUMNS: [&str; 4] = ["name", "created_at", "updated_at", "difficulty"];

/// Typed listing filters. Every predicate is optional; distinct predicates
/// combine with AND.
#[derive(Debug, Default, Clone)]
pub struct RecipeFilters {
    /// Case-insensitive substring against name or description.
    pub search: Option<String>,
    /// Comma-separated ingredient-name substrings, all required (AND).
    pub ingredients: Option<String>,
    /// Exact tag values, any sufficient (OR).
    pub tags: Vec<String>,
    pub difficulty: Option<String>,
    pub cuisine: Option<String>,
    pub prep_time_min: Option<i64>,
    pub prep_time_max: Option<i64>,
    pub cook_time_min: Option<i64>,
    pub cook_time_max: Option<i64>,
    pub servings_min: Option<i64>,
    pub servings_max: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl From<RecipeListQuery> for RecipeFilters {
    fn from(q: RecipeListQuery) -> Self {
        RecipeFilters {
            search: q.search,
            ingredients: q.ingredients,
            tags: q.tags,
            difficulty: q.difficulty,
            cuisine: q.cuisine,
            prep_time_min: q.prep_time_min,
            prep_time_max: q.prep_time_max,
            cook_time_min: q.cook_time_min,
            cook_time_max: q.cook_time_max,
            servings_min: q.servings_min,
            servings_max: q.servings_max,
            sort: q.sort,
            order: q.order,
            page: q.page,
            limit: q.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Pagination {
    pub total_items: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub per_page: i64,
}

/// Push the WHERE clause for `filters`. The count query and the page query
/// both go through here so they always see identical predicates.
fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filters: &'a RecipeFilters) {
    let mut sep = " WHERE ";

    if let Some(search) = filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let term = format!("%{search}%");
        qb.push(sep)
            .push("(name LIKE ")
            .push_bind(term.clone())
            .push(" OR description LIKE ")
            .push_bind(term)
            .push(")");
        sep = " AND ";
    }

    if let Some(ingredients) = filters.ingredients.as_deref() {
        // AND across terms: every listed ingredient must appear.
        for term in ingredients.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            qb.push(sep)
                .push("ingredients LIKE ")
                .push_bind(format!("%{term}%"));
            sep = " AND ";
        }
    }

    let tags: Vec<&str> = filters
        .tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if !tags.is_empty() {
        // OR across terms: any requested tag matches. Exact tag equality is
        // a quoted substring match against the serialized JSON array.
        qb.push(sep).push("(");
        for (i, tag) in tags.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push("tags LIKE ").push_bind(format!("%\"{tag}\"%"));
        }
        qb.push(")");
        sep = " AND ";
    }

    if let Some(difficulty) = &filters.difficulty {
        qb.push(sep)
            .push("difficulty = ")
            .push_bind(difficulty.clone());
        sep = " AND ";
    }

    if let Some(cuisine) = &filters.cuisine {
        qb.push(sep).push("cuisine = ").push_bind(cuisine.clone());
        sep = " AND ";
    }

    for (column, op, bound) in [
        ("prep_time_minutes", ">=", filters.prep_time_min),
        ("prep_time_minutes", "<=", filters.prep_time_max),
        ("cook_time_minutes", ">=", filters.cook_time_min),
        ("cook_time_minutes", "<=", filters.cook_time_max),
        ("servings", ">=", filters.servings_min),
        ("servings", "<=", filters.servings_max),
    ] {
        if let Some(value) = bound {
            qb.push(sep)
                .push(column)
                .push(" ")
                .push(op)
                .push(" ")
                .push_bind(value);
            sep = " AND ";
        }
    }

    let _ = sep;
}

/// ORDER BY clause from the sort allow-list; any unknown combination falls
/// back to newest-first.
fn order_clause(sort: Option<&str>, order: Option<&str>) -> String {
    let sort = sort.unwrap_or("created_at");
    let order = order.unwrap_or("desc").to_ascii_lowercase();
    if SORTABLE_COLUMNS.contains(&sort) && (order == "asc" || order == "desc") {
        format!(" ORDER BY {} {}", sort, order.to_uppercase())
    } else {
        " ORDER BY created_at DESC".to_string()
    }
}

pub fn total_pages(total_items: i64, limit: i64) -> i64 {
    if total_items == 0 {
        0
    } else {
        (total_items + limit - 1) / limit
    }
}

pub struct RecipeService;

impl RecipeService {
    /// Filtered, sorted, paginated recipe listing with its total count.
    pub async fn list(
        pool: &SqlitePool,
        filters: &RecipeFilters,
    ) -> anyhow::Result<(Vec<Recipe>, Pagination)> {
        let limit = filters
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        let page = filters.page.filter(|p| *p > 0).unwrap_or(1);
        let offset = (page - 1) * limit;

        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM recipes");
        push_filters(&mut count_query, filters);
        let total_items: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::new("SELECT * FROM recipes");
        push_filters(&mut select, filters);
        select.push(order_clause(
            filters.sort.as_deref(),
            filters.order.as_deref(),
        ));
        select.push(" LIMIT ").push_bind(limit);
        select.push(" OFFSET ").push_bind(offset);

        let rows: Vec<RecipeRow> = select.build_query_as().fetch_all(pool).await?;
        let recipes = rows.into_iter().map(Recipe::from).collect();

        let pagination = Pagination {
            total_items,
            total_pages: total_pages(total_items, limit),
            current_page: page,
            per_page: limit,
        };
        Ok((recipes, pagination))
    }

    pub async fn get(pool: &SqlitePool, id: i64) -> anyhow::Result<Option<Recipe>> {
        let row: Option<RecipeRow> = sqlx::query_as("SELECT * FROM recipes WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Recipe::from))
    }

    /// A random sample of recipes; `count` is clamped to [1, 100].
    pub async fn random(pool: &SqlitePool, count: i64) -> anyhow::Result<Vec<Recipe>> {
        let count = count.clamp(1, 100);
        let rows: Vec<RecipeRow> =
            sqlx::query_as("SELECT * FROM recipes ORDER BY RANDOM() LIMIT ?")
                .bind(count)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    pub async fn create(pool: &SqlitePool, input: &RecipeInput) -> anyhow::Result<Recipe> {
        let name = input.name.as_deref().context("name is required")?;
        let ingredients = serde_json::to_string(input.ingredients.as_deref().unwrap_or(&[]))?;
        let instructions = serde_json::to_string(input.instructions.as_deref().unwrap_or(&[]))?;
        let tags = serde_json::to_string(input.tags.as_deref().unwrap_or(&[]))?;

        let result = sqlx::query(
            "INSERT INTO recipes
             (name, description, ingredients, instructions, image_url, tags,
              difficulty, cuisine, prep_time_minutes, cook_time_minutes, servings)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(&input.description)
        .bind(ingredients)
        .bind(instructions)
        .bind(&input.image_url)
        .bind(tags)
        .bind(&input.difficulty)
        .bind(&input.cuisine)
        .bind(input.prep_time_minutes)
        .bind(input.cook_time_minutes)
        .bind(input.servings)
        .execute(pool)
        .await?;

        let id = result.last_insert_rowid();
        Self::get(pool, id)
            .await?
            .context("failed to reload created recipe")
    }

    /// Partial update: only supplied fields change; updated_at always
    /// refreshes. Returns false when no updatable field was supplied or the
    /// recipe does not exist.
    pub async fn update(pool: &SqlitePool, id: i64, input: &RecipeInput) -> anyhow::Result<bool> {
        let mut qb = QueryBuilder::new("UPDATE recipes SET ");
        let mut changed = false;
        {
            let mut fields = qb.separated(", ");
            if let Some(name) = &input.name {
                fields.push("name = ").push_bind_unseparated(name.clone());
                changed = true;
            }
            if let Some(description) = &input.description {
                fields
                    .push("description = ")
                    .push_bind_unseparated(description.clone());
                changed = true;
            }
            if let Some(ingredients) = &input.ingredients {
                fields
                    .push("ingredients = ")
                    .push_bind_unseparated(serde_json::to_string(ingredients)?);
                changed = true;
            }
            if let Some(instructions) = &input.instructions {
                fields
                    .push("instructions = ")
                    .push_bind_unseparated(serde_json::to_string(instructions)?);
                changed = true;
            }
            if let Some(image_url) = &input.image_url {
                fields
                    .push("image_url = ")
                    .push_bind_unseparated(image_url.clone());
                changed = true;
            }
            if let Some(tags) = &input.tags {
                fields
                    .push("tags = ")
                    .push_bind_unseparated(serde_json::to_string(tags)?);
                changed = true;
            }
            if let Some(difficulty) = &input.difficulty {
                fields
                    .push("difficulty = ")
                    .push_bind_unseparated(difficulty.clone());
                changed = true;
            }
            if let Some(cuisine) = &input.cuisine {
                fields
                    .push("cuisine = ")
                    .push_bind_unseparated(cuisine.clone());
                changed = true;
            }
            if let Some(prep) = input.prep_time_minutes {
                fields
                    .push("prep_time_minutes = ")
                    .push_bind_unseparated(prep);
                changed = true;
            }
            if let Some(cook) = input.cook_time_minutes {
                fields
                    .push("cook_time_minutes = ")
                    .push_bind_unseparated(cook);
                changed = true;
            }
            if let Some(servings) = input.servings {
                fields.push("servings = ").push_bind_unseparated(servings);
                changed = true;
            }
        }
        if !changed {
            return Ok(false);
        }

        qb.push(", updated_at = CURRENT_TIMESTAMP WHERE id = ")
            .push_bind(id);
        let result = qb.build().execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_clause_respects_allow_list() {
        assert_eq!(
            order_clause(Some("name"), Some("asc")),
            " ORDER BY name ASC"
        );
        assert_eq!(
            order_clause(Some("updated_at"), Some("DESC")),
            " ORDER BY updated_at DESC"
        );
        assert_eq!(order_clause(None, None), " ORDER BY created_at DESC");
        // Injection attempts and unknown columns fall back wholesale.
        assert_eq!(
            order_clause(Some("id; DROP TABLE recipes"), Some("asc")),
            " ORDER BY created_at DESC"
        );
        assert_eq!(
            order_clause(Some("name"), Some("sideways")),
            " ORDER BY created_at DESC"
        );
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 8), 0);
        assert_eq!(total_pages(1, 8), 1);
        assert_eq!(total_pages(8, 8), 1);
        assert_eq!(total_pages(9, 8), 2);
        assert_eq!(total_pages(17, 8), 3);
    }

    #[test]
    fn filters_produce_one_where_clause() {
        let filters = RecipeFilters {
            search: Some("soup".into()),
            ingredients: Some("egg,milk".into()),
            tags: vec!["veg".into(), "spicy".into()],
            difficulty: Some("easy".into()),
            servings_min: Some(2),
            ..Default::default()
        };
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM recipes");
        push_filters(&mut qb, &filters);
        let sql = qb.into_sql();
        assert_eq!(sql.matches(" WHERE ").count(), 1);
        assert_eq!(sql.matches(" OR tags LIKE ").count(), 1);
        assert!(sql.contains("ingredients LIKE ? AND ingredients LIKE ?"));
    }
}
