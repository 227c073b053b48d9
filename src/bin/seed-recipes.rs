//! Seed the recipe database with sample data.
//!
//! Inserts a small set of sample recipes when the table is empty, then
//! optionally attaches a default image to every recipe that has none.

use clap::Parser;
use serde_json::json;

use recipebook_api::db;
use recipebook_api::models::recipe::RecipePayload;
use recipebook_api::services::images::ImageService;
use recipebook_api::services::recipes::RecipeService;

#[derive(Parser)]
#[command(name = "seed-recipes", about = "Seed the recipe database with sample data")]
struct Args {
    /// Path to the SQLite database file (defaults to DATABASE_PATH or instance/database.db)
    #[arg(long)]
    database: Option<String>,

    /// Image file to attach to recipes that have no image yet
    #[arg(long)]
    image: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_path = args
        .database
        .or_else(|| std::env::var("DATABASE_PATH").ok())
        .unwrap_or_else(|| "instance/database.db".to_string());

    let pool = db::create_pool(&database_path).await?;
    db::run_migrations(&pool).await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
        .fetch_one(&pool)
        .await?;

    if existing == 0 {
        for sample in sample_recipes() {
            let payload: RecipePayload = serde_json::from_value(sample)?;
            let input = payload
                .validate(false)
                .map_err(|e| anyhow::anyhow!("invalid sample recipe: {e:?}"))?;
            let recipe = RecipeService::create(&pool, &input).await?;
            tracing::info!(id = recipe.id, name = %recipe.name, "seeded recipe");
        }
    } else {
        tracing::info!(existing, "recipes table not empty, skipping sample data");
    }

    if let Some(image_path) = args.image {
        let image_data = std::fs::read(&image_path)?;
        if image_data.is_empty() {
            anyhow::bail!("image file is empty: {}", image_path.display());
        }
        let alt_text = image_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("seed image");

        let recipe_ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM recipes")
            .fetch_all(&pool)
            .await?;

        let mut inserted = 0;
        let mut skipped = 0;
        for recipe_id in recipe_ids {
            if ImageService::has_image(&pool, recipe_id).await? {
                skipped += 1;
                continue;
            }
            ImageService::add(&pool, recipe_id, &image_data, Some(alt_text), true).await?;
            inserted += 1;
        }
        tracing::info!(inserted, skipped, "image seeding complete");
    }

    Ok(())
}

fn sample_recipes() -> Vec<serde_json::Value> {
    vec![
        json!({
            "name": "Tomato Egg Stir-fry",
            "description": "A quick homestyle classic.",
            "ingredients": [
                {"name": "Tomato", "quantity": "3"},
                {"name": "Egg", "quantity": "4"},
                {"name": "Scallion", "quantity": "1"}
            ],
            "instructions": [
                "Beat the eggs and scramble until just set.",
                "Stir-fry chopped tomatoes until saucy.",
                "Return the eggs, season, and finish with scallion."
            ],
            "tags": ["quick", "homestyle"],
            "difficulty": "easy",
            "cuisine": "chinese",
            "prep_time_minutes": 10,
            "cook_time_minutes": 10,
            "servings": 2
        }),
        json!({
            "name": "Minestrone",
            "description": "Vegetable soup with beans and pasta.",
            "ingredients": [
                {"name": "Onion", "quantity": "1"},
                {"name": "Carrot", "quantity": "2"},
                {"name": "Celery", "quantity": "2 stalks"},
                {"name": "Cannellini beans", "quantity": "1 can"},
                {"name": "Small pasta", "quantity": "100 g"}
            ],
            "instructions": [
                "Sweat the onion, carrot and celery.",
                "Add stock, tomatoes and beans; simmer 20 minutes.",
                "Cook the pasta in the soup and serve."
            ],
            "tags": ["soup", "veg"],
            "difficulty": "easy",
            "cuisine": "italian",
            "prep_time_minutes": 15,
            "cook_time_minutes": 35,
            "servings": 4
        }),
        json!({
            "name": "Chicken Katsu Curry",
            "description": "Crispy chicken cutlet with Japanese curry sauce.",
            "ingredients": [
                {"name": "Chicken breast", "quantity": "2"},
                {"name": "Panko", "quantity": "100 g"},
                {"name": "Curry roux", "quantity": "4 blocks"},
                {"name": "Rice", "quantity": "2 cups"}
            ],
            "instructions": [
                "Bread the chicken and fry until golden.",
                "Simmer the curry roux with onion and carrot.",
                "Slice the cutlet over rice and pour the sauce."
            ],
            "tags": ["dinner"],
            "difficulty": "medium",
            "cuisine": "japanese",
            "prep_time_minutes": 20,
            "cook_time_minutes": 30,
            "servings": 2
        }),
    ]
}
