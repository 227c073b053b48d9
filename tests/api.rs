//! Store-level integration tests against an in-memory SQLite database.

use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use recipebook_api::db::MIGRATOR;
use recipebook_api::models::menu::MenuEntry;
use recipebook_api::models::recipe::{Ingredient, RecipeInput};
use recipebook_api::services::images::ImageService;
use recipebook_api::services::menus::{MenuSaveError, MenuService};
use recipebook_api::services::recipes::{RecipeFilters, RecipeService};

async fn test_pool() -> SqlitePool {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    pool
}

fn ingredient(name: &str, quantity: Option<&str>) -> Ingredient {
    Ingredient {
        name: name.to_string(),
        quantity: quantity.map(|q| q.into()),
    }
}

fn base_input(name: &str) -> RecipeInput {
    RecipeInput {
        name: Some(name.to_string()),
        ingredients: Some(vec![ingredient("Salt", None)]),
        instructions: Some(vec!["Boil water".to_string()]),
        ..Default::default()
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn entry(recipe_id: i64, meal_type: &str) -> MenuEntry {
    MenuEntry {
        recipe_id,
        meal_type: meal_type.to_string(),
    }
}

#[tokio::test]
async fn list_fields_round_trip_in_order() {
    let pool = test_pool().await;
    let input = RecipeInput {
        name: Some("Pancakes".into()),
        ingredients: Some(vec![
            ingredient("Flour", Some("200 g")),
            ingredient("Egg", Some("2")),
            ingredient("Milk", None),
        ]),
        instructions: Some(vec![
            "Whisk everything into a batter.".to_string(),
            "Fry ladlefuls until golden.".to_string(),
        ]),
        tags: Some(vec!["breakfast".into(), "quick".into()]),
        ..Default::default()
    };
    let created = RecipeService::create(&pool, &input).await.unwrap();

    let fetched = RecipeService::get(&pool, created.id).await.unwrap().unwrap();
    let names: Vec<&str> = fetched.ingredients.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Flour", "Egg", "Milk"]);
    assert_eq!(
        fetched.ingredients[0].quantity,
        Some(serde_json::Value::from("200 g"))
    );
    assert_eq!(fetched.instructions, input.instructions.clone().unwrap());
    assert_eq!(fetched.tags, vec!["breakfast", "quick"]);
}

#[tokio::test]
async fn create_fetch_delete_lifecycle() {
    let pool = test_pool().await;
    let created = RecipeService::create(&pool, &base_input("Soup")).await.unwrap();
    assert_eq!(created.name, "Soup");

    let fetched = RecipeService::get(&pool, created.id).await.unwrap().unwrap();
    assert_eq!(fetched.name, "Soup");

    assert!(RecipeService::delete(&pool, created.id).await.unwrap());
    assert!(RecipeService::get(&pool, created.id).await.unwrap().is_none());
    assert!(!RecipeService::delete(&pool, created.id).await.unwrap());
}

#[tokio::test]
async fn partial_update_retains_unsupplied_fields() {
    let pool = test_pool().await;
    let mut input = base_input("Stew");
    input.cuisine = Some("french".into());
    input.servings = Some(4);
    let created = RecipeService::create(&pool, &input).await.unwrap();

    let update = RecipeInput {
        name: Some("Beef Stew".into()),
        ..Default::default()
    };
    assert!(RecipeService::update(&pool, created.id, &update).await.unwrap());

    let fetched = RecipeService::get(&pool, created.id).await.unwrap().unwrap();
    assert_eq!(fetched.name, "Beef Stew");
    assert_eq!(fetched.cuisine.as_deref(), Some("french"));
    assert_eq!(fetched.servings, Some(4));

    // Nothing supplied: no-op, record unchanged.
    assert!(!RecipeService::update(&pool, created.id, &RecipeInput::default())
        .await
        .unwrap());
    let unchanged = RecipeService::get(&pool, created.id).await.unwrap().unwrap();
    assert_eq!(unchanged.name, "Beef Stew");
}

#[tokio::test]
async fn pagination_sweep_covers_all_rows() {
    let pool = test_pool().await;
    for i in 0..17 {
        RecipeService::create(&pool, &base_input(&format!("Recipe {i:02}")))
            .await
            .unwrap();
    }

    let mut seen = 0;
    for (page, expected_len) in [(1, 8), (2, 8), (3, 1)] {
        let filters = RecipeFilters {
            page: Some(page),
            limit: Some(8),
            ..Default::default()
        };
        let (recipes, pagination) = RecipeService::list(&pool, &filters).await.unwrap();
        assert_eq!(recipes.len(), expected_len, "page {page}");
        assert_eq!(pagination.total_items, 17);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.current_page, page);
        assert_eq!(pagination.per_page, 8);
        seen += recipes.len();
    }
    assert_eq!(seen, 17);

    // Page past the end: empty, not an error.
    let filters = RecipeFilters {
        page: Some(4),
        limit: Some(8),
        ..Default::default()
    };
    let (recipes, pagination) = RecipeService::list(&pool, &filters).await.unwrap();
    assert!(recipes.is_empty());
    assert_eq!(pagination.total_pages, 3);

    // Non-positive page/limit clamp back to defaults.
    let filters = RecipeFilters {
        page: Some(0),
        limit: Some(-5),
        ..Default::default()
    };
    let (recipes, pagination) = RecipeService::list(&pool, &filters).await.unwrap();
    assert_eq!(recipes.len(), 8);
    assert_eq!(pagination.current_page, 1);
    assert_eq!(pagination.per_page, 8);
}

#[tokio::test]
async fn empty_result_pagination() {
    let pool = test_pool().await;
    let filters = RecipeFilters {
        search: Some("nothing here".into()),
        ..Default::default()
    };
    let (recipes, pagination) = RecipeService::list(&pool, &filters).await.unwrap();
    assert!(recipes.is_empty());
    assert_eq!(pagination.total_items, 0);
    assert_eq!(pagination.total_pages, 0);
}

#[tokio::test]
async fn search_is_case_insensitive_over_name_and_description() {
    let pool = test_pool().await;
    let mut a = base_input("Tomato Soup");
    a.description = Some("Classic starter".into());
    RecipeService::create(&pool, &a).await.unwrap();
    let mut b = base_input("Green Salad");
    b.description = Some("With tomato wedges".into());
    RecipeService::create(&pool, &b).await.unwrap();
    RecipeService::create(&pool, &base_input("Omelette")).await.unwrap();

    let filters = RecipeFilters {
        search: Some("tomato".into()),
        ..Default::default()
    };
    let (recipes, pagination) = RecipeService::list(&pool, &filters).await.unwrap();
    assert_eq!(pagination.total_items, 2);
    let names: Vec<&str> = recipes.iter().map(|r| r.name.as_str()).collect();
    assert!(names.contains(&"Tomato Soup"));
    assert!(names.contains(&"Green Salad"));
}

#[tokio::test]
async fn tag_filter_is_or_ingredient_filter_is_and() {
    let pool = test_pool().await;

    let mut veg_only = base_input("Veg Plate");
    veg_only.tags = Some(vec!["veg".into()]);
    veg_only.ingredients = Some(vec![ingredient("Egg", None)]);
    let veg_only = RecipeService::create(&pool, &veg_only).await.unwrap();

    let mut both = base_input("Custard");
    both.ingredients = Some(vec![ingredient("Egg", None), ingredient("Milk", None)]);
    let both = RecipeService::create(&pool, &both).await.unwrap();

    // OR across tags: a recipe tagged only "veg" matches ["veg", "spicy"].
    let filters = RecipeFilters {
        tags: vec!["veg".into(), "spicy".into()],
        ..Default::default()
    };
    let (recipes, _) = RecipeService::list(&pool, &filters).await.unwrap();
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0].id, veg_only.id);

    // AND across ingredient terms: egg alone does not satisfy "egg,milk".
    let filters = RecipeFilters {
        ingredients: Some("egg,milk".into()),
        ..Default::default()
    };
    let (recipes, _) = RecipeService::list(&pool, &filters).await.unwrap();
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0].id, both.id);
}

#[tokio::test]
async fn exact_and_range_filters_compose() {
    let pool = test_pool().await;
    let mut quick = base_input("Quick Thai");
    quick.cuisine = Some("thai".into());
    quick.difficulty = Some("easy".into());
    quick.prep_time_minutes = Some(10);
    quick.servings = Some(2);
    RecipeService::create(&pool, &quick).await.unwrap();

    let mut slow = base_input("Slow Thai");
    slow.cuisine = Some("thai".into());
    slow.difficulty = Some("hard".into());
    slow.prep_time_minutes = Some(90);
    slow.servings = Some(6);
    RecipeService::create(&pool, &slow).await.unwrap();

    let filters = RecipeFilters {
        cuisine: Some("thai".into()),
        difficulty: Some("easy".into()),
        prep_time_max: Some(30),
        servings_min: Some(2),
        ..Default::default()
    };
    let (recipes, _) = RecipeService::list(&pool, &filters).await.unwrap();
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0].name, "Quick Thai");
}

#[tokio::test]
async fn sort_by_name_ascending() {
    let pool = test_pool().await;
    for name in ["Banana Bread", "Apple Pie", "Carrot Cake"] {
        RecipeService::create(&pool, &base_input(name)).await.unwrap();
    }
    let filters = RecipeFilters {
        sort: Some("name".into()),
        order: Some("asc".into()),
        ..Default::default()
    };
    let (recipes, _) = RecipeService::list(&pool, &filters).await.unwrap();
    let names: Vec<&str> = recipes.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Apple Pie", "Banana Bread", "Carrot Cake"]);
}

#[tokio::test]
async fn random_sample_clamps_count() {
    let pool = test_pool().await;
    for i in 0..5 {
        RecipeService::create(&pool, &base_input(&format!("R{i}"))).await.unwrap();
    }
    assert_eq!(RecipeService::random(&pool, 3).await.unwrap().len(), 3);
    // Clamped to at least one.
    assert_eq!(RecipeService::random(&pool, 0).await.unwrap().len(), 1);
    // More than available: everything, once.
    assert_eq!(RecipeService::random(&pool, 100).await.unwrap().len(), 5);
}

#[tokio::test]
async fn appended_versions_are_gapless_and_ascending() {
    let pool = test_pool().await;
    let recipe = RecipeService::create(&pool, &base_input("Soup")).await.unwrap();
    let day = date("2026-09-01");

    for _ in 0..3 {
        MenuService::save(&pool, day, &[entry(recipe.id, "lunch")], false)
            .await
            .unwrap();
    }

    let versions = MenuService::versions(&pool, day).await.unwrap();
    let numbers: Vec<i64> = versions.iter().map(|v| v.version).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let latest = MenuService::latest(&pool, day).await.unwrap().unwrap();
    assert_eq!(latest.version_info.version, 3);
    assert_eq!(latest.recipes.len(), 1);
    assert_eq!(latest.recipes[0].meal_type, "lunch");
    assert_eq!(latest.recipes[0].recipe_name, "Soup");
}

#[tokio::test]
async fn overwrite_creates_version_one_and_conflicts_thereafter() {
    let pool = test_pool().await;
    let recipe = RecipeService::create(&pool, &base_input("Soup")).await.unwrap();
    let day = date("2026-09-02");

    // Overwrite with no existing menu: plain version 1.
    MenuService::save(&pool, day, &[entry(recipe.id, "dinner")], true)
        .await
        .unwrap();
    let versions = MenuService::versions(&pool, day).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version, 1);

    // Overwrite again: version 1 is taken, the uniqueness constraint rejects.
    let err = MenuService::save(&pool, day, &[entry(recipe.id, "dinner")], true)
        .await
        .unwrap_err();
    assert!(matches!(err, MenuSaveError::VersionConflict { version: 1, .. }));

    // The failed save left nothing behind.
    let versions = MenuService::versions(&pool, day).await.unwrap();
    assert_eq!(versions.len(), 1);
    let menu_recipe_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM daily_menu_recipes")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(menu_recipe_count, 1);
}

#[tokio::test]
async fn menu_details_drop_deleted_recipes() {
    let pool = test_pool().await;
    let keep = RecipeService::create(&pool, &base_input("Keeper")).await.unwrap();
    let gone = RecipeService::create(&pool, &base_input("Goner")).await.unwrap();
    let day = date("2026-09-03");

    let menu_id = MenuService::save(
        &pool,
        day,
        &[entry(keep.id, "lunch"), entry(gone.id, "dinner")],
        false,
    )
    .await
    .unwrap();

    RecipeService::delete(&pool, gone.id).await.unwrap();

    let details = MenuService::details(&pool, menu_id).await.unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].recipe_id, keep.id);
}

#[tokio::test]
async fn menu_details_carry_first_image_base64() {
    let pool = test_pool().await;
    let recipe = RecipeService::create(&pool, &base_input("Soup")).await.unwrap();
    let first_bytes = b"first image bytes".to_vec();
    ImageService::add(&pool, recipe.id, &first_bytes, Some("soup.jpg"), false)
        .await
        .unwrap();
    ImageService::add(&pool, recipe.id, b"second image bytes", Some("soup2.jpg"), false)
        .await
        .unwrap();

    let day = date("2026-09-04");
    let menu_id = MenuService::save(&pool, day, &[entry(recipe.id, "lunch")], false)
        .await
        .unwrap();
    let details = MenuService::details(&pool, menu_id).await.unwrap();
    assert_eq!(
        details[0].recipe_image_data.as_deref(),
        Some(STANDARD.encode(&first_bytes).as_str())
    );
}

#[tokio::test]
async fn menu_dates_listings() {
    let pool = test_pool().await;
    let recipe = RecipeService::create(&pool, &base_input("Soup")).await.unwrap();
    for d in ["2026-08-30", "2026-09-01", "2026-09-15"] {
        MenuService::save(&pool, date(d), &[entry(recipe.id, "lunch")], false)
            .await
            .unwrap();
    }
    // A second version on an existing date must not duplicate the date.
    MenuService::save(&pool, date("2026-09-01"), &[entry(recipe.id, "dinner")], false)
        .await
        .unwrap();

    let all = MenuService::dates(&pool).await.unwrap();
    assert_eq!(
        all,
        vec![date("2026-09-15"), date("2026-09-01"), date("2026-08-30")]
    );

    let september = MenuService::dates_in_month(&pool, 2026, 9).await.unwrap();
    assert_eq!(september, vec![date("2026-09-01"), date("2026-09-15")]);

    let august = MenuService::dates_in_month(&pool, 2026, 8).await.unwrap();
    assert_eq!(august, vec![date("2026-08-30")]);
}

#[tokio::test]
async fn second_primary_image_replaces_the_first() {
    let pool = test_pool().await;
    let recipe = RecipeService::create(&pool, &base_input("Soup")).await.unwrap();

    ImageService::add(&pool, recipe.id, b"old", Some("old.jpg"), true)
        .await
        .unwrap();
    let new_id = ImageService::add(&pool, recipe.id, b"new", Some("new.jpg"), true)
        .await
        .unwrap();

    let images = ImageService::list(&pool, recipe.id).await.unwrap();
    assert_eq!(images.len(), 2);
    let primaries: Vec<_> = images.iter().filter(|i| i.is_primary).collect();
    assert_eq!(primaries.len(), 1);
    assert_eq!(primaries[0].id, new_id);

    // The display image follows the primary flag.
    let shown = ImageService::display_image(&pool, recipe.id).await.unwrap();
    assert_eq!(shown.as_deref(), Some(b"new".as_slice()));
}

#[tokio::test]
async fn deleting_a_recipe_cascades_its_images() {
    let pool = test_pool().await;
    let recipe = RecipeService::create(&pool, &base_input("Soup")).await.unwrap();
    ImageService::add(&pool, recipe.id, b"bytes", None, true)
        .await
        .unwrap();
    assert!(ImageService::has_image(&pool, recipe.id).await.unwrap());

    RecipeService::delete(&pool, recipe.id).await.unwrap();
    assert!(!ImageService::has_image(&pool, recipe.id).await.unwrap());
}

#[tokio::test]
async fn malformed_list_fields_degrade_to_empty_on_read() {
    let pool = test_pool().await;
    let recipe = RecipeService::create(&pool, &base_input("Soup")).await.unwrap();
    sqlx::query("UPDATE recipes SET ingredients = 'not json', tags = '{' WHERE id = ?")
        .bind(recipe.id)
        .execute(&pool)
        .await
        .unwrap();

    let fetched = RecipeService::get(&pool, recipe.id).await.unwrap().unwrap();
    assert!(fetched.ingredients.is_empty());
    assert!(fetched.tags.is_empty());
    assert_eq!(fetched.instructions, vec!["Boil water"]);
}
