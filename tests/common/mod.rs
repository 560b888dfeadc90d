// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use recipe_scaler::db;
use recipe_scaler::db::models::{Product, ProductType};
use recipe_scaler::{GraphStore, IngredientDraft, RecipeDraft, Unit};
use rusqlite::Connection;
use rusqlite::types::Value;
use tempfile::TempDir;

/// Create an initialized database file.
///
/// Returns (TempDir, db_path) - keep the TempDir alive to prevent cleanup.
pub fn setup_db() -> (TempDir, String) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir
        .path()
        .join("recipes.db")
        .to_str()
        .unwrap()
        .to_string();

    db::init(&db_path).unwrap();
    (temp_dir, db_path)
}

pub fn add_product(store: &GraphStore, id: &str, product_type: ProductType, unit: Unit) {
    let name = id
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    store
        .upsert_product(&Product::new(id, &name, product_type, unit))
        .unwrap();
}

/// Recipe ids of the bakery fixture
pub struct Bakery {
    pub dough: String,
    pub bread: String,
    pub cookies: String,
    pub sauce: String,
}

/// Seed a small bakery:
///
/// - dough (1000 gram): flour 600 g, water 380 ml, salt 12 g, yeast 8 g
/// - bread (2 piece): dough 900 g, seeds 20 g (optional, topping)
/// - cookies (24 piece): flour 500 g, egg 2 piece, butter 250 g
/// - tomato_sauce (1000 gram): tomato 600 g, onion 150 g
pub fn seed_bakery(store: &GraphStore) -> Bakery {
    for (id, product_type, unit) in [
        ("flour", ProductType::Raw, Unit::Gram),
        ("water", ProductType::Raw, Unit::Milliliter),
        ("salt", ProductType::Raw, Unit::Gram),
        ("yeast", ProductType::Raw, Unit::Gram),
        ("seeds", ProductType::Raw, Unit::Gram),
        ("egg", ProductType::Raw, Unit::Piece),
        ("butter", ProductType::Raw, Unit::Gram),
        ("tomato", ProductType::Raw, Unit::Gram),
        ("onion", ProductType::Raw, Unit::Gram),
        ("dough", ProductType::SemiProduct, Unit::Gram),
        ("bread", ProductType::Finished, Unit::Piece),
        ("cookies", ProductType::Finished, Unit::Piece),
        ("tomato_sauce", ProductType::SemiProduct, Unit::Gram),
    ] {
        add_product(store, id, product_type, unit);
    }

    let dough = store
        .upsert_recipe(
            &RecipeDraft::new("dough", "Basic dough", 1000.0, Unit::Gram)
                .active()
                .ingredient("flour", 600.0, Unit::Gram)
                .ingredient("water", 380.0, Unit::Milliliter)
                .ingredient("salt", 12.0, Unit::Gram)
                .ingredient("yeast", 8.0, Unit::Gram),
            store,
        )
        .unwrap();

    let bread = store
        .upsert_recipe(
            &RecipeDraft::new("bread", "Country bread", 2.0, Unit::Piece)
                .active()
                .ingredient("dough", 900.0, Unit::Gram)
                .with_ingredient(
                    IngredientDraft::new("seeds", 20.0, Unit::Gram)
                        .optional()
                        .in_group("topping"),
                ),
            store,
        )
        .unwrap();

    let cookies = store
        .upsert_recipe(
            &RecipeDraft::new("cookies", "Butter cookies", 24.0, Unit::Piece)
                .active()
                .ingredient("flour", 500.0, Unit::Gram)
                .ingredient("egg", 2.0, Unit::Piece)
                .ingredient("butter", 250.0, Unit::Gram),
            store,
        )
        .unwrap();

    let sauce = store
        .upsert_recipe(
            &RecipeDraft::new("tomato_sauce", "Tomato sauce", 1000.0, Unit::Gram)
                .active()
                .ingredient("tomato", 600.0, Unit::Gram)
                .ingredient("onion", 150.0, Unit::Gram),
            store,
        )
        .unwrap();

    Bakery {
        dough: dough.id,
        bread: bread.id,
        cookies: cookies.id,
        sauce: sauce.id,
    }
}

/// Every row of every graph table, in a stable order
pub fn dump_tables(conn: &Connection) -> Vec<String> {
    let mut rows = Vec::new();
    for table in [
        "products",
        "recipes",
        "recipe_ingredients",
        "recipe_dependencies",
        "recipe_versions",
    ] {
        let mut stmt = conn
            .prepare(&format!("SELECT * FROM {table} ORDER BY rowid"))
            .unwrap();
        let columns = stmt.column_count();
        let table_rows = stmt
            .query_map([], |row| {
                let values = (0..columns)
                    .map(|i| row.get::<_, Value>(i).map(|v| format!("{v:?}")))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(format!("{table}: {}", values.join(" | ")))
            })
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        rows.extend(table_rows);
    }
    rows
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
