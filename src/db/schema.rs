// src/db/schema.rs

//! Database schema definitions and migrations
//!
//! Tables:
//! - products: local product registry (id, name, type, base unit)
//! - recipes: one row per recipe, at most one active per product
//! - recipe_ingredients: recipe -> ingredient product edges
//! - recipe_dependencies: derived parent recipe -> child product rows used
//!   for reachability checks
//! - recipe_versions: JSON snapshots for version history

use crate::error::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Apply all pending migrations to bring the database up to date
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    debug!("Current schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!("Schema migration complete. Now at version {}", SCHEMA_VERSION);
    Ok(())
}

fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(Error::Internal(format!("Unknown migration version: {version}"))),
    }
}

/// Initial schema - Version 1
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        CREATE TABLE products (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL CHECK(length(trim(name)) > 0),
            product_type TEXT NOT NULL CHECK(product_type IN ('raw', 'semi_product', 'finished')),
            unit TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX idx_products_name ON products(name);

        CREATE TABLE recipes (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL,
            name TEXT NOT NULL CHECK(length(trim(name)) > 0),
            description TEXT,
            version INTEGER NOT NULL DEFAULT 1 CHECK(version > 0),
            status TEXT NOT NULL CHECK(status IN ('draft', 'active', 'archived', 'deprecated')),
            yield_quantity REAL NOT NULL CHECK(yield_quantity > 0),
            yield_unit TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX idx_recipes_product ON recipes(product_id);
        CREATE INDEX idx_recipes_status ON recipes(status);
        CREATE UNIQUE INDEX idx_recipes_one_active ON recipes(product_id) WHERE status = 'active';

        CREATE TABLE recipe_ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id TEXT NOT NULL,
            ingredient_product_id TEXT NOT NULL,
            quantity REAL NOT NULL CHECK(quantity > 0),
            unit TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0 CHECK(sort_order >= 0),
            ingredient_group TEXT,
            notes TEXT,
            is_optional INTEGER NOT NULL DEFAULT 0,
            UNIQUE(recipe_id, ingredient_product_id),
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);
        CREATE INDEX idx_recipe_ingredients_product ON recipe_ingredients(ingredient_product_id);

        CREATE TABLE recipe_dependencies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_recipe_id TEXT NOT NULL,
            child_product_id TEXT NOT NULL,
            dependency_type TEXT NOT NULL DEFAULT 'ingredient',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(parent_recipe_id, child_product_id),
            FOREIGN KEY (parent_recipe_id) REFERENCES recipes(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_recipe_dependencies_parent ON recipe_dependencies(parent_recipe_id);
        CREATE INDEX idx_recipe_dependencies_child ON recipe_dependencies(child_product_id);

        CREATE TABLE recipe_versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id TEXT NOT NULL,
            version_number INTEGER NOT NULL,
            recipe_data TEXT NOT NULL,
            change_summary TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(recipe_id, version_number),
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_recipe_versions_recipe ON recipe_versions(recipe_id);
        ",
    )?;

    Ok(())
}
