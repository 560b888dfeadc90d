// src/db/models/recipe.rs

//! Recipe model - how a product is produced from its ingredients

use super::{now_timestamp, parse_text_column};
use crate::error::Result;
use crate::units::Unit;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a recipe
///
/// Only `Active` recipes take part in scaling and in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeStatus {
    Draft,
    Active,
    Archived,
    Deprecated,
}

impl RecipeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RecipeStatus::Draft => "draft",
            RecipeStatus::Active => "active",
            RecipeStatus::Archived => "archived",
            RecipeStatus::Deprecated => "deprecated",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, RecipeStatus::Active)
    }
}

impl fmt::Display for RecipeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecipeStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(RecipeStatus::Draft),
            "active" => Ok(RecipeStatus::Active),
            "archived" => Ok(RecipeStatus::Archived),
            "deprecated" => Ok(RecipeStatus::Deprecated),
            _ => Err(format!("Invalid recipe status: {s}")),
        }
    }
}

const RECIPE_COLUMNS: &str = "id, product_id, name, description, version, status, \
                              yield_quantity, yield_unit, created_at, updated_at";

/// A recipe row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    /// The product this recipe produces
    pub product_id: String,
    pub name: String,
    pub description: Option<String>,
    pub version: i64,
    pub status: RecipeStatus,
    pub yield_quantity: f64,
    pub yield_unit: Unit,
    pub created_at: String,
    pub updated_at: String,
}

impl Recipe {
    /// Create a new draft recipe with a fresh id at version 1
    pub fn new(product_id: &str, name: &str, yield_quantity: f64, yield_unit: Unit) -> Self {
        let now = now_timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            name: name.to_string(),
            description: None,
            version: 1,
            status: RecipeStatus::Draft,
            yield_quantity,
            yield_unit,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            &format!("INSERT INTO recipes ({RECIPE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                &self.id,
                &self.product_id,
                &self.name,
                &self.description,
                self.version,
                self.status.as_str(),
                self.yield_quantity,
                self.yield_unit.as_str(),
                &self.created_at,
                &self.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Write every mutable column back to the row with this id
    pub fn update(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "UPDATE recipes SET product_id = ?2, name = ?3, description = ?4, version = ?5,
                    status = ?6, yield_quantity = ?7, yield_unit = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                &self.id,
                &self.product_id,
                &self.name,
                &self.description,
                self.version,
                self.status.as_str(),
                self.yield_quantity,
                self.yield_unit.as_str(),
                &self.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn set_status(conn: &Connection, id: &str, status: RecipeStatus) -> Result<()> {
        conn.execute(
            "UPDATE recipes SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), now_timestamp()],
        )?;
        Ok(())
    }

    /// Archive whatever recipe is currently active for `product_id`, other
    /// than `except_id`. Returns the number of recipes archived.
    pub fn archive_active_for_product(
        conn: &Connection,
        product_id: &str,
        except_id: &str,
    ) -> Result<usize> {
        let changed = conn.execute(
            "UPDATE recipes SET status = 'archived', updated_at = ?3
             WHERE product_id = ?1 AND status = 'active' AND id != ?2",
            params![product_id, except_id, now_timestamp()],
        )?;
        Ok(changed)
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Self>> {
        let recipe = conn
            .query_row(
                &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
                [id],
                Self::from_row,
            )
            .optional()?;
        Ok(recipe)
    }

    pub fn find_active_by_product(conn: &Connection, product_id: &str) -> Result<Option<Self>> {
        let recipe = conn
            .query_row(
                &format!(
                    "SELECT {RECIPE_COLUMNS} FROM recipes WHERE product_id = ?1 AND status = 'active'"
                ),
                [product_id],
                Self::from_row,
            )
            .optional()?;
        Ok(recipe)
    }

    /// List recipes, optionally filtered by status, newest first
    pub fn list(conn: &Connection, status: Option<RecipeStatus>) -> Result<Vec<Self>> {
        let recipes = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RECIPE_COLUMNS} FROM recipes WHERE status = ?1 ORDER BY updated_at DESC, id"
                ))?;
                stmt.query_map([status.as_str()], Self::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY updated_at DESC, id"
                ))?;
                stmt.query_map([], Self::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(recipes)
    }

    /// Delete a recipe; ingredients, dependency rows and versions cascade
    pub fn delete(conn: &Connection, id: &str) -> Result<usize> {
        let changed = conn.execute("DELETE FROM recipes WHERE id = ?1", [id])?;
        Ok(changed)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let status_str: String = row.get(5)?;
        let unit_str: String = row.get(7)?;
        Ok(Self {
            id: row.get(0)?,
            product_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            version: row.get(4)?,
            status: parse_text_column(5, &status_str)?,
            yield_quantity: row.get(6)?,
            yield_unit: parse_text_column(7, &unit_str)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}
