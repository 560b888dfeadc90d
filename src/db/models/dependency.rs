// src/db/models/dependency.rs

//! DependencyEdge model - derived recipe -> product rows for reachability

use crate::error::Result;
use rusqlite::{Connection, Row, params};
use serde::Serialize;
use std::collections::HashMap;

/// Derived edge from a recipe to a product it depends on
///
/// These rows are rebuilt from `recipe_ingredients` whenever a recipe's
/// ingredient set changes and are never edited directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub id: Option<i64>,
    pub parent_recipe_id: String,
    pub child_product_id: String,
    pub dependency_type: String,
    pub created_at: Option<String>,
}

impl DependencyEdge {
    /// Replace every dependency row of `recipe_id` with one row per child
    pub fn rebuild_for_recipe(conn: &Connection, recipe_id: &str, children: &[&str]) -> Result<()> {
        conn.execute(
            "DELETE FROM recipe_dependencies WHERE parent_recipe_id = ?1",
            [recipe_id],
        )?;

        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO recipe_dependencies (parent_recipe_id, child_product_id, dependency_type)
             VALUES (?1, ?2, 'ingredient')",
        )?;
        for child in children {
            stmt.execute(params![recipe_id, child])?;
        }
        Ok(())
    }

    pub fn find_by_parent(conn: &Connection, recipe_id: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, parent_recipe_id, child_product_id, dependency_type, created_at
             FROM recipe_dependencies WHERE parent_recipe_id = ?1
             ORDER BY child_product_id",
        )?;

        let edges = stmt
            .query_map([recipe_id], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(edges)
    }

    /// Product-level adjacency over active recipes only:
    /// `product -> [products its active recipe consumes]`
    pub fn active_adjacency(conn: &Connection) -> Result<HashMap<String, Vec<String>>> {
        let mut stmt = conn.prepare(
            "SELECT r.product_id, d.child_product_id
             FROM recipe_dependencies d
             JOIN recipes r ON r.id = d.parent_recipe_id
             WHERE r.status = 'active'
             ORDER BY r.product_id, d.child_product_id",
        )?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        for (parent, child) in rows {
            adjacency.entry(parent).or_default().push(child);
        }
        Ok(adjacency)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            parent_recipe_id: row.get(1)?,
            child_product_id: row.get(2)?,
            dependency_type: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}
