// src/db/models/version.rs

//! RecipeVersion model - JSON snapshots of a recipe's history

use super::now_timestamp;
use crate::error::Result;
use rusqlite::{Connection, Row, params};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeVersion {
    pub id: Option<i64>,
    pub recipe_id: String,
    pub version_number: i64,
    /// Recipe row plus ingredient lines, serialized as JSON
    pub recipe_data: serde_json::Value,
    pub change_summary: Option<String>,
    pub created_at: String,
}

impl RecipeVersion {
    pub fn new(
        recipe_id: &str,
        version_number: i64,
        recipe_data: serde_json::Value,
        change_summary: Option<String>,
    ) -> Self {
        Self {
            id: None,
            recipe_id: recipe_id.to_string(),
            version_number,
            recipe_data,
            change_summary,
            created_at: now_timestamp(),
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        let data = serde_json::to_string(&self.recipe_data)?;
        conn.execute(
            "INSERT INTO recipe_versions (recipe_id, version_number, recipe_data, change_summary, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &self.recipe_id,
                self.version_number,
                &data,
                &self.change_summary,
                &self.created_at,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Version history of a recipe, newest first
    pub fn find_by_recipe(conn: &Connection, recipe_id: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, recipe_id, version_number, recipe_data, change_summary, created_at
             FROM recipe_versions WHERE recipe_id = ?1
             ORDER BY version_number DESC",
        )?;

        let versions = stmt
            .query_map([recipe_id], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(versions)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let data: String = row.get(3)?;
        let recipe_data = serde_json::from_str(&data).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Self {
            id: Some(row.get(0)?),
            recipe_id: row.get(1)?,
            version_number: row.get(2)?,
            recipe_data,
            change_summary: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}
