// src/db/models/ingredient.rs

//! RecipeIngredient model - edges from a recipe to the products it consumes

use super::parse_text_column;
use crate::error::Result;
use crate::units::Unit;
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

/// One ingredient line of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub recipe_id: String,
    pub ingredient_product_id: String,
    /// Quantity per one recipe yield
    pub quantity: f64,
    pub unit: Unit,
    pub sort_order: u32,
    pub ingredient_group: Option<String>,
    pub notes: Option<String>,
    pub is_optional: bool,
}

impl RecipeIngredient {
    pub fn new(recipe_id: &str, ingredient_product_id: &str, quantity: f64, unit: Unit) -> Self {
        Self {
            id: None,
            recipe_id: recipe_id.to_string(),
            ingredient_product_id: ingredient_product_id.to_string(),
            quantity,
            unit,
            sort_order: 0,
            ingredient_group: None,
            notes: None,
            is_optional: false,
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO recipe_ingredients
                (recipe_id, ingredient_product_id, quantity, unit, sort_order, ingredient_group, notes, is_optional)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &self.recipe_id,
                &self.ingredient_product_id,
                self.quantity,
                self.unit.as_str(),
                self.sort_order,
                &self.ingredient_group,
                &self.notes,
                self.is_optional,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// All ingredients of a recipe in display order
    pub fn find_by_recipe(conn: &Connection, recipe_id: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, recipe_id, ingredient_product_id, quantity, unit, sort_order,
                    ingredient_group, notes, is_optional
             FROM recipe_ingredients WHERE recipe_id = ?1
             ORDER BY sort_order, id",
        )?;

        let ingredients = stmt
            .query_map([recipe_id], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ingredients)
    }

    pub fn delete_by_recipe(conn: &Connection, recipe_id: &str) -> Result<usize> {
        let changed = conn.execute(
            "DELETE FROM recipe_ingredients WHERE recipe_id = ?1",
            [recipe_id],
        )?;
        Ok(changed)
    }

    /// Ids of recipes that list `product_id` as an ingredient
    pub fn find_recipes_using(conn: &Connection, product_id: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT recipe_id FROM recipe_ingredients
             WHERE ingredient_product_id = ?1 ORDER BY recipe_id",
        )?;

        let ids = stmt
            .query_map([product_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(ids)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let unit_str: String = row.get(4)?;
        Ok(Self {
            id: Some(row.get(0)?),
            recipe_id: row.get(1)?,
            ingredient_product_id: row.get(2)?,
            quantity: row.get(3)?,
            unit: parse_text_column(4, &unit_str)?,
            sort_order: row.get(5)?,
            ingredient_group: row.get(6)?,
            notes: row.get(7)?,
            is_optional: row.get(8)?,
        })
    }
}
