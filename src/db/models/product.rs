// src/db/models/product.rs

//! Product model - the nodes of the recipe graph

use super::{now_timestamp, parse_text_column};
use crate::error::Result;
use crate::units::Unit;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What role a product plays in production
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Purchased ingredient, never produced by a recipe
    Raw,
    /// Produced by a recipe and used as an ingredient elsewhere
    SemiProduct,
    /// Produced by a recipe and sold as-is
    Finished,
}

impl ProductType {
    pub fn as_str(&self) -> &str {
        match self {
            ProductType::Raw => "raw",
            ProductType::SemiProduct => "semi_product",
            ProductType::Finished => "finished",
        }
    }
}

impl FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "raw" => Ok(ProductType::Raw),
            "semi_product" | "semi-product" => Ok(ProductType::SemiProduct),
            "finished" => Ok(ProductType::Finished),
            _ => Err(format!("Invalid product type: {s}")),
        }
    }
}

/// A product known to the local registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub product_type: ProductType,
    /// Base unit the product is measured in
    pub unit: Unit,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Product {
    pub fn new(id: &str, name: &str, product_type: ProductType, unit: Unit) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            product_type,
            unit,
            created_at: None,
        }
    }

    /// Insert the product, or update name/type/unit if the id already exists
    pub fn upsert(&self, conn: &Connection) -> Result<()> {
        let created_at = self.created_at.clone().unwrap_or_else(now_timestamp);
        conn.execute(
            "INSERT INTO products (id, name, product_type, unit, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                product_type = excluded.product_type,
                unit = excluded.unit",
            params![
                &self.id,
                &self.name,
                self.product_type.as_str(),
                self.unit.as_str(),
                &created_at,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Self>> {
        let product = conn
            .query_row(
                "SELECT id, name, product_type, unit, created_at FROM products WHERE id = ?1",
                [id],
                Self::from_row,
            )
            .optional()?;
        Ok(product)
    }

    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, product_type, unit, created_at FROM products ORDER BY name",
        )?;
        let products = stmt
            .query_map([], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    pub fn delete(conn: &Connection, id: &str) -> Result<()> {
        conn.execute("DELETE FROM products WHERE id = ?1", [id])?;
        Ok(())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let type_str: String = row.get(2)?;
        let unit_str: String = row.get(3)?;
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            product_type: parse_text_column(2, &type_str)?,
            unit: parse_text_column(3, &unit_str)?,
            created_at: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_upsert_updates_existing_product() {
        let conn = db::open_in_memory().unwrap();

        Product::new("dough", "Dough", ProductType::Raw, Unit::Gram)
            .upsert(&conn)
            .unwrap();
        Product::new("dough", "Bread dough", ProductType::SemiProduct, Unit::Gram)
            .upsert(&conn)
            .unwrap();

        let all = Product::list_all(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Bread dough");
        assert_eq!(all[0].product_type, ProductType::SemiProduct);
        assert!(all[0].created_at.is_some());
    }

    #[test]
    fn test_product_type_parsing() {
        assert_eq!("semi-product".parse::<ProductType>().unwrap(), ProductType::SemiProduct);
        assert!("gadget".parse::<ProductType>().is_err());
    }
}
