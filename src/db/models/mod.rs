// src/db/models/mod.rs

//! Data models for the product/recipe graph
//!
//! Each struct corresponds to a database table and provides methods for
//! creating, reading, updating, and deleting records. Methods take a plain
//! `&Connection` so they work both on a connection and inside a transaction.

mod dependency;
mod ingredient;
mod product;
mod recipe;
mod version;

pub use dependency::DependencyEdge;
pub use ingredient::RecipeIngredient;
pub use product::{Product, ProductType};
pub use recipe::{Recipe, RecipeStatus};
pub use version::RecipeVersion;

use std::fmt::Display;
use std::str::FromStr;

/// Parse a TEXT column into a typed value, reporting bad data as a
/// conversion failure on that column
pub(crate) fn parse_text_column<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            )),
        )
    })
}

/// Current time as an RFC 3339 string
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
