// src/source.rs

//! Read-only view of recipes as seen by the resolver and the engine
//!
//! [`RecipeSource`] is implemented by the local [`crate::graph::GraphStore`]
//! and by [`crate::client::HttpRecipeSource`] for a remote graph owner. The
//! view types double as the JSON wire format of the remote endpoints.

use crate::db::models::ProductType;
use crate::error::Result;
use crate::units::Unit;
use serde::{Deserialize, Serialize};

/// One ingredient line of a recipe view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub product_id: String,
    #[serde(default)]
    pub product_name: Option<String>,
    /// Quantity per one recipe yield
    pub quantity: f64,
    pub unit: Unit,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub sort_order: u32,
    #[serde(default)]
    pub group: Option<String>,
}

/// An active recipe together with its ingredient lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeView {
    pub recipe_id: String,
    pub product_id: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default = "default_version")]
    pub version: i64,
    pub yield_quantity: f64,
    pub yield_unit: Unit,
    #[serde(default)]
    pub ingredients: Vec<IngredientLine>,
}

fn default_version() -> i64 {
    1
}

impl RecipeView {
    /// Ingredient lines in display order
    pub fn sorted_ingredients(&self) -> Vec<&IngredientLine> {
        let mut lines: Vec<_> = self.ingredients.iter().collect();
        lines.sort_by_key(|line| line.sort_order);
        lines
    }
}

/// Lookup of active recipes
pub trait RecipeSource: Send + Sync {
    /// The active recipe producing `product_id`, if any
    fn active_recipe_for_product(&self, product_id: &str) -> Result<Option<RecipeView>>;

    /// A recipe by id, whatever its status
    fn recipe_by_id(&self, recipe_id: &str) -> Result<Option<RecipeView>>;
}
