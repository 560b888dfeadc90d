// src/graph/mod.rs

//! The product/recipe graph
//!
//! [`GraphStore`] owns products, recipes and ingredient edges and guarantees
//! that the product dependency graph (A -> B when A's active recipe lists B)
//! never contains a cycle. This module also defines the input and report
//! types of the store's operations.

pub mod cycle;
mod store;

pub use store::{DEFAULT_MAX_INGREDIENTS_PER_RECIPE, DEFAULT_MAX_RECIPE_DEPTH, GraphStore};

use crate::db::models::{Recipe, RecipeIngredient, RecipeStatus};
use crate::units::Unit;
use serde::{Deserialize, Serialize};

/// An ingredient line of a recipe being created or replaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientDraft {
    pub product_id: String,
    pub quantity: f64,
    pub unit: Unit,
    #[serde(default)]
    pub is_optional: bool,
    /// Defaults to the line's position in the draft
    #[serde(default)]
    pub sort_order: Option<u32>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl IngredientDraft {
    pub fn new(product_id: &str, quantity: f64, unit: Unit) -> Self {
        Self {
            product_id: product_id.to_string(),
            quantity,
            unit,
            is_optional: false,
            sort_order: None,
            group: None,
            notes: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }
}

/// A recipe together with its complete ingredient set
///
/// Upserting a draft replaces the recipe's ingredient set as a whole. When
/// `id` names an existing recipe that recipe is updated, otherwise a new one
/// is created (with `id` if given).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub yield_quantity: f64,
    pub yield_unit: Unit,
    #[serde(default = "default_status")]
    pub status: RecipeStatus,
    #[serde(default)]
    pub ingredients: Vec<IngredientDraft>,
    #[serde(default)]
    pub change_summary: Option<String>,
}

fn default_status() -> RecipeStatus {
    RecipeStatus::Draft
}

impl RecipeDraft {
    pub fn new(product_id: &str, name: &str, yield_quantity: f64, yield_unit: Unit) -> Self {
        Self {
            id: None,
            product_id: product_id.to_string(),
            name: name.to_string(),
            description: None,
            yield_quantity,
            yield_unit,
            status: RecipeStatus::Draft,
            ingredients: Vec::new(),
            change_summary: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn active(mut self) -> Self {
        self.status = RecipeStatus::Active;
        self
    }

    pub fn ingredient(mut self, product_id: &str, quantity: f64, unit: Unit) -> Self {
        self.ingredients
            .push(IngredientDraft::new(product_id, quantity, unit));
        self
    }

    pub fn with_ingredient(mut self, ingredient: IngredientDraft) -> Self {
        self.ingredients.push(ingredient);
        self
    }

    /// Every product id the draft refers to, output first
    pub fn referenced_products(&self) -> Vec<String> {
        let mut ids = Vec::with_capacity(self.ingredients.len() + 1);
        ids.push(self.product_id.clone());
        ids.extend(self.ingredients.iter().map(|i| i.product_id.clone()));
        ids
    }
}

/// A stored recipe with its ingredient lines
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<RecipeIngredient>,
}

/// One row of [`GraphStore::hierarchy`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyRow {
    pub ingredient_product_id: String,
    pub ingredient_name: Option<String>,
    /// Quantity needed for one yield of the root recipe
    pub quantity: f64,
    pub unit: Unit,
    pub depth_level: u32,
    pub path: Vec<String>,
}

/// Outcome of [`GraphStore::validate_recipe`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub recipe_id: String,
    pub is_valid: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

impl ComplexityLevel {
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s <= 10 => ComplexityLevel::Simple,
            s if s <= 25 => ComplexityLevel::Moderate,
            s if s <= 50 => ComplexityLevel::Complex,
            _ => ComplexityLevel::VeryComplex,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ComplexityLevel::Simple => "simple",
            ComplexityLevel::Moderate => "moderate",
            ComplexityLevel::Complex => "complex",
            ComplexityLevel::VeryComplex => "very_complex",
        }
    }
}

/// Complexity metrics of a recipe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexityReport {
    pub recipe_id: String,
    pub ingredient_count: usize,
    pub required_ingredients: usize,
    pub optional_ingredients: usize,
    pub ingredient_groups: usize,
    /// Deepest level of the expanded hierarchy (at least 1)
    pub hierarchy_depth: u32,
    pub total_ingredients_expanded: usize,
    pub complexity_score: i64,
    pub complexity_level: ComplexityLevel,
}

impl ComplexityReport {
    /// `2 * ingredients + 5 * (depth - 1) - groups`
    pub fn score(ingredient_count: usize, hierarchy_depth: u32, groups: usize) -> i64 {
        ingredient_count as i64 * 2 + (i64::from(hierarchy_depth) - 1) * 5 - groups as i64
    }
}
