// src/scaling/mod.rs

//! Recipe scaling
//!
//! [`ScalingEngine`] turns "I need N units of product P" into the ingredient
//! quantities required, optionally expanding semi-products through their own
//! recipes. Requests and results are plain serde types so they can be read
//! from and written to JSON directly.

mod batch;
mod engine;

pub use batch::{BatchError, BatchResult, BatchSummary};
pub use engine::{EngineLimits, ScalingEngine};

use crate::hierarchy::ExpansionState;
use crate::units::Unit;
use serde::{Deserialize, Serialize};

/// Version tag reported in every result's metadata
pub const ALGORITHM_VERSION: &str = "v1.0";

/// Default hierarchy depth when a request does not specify one
pub const DEFAULT_MAX_DEPTH: u32 = 5;

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

/// A single scaling request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub product_id: String,
    pub target_quantity: f64,
    /// Unit name as given by the caller; parsed by the engine
    pub target_unit: String,
    #[serde(default)]
    pub include_hierarchy: bool,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Decimal places for continuous units; the engine default when absent
    #[serde(default)]
    pub precision: Option<u32>,
}

impl CalculationRequest {
    pub fn new(product_id: &str, target_quantity: f64, target_unit: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            target_quantity,
            target_unit: target_unit.to_string(),
            include_hierarchy: false,
            max_depth: DEFAULT_MAX_DEPTH,
            precision: None,
        }
    }

    pub fn hierarchical(mut self, max_depth: u32) -> Self {
        self.include_hierarchy = true;
        self.max_depth = max_depth;
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }
}

/// One ingredient of a calculation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedIngredient {
    pub ingredient_product_id: String,
    pub ingredient_name: Option<String>,
    /// Quantity as declared in the recipe that lists it
    pub original_quantity: f64,
    /// Quantity needed for the requested target, rounded per unit
    pub calculated_quantity: f64,
    pub unit: Unit,
    pub sort_order: u32,
    pub depth_level: u32,
    pub path: Vec<String>,
    pub is_optional: bool,
    #[serde(default)]
    pub group: Option<String>,
    /// Present only in hierarchical mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expansion: Option<ExpansionState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationMetadata {
    pub recipe_id: String,
    pub recipe_version: i64,
    pub include_hierarchy: bool,
    pub max_depth: u32,
    pub precision: u32,
    pub ingredient_count: usize,
    pub depth_reached: u32,
    /// Whether any branch stopped short of a leaf
    pub truncated: bool,
    pub algorithm_version: String,
}

/// Result of scaling one product's recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub product_id: String,
    pub product_name: Option<String>,
    pub target_quantity: f64,
    pub target_unit: Unit,
    /// `target_quantity / original_yield`, rounded to 6 places
    pub scale_factor: f64,
    pub original_yield: f64,
    pub original_yield_unit: Unit,
    pub ingredients: Vec<CalculatedIngredient>,
    pub calculation_metadata: CalculationMetadata,
    pub cached: bool,
    pub calculation_time_ms: f64,
}

impl CalculationResult {
    /// Every product id the result depends on: the target and all ingredients
    pub fn involved_products(&self) -> Vec<&str> {
        let mut ids = vec![self.product_id.as_str()];
        ids.extend(
            self.ingredients
                .iter()
                .map(|i| i.ingredient_product_id.as_str()),
        );
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_from_json() {
        let request: CalculationRequest = serde_json::from_str(
            r#"{"product_id": "bread", "target_quantity": 100, "target_unit": "piece"}"#,
        )
        .unwrap();
        assert!(!request.include_hierarchy);
        assert_eq!(request.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(request.precision, None);
        assert_eq!(request.target_quantity, 100.0);
    }

    #[test]
    fn test_request_builders() {
        let request = CalculationRequest::new("cake", 2.0, "pcs")
            .hierarchical(3)
            .with_precision(1);
        assert!(request.include_hierarchy);
        assert_eq!(request.max_depth, 3);
        assert_eq!(request.precision, Some(1));
    }
}
