// src/lib.rs

//! Recipe Scaler
//!
//! Scales product recipes to a target quantity and expands sub-recipes
//! (semi-products) into absolute quantities of their own ingredients.
//!
//! # Architecture
//!
//! - Database-first: the recipe graph lives in SQLite ([`graph::GraphStore`])
//! - Acyclic by construction: a recipe can only become active if the
//!   product dependency graph stays free of cycles
//! - Versioned: significant recipe changes bump the version and keep a
//!   JSON snapshot of the previous state
//! - Pluggable sources: the [`scaling::ScalingEngine`] reads recipes through
//!   [`source::RecipeSource`], served locally or by a remote recipe service
//! - Cached: results are keyed by a fingerprint of the normalized request
//!   and dropped when any involved product changes

pub mod cache;
pub mod catalog;
pub mod client;
pub mod config;
pub mod db;
mod error;
pub mod graph;
pub mod hierarchy;
pub mod scaling;
pub mod source;
pub mod units;

pub use cache::{CacheStats, MemoryResultCache, NoopCache, ResultCache};
pub use catalog::{ProductCatalog, ProductInfo};
pub use config::ScalerConfig;
pub use error::{Error, ErrorKind, Result};
pub use graph::{GraphStore, IngredientDraft, RecipeDraft};
pub use hierarchy::{ExpansionState, HierarchyExpansion, HierarchyResolver};
pub use scaling::{
    BatchResult, CalculationRequest, CalculationResult, EngineLimits, ScalingEngine,
};
pub use source::{IngredientLine, RecipeSource, RecipeView};
pub use units::Unit;
