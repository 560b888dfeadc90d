// src/hierarchy.rs

//! Depth-bounded expansion of a recipe into a flat ingredient list
//!
//! The resolver walks a recipe's ingredients depth-first. An ingredient that
//! has its own active recipe is a semi-product: its sub-recipe's ingredients
//! are emitted right after it, one level deeper, with quantities multiplied by
//! `required_quantity / sub_recipe.yield_quantity`. Every emitted entry records
//! why expansion stopped or continued there (see [`ExpansionState`]).
//!
//! The traversal uses an explicit work stack, so a corrupted graph can never
//! overflow the call stack, and the effective depth is always bounded by
//! [`ABSOLUTE_DEPTH_CEILING`] whatever the caller asks for.

use crate::error::{Error, Result};
use crate::source::{IngredientLine, RecipeSource, RecipeView};
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Upper bound on expansion depth that no configuration can raise
pub const ABSOLUTE_DEPTH_CEILING: u32 = 64;

/// Why an entry was or was not expanded further
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExpansionState {
    /// No active recipe; a purchased ingredient
    Leaf,
    /// Its sub-recipe's ingredients follow at the next depth level
    Expanded,
    /// Has an active recipe but the depth limit was reached
    DepthExceeded,
    /// The sub-recipe could not be looked up or combined
    Unresolved { reason: String },
    /// The product reappeared on its own path
    CycleAborted { path: Vec<String> },
}

impl ExpansionState {
    /// True when expansion stopped for a reason other than reaching a leaf
    pub fn is_truncation(&self) -> bool {
        matches!(
            self,
            ExpansionState::DepthExceeded
                | ExpansionState::Unresolved { .. }
                | ExpansionState::CycleAborted { .. }
        )
    }
}

/// One entry of an expanded hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedIngredient {
    pub ingredient_product_id: String,
    pub ingredient_name: Option<String>,
    /// Quantity as declared in the recipe that lists it
    pub original_quantity: f64,
    /// Quantity needed for the whole root recipe at the requested scale
    pub absolute_quantity: f64,
    pub unit: Unit,
    /// 1 for direct ingredients of the root recipe
    pub depth_level: u32,
    /// Product ids from the root product down to this entry
    pub path: Vec<String>,
    pub sort_order: u32,
    pub is_optional: bool,
    pub group: Option<String>,
    pub state: ExpansionState,
}

/// Result of expanding a recipe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyExpansion {
    pub recipe_id: String,
    pub root_product_id: String,
    pub entries: Vec<ExpandedIngredient>,
    /// Deepest `depth_level` among the entries (0 when there are none)
    pub depth_reached: u32,
    /// Whether any entry stopped short of a leaf
    pub truncated: bool,
}

/// Expands recipes through a [`RecipeSource`]
pub struct HierarchyResolver {
    source: Arc<dyn RecipeSource>,
    hard_ceiling: u32,
    max_entries: usize,
}

impl HierarchyResolver {
    /// Create a resolver whose depth never exceeds `hard_ceiling`
    ///
    /// `hard_ceiling` is itself clamped to [`ABSOLUTE_DEPTH_CEILING`].
    pub fn new(source: Arc<dyn RecipeSource>, hard_ceiling: u32, max_entries: usize) -> Self {
        Self {
            source,
            hard_ceiling: hard_ceiling.min(ABSOLUTE_DEPTH_CEILING),
            max_entries,
        }
    }

    pub fn hard_ceiling(&self) -> u32 {
        self.hard_ceiling
    }

    /// Depth actually used for a requested `max_depth`
    pub fn effective_depth(&self, max_depth: u32) -> u32 {
        max_depth.min(self.hard_ceiling)
    }

    /// Expand the recipe with id `recipe_id` at unit scale
    pub fn expand(&self, recipe_id: &str, max_depth: u32) -> Result<HierarchyExpansion> {
        let recipe = self
            .source
            .recipe_by_id(recipe_id)?
            .ok_or_else(|| Error::RecipeNotFound(recipe_id.to_string()))?;
        self.expand_recipe(&recipe, 1.0, max_depth)
    }

    /// Expand an already fetched recipe, multiplying every quantity by
    /// `root_scale`
    pub fn expand_recipe(
        &self,
        recipe: &RecipeView,
        root_scale: f64,
        max_depth: u32,
    ) -> Result<HierarchyExpansion> {
        walk(
            self.source.as_ref(),
            recipe,
            root_scale,
            self.effective_depth(max_depth),
            self.max_entries,
        )
    }
}

/// Pending ingredient on the work stack
struct Work {
    line: IngredientLine,
    depth: u32,
    multiplier: f64,
    /// Product ids from the root down to the recipe that lists `line`
    parent_path: Arc<Vec<String>>,
}

fn push_lines(
    stack: &mut Vec<Work>,
    recipe: &RecipeView,
    depth: u32,
    multiplier: f64,
    parent_path: Arc<Vec<String>>,
) {
    // Reversed so that popping yields display order
    for line in recipe.sorted_ingredients().into_iter().rev() {
        stack.push(Work {
            line: line.clone(),
            depth,
            multiplier,
            parent_path: Arc::clone(&parent_path),
        });
    }
}

/// Depth-first expansion of `recipe` through `source`
///
/// `max_depth` must already be clamped by the caller. Lookup failures and
/// inconsistent sub-recipes degrade the affected branch; only exceeding
/// `max_entries` fails the whole expansion.
pub(crate) fn walk(
    source: &dyn RecipeSource,
    recipe: &RecipeView,
    root_scale: f64,
    max_depth: u32,
    max_entries: usize,
) -> Result<HierarchyExpansion> {
    let max_depth = max_depth.clamp(1, ABSOLUTE_DEPTH_CEILING);
    let mut entries: Vec<ExpandedIngredient> = Vec::new();
    let mut stack: Vec<Work> = Vec::new();

    push_lines(
        &mut stack,
        recipe,
        1,
        root_scale,
        Arc::new(vec![recipe.product_id.clone()]),
    );

    while let Some(work) = stack.pop() {
        if entries.len() >= max_entries {
            return Err(Error::TooManyIngredients {
                count: entries.len() + stack.len() + 1,
                max: max_entries,
            });
        }

        let line = work.line;
        let absolute = line.quantity * work.multiplier;
        let mut path = work.parent_path.as_ref().clone();
        path.push(line.product_id.clone());

        let mut name = line.product_name.clone();
        let mut children: Option<(RecipeView, f64)> = None;

        let state = if work.parent_path.contains(&line.product_id) {
            error!(
                "Cycle in stored recipe graph at {}: {}",
                line.product_id,
                path.join(" -> ")
            );
            ExpansionState::CycleAborted { path: path.clone() }
        } else {
            match source.active_recipe_for_product(&line.product_id) {
                Err(e) => {
                    warn!(
                        "Could not look up sub-recipe for {}: {}",
                        line.product_id, e
                    );
                    ExpansionState::Unresolved {
                        reason: e.public_message(),
                    }
                }
                Ok(None) => ExpansionState::Leaf,
                Ok(Some(sub)) => {
                    if name.is_none() {
                        name = sub.product_name.clone();
                    }
                    if work.depth >= max_depth {
                        ExpansionState::DepthExceeded
                    } else if !(sub.yield_quantity.is_finite() && sub.yield_quantity > 0.0) {
                        warn!(
                            "Sub-recipe {} has non-positive yield {}",
                            sub.recipe_id, sub.yield_quantity
                        );
                        ExpansionState::Unresolved {
                            reason: format!(
                                "sub-recipe {} has a non-positive yield",
                                sub.recipe_id
                            ),
                        }
                    } else if sub.yield_unit != line.unit {
                        warn!(
                            "Unit mismatch for {}: ingredient in {}, sub-recipe yields {}",
                            line.product_id, line.unit, sub.yield_unit
                        );
                        ExpansionState::Unresolved {
                            reason: format!(
                                "ingredient unit {} does not match sub-recipe yield unit {}",
                                line.unit, sub.yield_unit
                            ),
                        }
                    } else {
                        let multiplier = absolute / sub.yield_quantity;
                        children = Some((sub, multiplier));
                        ExpansionState::Expanded
                    }
                }
            }
        };

        entries.push(ExpandedIngredient {
            ingredient_product_id: line.product_id,
            ingredient_name: name,
            original_quantity: line.quantity,
            absolute_quantity: absolute,
            unit: line.unit,
            depth_level: work.depth,
            path: path.clone(),
            sort_order: line.sort_order,
            is_optional: line.is_optional,
            group: line.group,
            state,
        });

        if let Some((sub, multiplier)) = children {
            debug!(
                "Expanding {} at depth {} (x{})",
                sub.product_id,
                work.depth + 1,
                multiplier
            );
            push_lines(&mut stack, &sub, work.depth + 1, multiplier, Arc::new(path));
        }
    }

    let depth_reached = entries.iter().map(|e| e.depth_level).max().unwrap_or(0);
    let truncated = entries.iter().any(|e| e.state.is_truncation());

    Ok(HierarchyExpansion {
        recipe_id: recipe.recipe_id.clone(),
        root_product_id: recipe.product_id.clone(),
        entries,
        depth_reached,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory source keyed by product id
    #[derive(Default)]
    struct MapSource {
        recipes: HashMap<String, RecipeView>,
        failing: Vec<String>,
    }

    impl MapSource {
        fn with(
            mut self,
            product: &str,
            yield_qty: f64,
            unit: Unit,
            lines: &[(&str, f64, Unit)],
        ) -> Self {
            let ingredients = lines
                .iter()
                .enumerate()
                .map(|(i, (id, qty, unit))| IngredientLine {
                    product_id: id.to_string(),
                    product_name: None,
                    quantity: *qty,
                    unit: *unit,
                    is_optional: false,
                    sort_order: i as u32,
                    group: None,
                })
                .collect();
            self.recipes.insert(
                product.to_string(),
                RecipeView {
                    recipe_id: format!("r-{product}"),
                    product_id: product.to_string(),
                    product_name: Some(product.to_uppercase()),
                    product_type: None,
                    version: 1,
                    yield_quantity: yield_qty,
                    yield_unit: unit,
                    ingredients,
                },
            );
            self
        }
    }

    impl RecipeSource for MapSource {
        fn active_recipe_for_product(&self, product_id: &str) -> Result<Option<RecipeView>> {
            if self.failing.iter().any(|p| p == product_id) {
                return Err(Error::UpstreamUnavailable("connection refused".into()));
            }
            Ok(self.recipes.get(product_id).cloned())
        }

        fn recipe_by_id(&self, recipe_id: &str) -> Result<Option<RecipeView>> {
            Ok(self.recipes.values().find(|r| r.recipe_id == recipe_id).cloned())
        }
    }

    fn bakery() -> MapSource {
        MapSource::default()
            .with(
                "bread",
                2.0,
                Unit::Piece,
                &[("dough", 1000.0, Unit::Gram), ("seeds", 20.0, Unit::Gram)],
            )
            .with(
                "dough",
                500.0,
                Unit::Gram,
                &[("flour", 300.0, Unit::Gram), ("water", 200.0, Unit::Milliliter)],
            )
    }

    #[test]
    fn test_expand_multiplies_through_sub_recipes() {
        let resolver = HierarchyResolver::new(Arc::new(bakery()), 10, 1000);
        let expansion = resolver.expand("r-bread", 5).unwrap();

        let ids: Vec<_> = expansion
            .entries
            .iter()
            .map(|e| e.ingredient_product_id.as_str())
            .collect();
        assert_eq!(ids, vec!["dough", "flour", "water", "seeds"]);

        let flour = &expansion.entries[1];
        assert_eq!(flour.depth_level, 2);
        assert_eq!(flour.absolute_quantity, 600.0);
        assert_eq!(flour.original_quantity, 300.0);
        assert_eq!(flour.path, vec!["bread", "dough", "flour"]);
        assert_eq!(flour.state, ExpansionState::Leaf);

        assert_eq!(expansion.entries[0].state, ExpansionState::Expanded);
        assert_eq!(expansion.entries[0].ingredient_name.as_deref(), Some("DOUGH"));
        assert_eq!(expansion.depth_reached, 2);
        assert!(!expansion.truncated);
    }

    #[test]
    fn test_root_scale_applies_to_every_level() {
        let source = Arc::new(bakery());
        let resolver = HierarchyResolver::new(source.clone(), 10, 1000);
        let bread = source.recipes["bread"].clone();

        let expansion = resolver.expand_recipe(&bread, 0.5, 5).unwrap();
        assert_eq!(expansion.entries[0].absolute_quantity, 500.0);
        assert_eq!(expansion.entries[1].absolute_quantity, 300.0);
    }

    #[test]
    fn test_depth_limit_marks_entry() {
        let resolver = HierarchyResolver::new(Arc::new(bakery()), 10, 1000);
        let expansion = resolver.expand("r-bread", 1).unwrap();

        assert_eq!(expansion.entries.len(), 2);
        assert_eq!(expansion.entries[0].state, ExpansionState::DepthExceeded);
        assert_eq!(expansion.entries[0].absolute_quantity, 1000.0);
        assert!(expansion.truncated);
    }

    #[test]
    fn test_ceiling_clamps_requested_depth() {
        let resolver = HierarchyResolver::new(Arc::new(bakery()), 1, 1000);
        assert_eq!(resolver.effective_depth(50), 1);
        let expansion = resolver.expand("r-bread", 50).unwrap();
        assert_eq!(expansion.depth_reached, 1);

        let resolver = HierarchyResolver::new(Arc::new(bakery()), 500, 1000);
        assert_eq!(resolver.hard_ceiling(), ABSOLUTE_DEPTH_CEILING);
    }

    #[test]
    fn test_unit_mismatch_degrades_branch() {
        let source = MapSource::default()
            .with("bread", 1.0, Unit::Piece, &[("dough", 2.0, Unit::Kilogram)])
            .with("dough", 500.0, Unit::Gram, &[("flour", 300.0, Unit::Gram)]);
        let resolver = HierarchyResolver::new(Arc::new(source), 10, 1000);
        let expansion = resolver.expand("r-bread", 5).unwrap();

        assert_eq!(expansion.entries.len(), 1);
        assert!(matches!(
            expansion.entries[0].state,
            ExpansionState::Unresolved { .. }
        ));
        assert!(expansion.truncated);
    }

    #[test]
    fn test_lookup_failure_degrades_branch() {
        let mut source = bakery();
        source.failing.push("dough".to_string());
        let resolver = HierarchyResolver::new(Arc::new(source), 10, 1000);
        let expansion = resolver.expand("r-bread", 5).unwrap();

        assert_eq!(expansion.entries.len(), 2);
        assert!(matches!(
            &expansion.entries[0].state,
            ExpansionState::Unresolved { reason } if reason.contains("connection refused")
        ));
        assert_eq!(expansion.entries[1].state, ExpansionState::Leaf);
    }

    #[test]
    fn test_cyclic_source_terminates() {
        let source = MapSource::default()
            .with("a", 1.0, Unit::Gram, &[("b", 1.0, Unit::Gram)])
            .with("b", 1.0, Unit::Gram, &[("a", 1.0, Unit::Gram)]);
        let resolver = HierarchyResolver::new(Arc::new(source), 64, 1000);
        let expansion = resolver.expand("r-a", 64).unwrap();

        assert_eq!(expansion.entries.len(), 2);
        assert_eq!(
            expansion.entries[1].state,
            ExpansionState::CycleAborted {
                path: vec!["a".into(), "b".into(), "a".into()]
            }
        );
    }

    #[test]
    fn test_entry_limit() {
        let resolver = HierarchyResolver::new(Arc::new(bakery()), 10, 3);
        let err = resolver.expand("r-bread", 5).unwrap_err();
        assert!(matches!(err, Error::TooManyIngredients { max: 3, .. }));
    }

    #[test]
    fn test_missing_recipe() {
        let resolver = HierarchyResolver::new(Arc::new(bakery()), 10, 1000);
        assert!(matches!(
            resolver.expand("nope", 5),
            Err(Error::RecipeNotFound(_))
        ));
    }
}
