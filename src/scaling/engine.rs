// src/scaling/engine.rs

//! The scaling engine

use super::{
    ALGORITHM_VERSION, CalculatedIngredient, CalculationMetadata, CalculationRequest,
    CalculationResult,
};
use crate::cache::{self, CacheStats, DEFAULT_CACHE_TTL, ResultCache};
use crate::catalog::ProductCatalog;
use crate::error::{Error, Result};
use crate::hierarchy::{ABSOLUTE_DEPTH_CEILING, HierarchyResolver};
use crate::source::{RecipeSource, RecipeView};
use crate::units::{self, DEFAULT_PRECISION, MAX_PRECISION, Unit};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Numeric limits applied to every calculation
#[derive(Debug, Clone, PartialEq)]
pub struct EngineLimits {
    /// Smallest accepted scale factor
    pub min_scale: f64,
    /// Largest accepted scale factor
    pub max_scale: f64,
    /// Largest ingredient list a calculation may produce (after expansion)
    pub max_ingredients: usize,
    /// Largest `max_depth` a request may ask for
    pub max_depth: u32,
    /// Precision used when a request gives none
    pub default_precision: u32,
    /// Largest accepted batch
    pub max_batch_size: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            min_scale: 0.001,
            max_scale: 1000.0,
            max_ingredients: 1000,
            max_depth: 10,
            default_precision: DEFAULT_PRECISION,
            max_batch_size: 100,
        }
    }
}

/// Request fields after validation
struct Validated<'a> {
    product_id: &'a str,
    target_quantity: f64,
    target_unit: Unit,
    include_hierarchy: bool,
    max_depth: u32,
    precision: u32,
}

pub struct ScalingEngine {
    source: Arc<dyn RecipeSource>,
    cache: Arc<dyn ResultCache>,
    catalog: Option<Arc<dyn ProductCatalog>>,
    resolver: HierarchyResolver,
    limits: EngineLimits,
    cache_ttl: Duration,
}

impl ScalingEngine {
    pub fn new(
        source: Arc<dyn RecipeSource>,
        cache: Arc<dyn ResultCache>,
        mut limits: EngineLimits,
    ) -> Self {
        limits.max_depth = limits.max_depth.min(ABSOLUTE_DEPTH_CEILING);
        let resolver = HierarchyResolver::new(
            Arc::clone(&source),
            limits.max_depth,
            limits.max_ingredients,
        );
        Self {
            source,
            cache,
            catalog: None,
            resolver,
            limits,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Fill in missing ingredient names from `catalog`
    pub fn with_catalog(mut self, catalog: Arc<dyn ProductCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn limits(&self) -> &EngineLimits {
        &self.limits
    }

    /// Scale the active recipe of `request.product_id` to the requested target
    pub fn calculate(&self, request: &CalculationRequest) -> Result<CalculationResult> {
        let start = Instant::now();
        let req = self.validate(request)?;

        let key = cache::fingerprint(
            req.product_id,
            req.target_quantity,
            req.target_unit,
            req.include_hierarchy,
            req.max_depth,
            req.precision,
        );

        match self.cache.get(&key) {
            Ok(Some(mut cached)) => {
                debug!("Cache hit for {} ({})", req.product_id, key);
                cached.cached = true;
                cached.calculation_time_ms = elapsed_ms(start);
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => warn!("Cache lookup failed for {}: {}", key, e),
        }

        let recipe = self
            .source
            .active_recipe_for_product(req.product_id)?
            .ok_or_else(|| Error::RecipeNotFound(req.product_id.to_string()))?;
        if recipe.product_id != req.product_id {
            return Err(Error::InconsistentGraph(format!(
                "Active recipe {} for {} produces {}",
                recipe.recipe_id, req.product_id, recipe.product_id
            )));
        }

        let mut result = self.compute(&req, &recipe)?;
        self.enrich_names(&mut result);
        result.calculation_time_ms = elapsed_ms(start);

        if let Err(e) = self.cache.put(&key, &result, self.cache_ttl) {
            warn!("Failed to cache result for {}: {}", req.product_id, e);
        }

        info!(
            "Calculated {} x{} ({} ingredients) in {:.2} ms",
            result.product_id,
            result.scale_factor,
            result.ingredients.len(),
            result.calculation_time_ms
        );
        Ok(result)
    }

    /// Drop cached results that involve `product_id`
    pub fn invalidate_product(&self, product_id: &str) -> usize {
        match self.cache.invalidate_product(product_id) {
            Ok(removed) => {
                debug!("Invalidated {} cached results for {}", removed, product_id);
                removed
            }
            Err(e) => {
                warn!("Cache invalidation for {} failed: {}", product_id, e);
                0
            }
        }
    }

    pub fn clear_cache(&self) -> usize {
        match self.cache.clear() {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Failed to clear cache: {}", e);
                0
            }
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn validate<'a>(&self, request: &'a CalculationRequest) -> Result<Validated<'a>> {
        if request.product_id.trim().is_empty() {
            return Err(Error::InvalidInput("product_id must not be empty".into()));
        }
        if !(request.target_quantity.is_finite() && request.target_quantity > 0.0) {
            return Err(Error::InvalidInput(format!(
                "Target quantity must be a positive number, got {}",
                request.target_quantity
            )));
        }
        let target_unit: Unit = request.target_unit.parse()?;

        if request.max_depth == 0 {
            return Err(Error::InvalidInput("max_depth must be at least 1".into()));
        }
        if request.max_depth > self.limits.max_depth {
            return Err(Error::InvalidInput(format!(
                "max_depth {} exceeds the maximum of {}",
                request.max_depth, self.limits.max_depth
            )));
        }

        let precision = request.precision.unwrap_or(self.limits.default_precision);
        if precision > MAX_PRECISION {
            return Err(Error::InvalidInput(format!(
                "Precision {precision} exceeds the maximum of {MAX_PRECISION}"
            )));
        }

        Ok(Validated {
            product_id: &request.product_id,
            target_quantity: request.target_quantity,
            target_unit,
            include_hierarchy: request.include_hierarchy,
            max_depth: request.max_depth,
            precision,
        })
    }

    fn compute(&self, req: &Validated<'_>, recipe: &RecipeView) -> Result<CalculationResult> {
        if !(recipe.yield_quantity.is_finite() && recipe.yield_quantity > 0.0) {
            return Err(Error::InvalidInput(format!(
                "Recipe {} has a non-positive yield of {}",
                recipe.recipe_id, recipe.yield_quantity
            )));
        }
        if req.target_unit != recipe.yield_unit {
            return Err(Error::InvalidInput(format!(
                "Unit mismatch: target is in {} but recipe {} yields {}",
                req.target_unit, recipe.recipe_id, recipe.yield_unit
            )));
        }

        let scale_factor = req.target_quantity / recipe.yield_quantity;
        if !(self.limits.min_scale..=self.limits.max_scale).contains(&scale_factor) {
            return Err(Error::InvalidScaleFactor {
                factor: scale_factor,
                min: self.limits.min_scale,
                max: self.limits.max_scale,
            });
        }

        let (ingredients, depth_reached, truncated) = if req.include_hierarchy {
            let expansion = self
                .resolver
                .expand_recipe(recipe, scale_factor, req.max_depth)?;
            let ingredients = expansion
                .entries
                .into_iter()
                .map(|entry| CalculatedIngredient {
                    calculated_quantity: units::round_quantity(
                        entry.absolute_quantity,
                        entry.unit,
                        req.precision,
                    ),
                    ingredient_product_id: entry.ingredient_product_id,
                    ingredient_name: entry.ingredient_name,
                    original_quantity: entry.original_quantity,
                    unit: entry.unit,
                    sort_order: entry.sort_order,
                    depth_level: entry.depth_level,
                    path: entry.path,
                    is_optional: entry.is_optional,
                    group: entry.group,
                    expansion: Some(entry.state),
                })
                .collect::<Vec<_>>();
            (ingredients, expansion.depth_reached, expansion.truncated)
        } else {
            let ingredients = recipe
                .sorted_ingredients()
                .into_iter()
                .map(|line| CalculatedIngredient {
                    ingredient_product_id: line.product_id.clone(),
                    ingredient_name: line.product_name.clone(),
                    original_quantity: line.quantity,
                    calculated_quantity: units::round_quantity(
                        line.quantity * scale_factor,
                        line.unit,
                        req.precision,
                    ),
                    unit: line.unit,
                    sort_order: line.sort_order,
                    depth_level: 1,
                    path: vec![recipe.product_id.clone(), line.product_id.clone()],
                    is_optional: line.is_optional,
                    group: line.group.clone(),
                    expansion: None,
                })
                .collect::<Vec<_>>();
            let depth = if ingredients.is_empty() { 0 } else { 1 };
            (ingredients, depth, false)
        };

        if ingredients.len() > self.limits.max_ingredients {
            return Err(Error::TooManyIngredients {
                count: ingredients.len(),
                max: self.limits.max_ingredients,
            });
        }

        Ok(CalculationResult {
            product_id: recipe.product_id.clone(),
            product_name: recipe.product_name.clone(),
            target_quantity: req.target_quantity,
            target_unit: req.target_unit,
            scale_factor: units::round_half_up(scale_factor, 6),
            original_yield: recipe.yield_quantity,
            original_yield_unit: recipe.yield_unit,
            calculation_metadata: CalculationMetadata {
                recipe_id: recipe.recipe_id.clone(),
                recipe_version: recipe.version,
                include_hierarchy: req.include_hierarchy,
                max_depth: req.max_depth,
                precision: req.precision,
                ingredient_count: ingredients.len(),
                depth_reached,
                truncated,
                algorithm_version: ALGORITHM_VERSION.to_string(),
            },
            ingredients,
            cached: false,
            calculation_time_ms: 0.0,
        })
    }

    /// Fill missing display names from the catalog; failures only log
    fn enrich_names(&self, result: &mut CalculationResult) {
        let Some(catalog) = &self.catalog else {
            return;
        };

        let mut wanted: Vec<String> = result
            .ingredients
            .iter()
            .filter(|i| i.ingredient_name.is_none())
            .map(|i| i.ingredient_product_id.clone())
            .collect();
        if result.product_name.is_none() {
            wanted.push(result.product_id.clone());
        }
        if wanted.is_empty() {
            return;
        }
        wanted.sort();
        wanted.dedup();

        match catalog.get_batch(&wanted) {
            Ok(found) => {
                for ingredient in result
                    .ingredients
                    .iter_mut()
                    .filter(|i| i.ingredient_name.is_none())
                {
                    if let Some(info) = found.get(&ingredient.ingredient_product_id) {
                        ingredient.ingredient_name = Some(info.name.clone());
                    }
                }
                if result.product_name.is_none()
                    && let Some(info) = found.get(&result.product_id)
                {
                    result.product_name = Some(info.name.clone());
                }
            }
            Err(e) => warn!("Could not fetch product names: {}", e),
        }
    }
}

pub(super) fn elapsed_ms(start: Instant) -> f64 {
    units::round_half_up(start.elapsed().as_secs_f64() * 1000.0, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryResultCache, NoopCache};
    use crate::catalog::ProductInfo;
    use crate::source::IngredientLine;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MapSource(HashMap<String, RecipeView>);

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
            self.0.insert(
                product.to_string(),
                RecipeView {
                    recipe_id: format!("r-{product}"),
                    product_id: product.to_string(),
                    product_name: None,
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
            Ok(self.0.get(product_id).cloned())
        }

        fn recipe_by_id(&self, recipe_id: &str) -> Result<Option<RecipeView>> {
            Ok(self.0.values().find(|r| r.recipe_id == recipe_id).cloned())
        }
    }

    struct NameCatalog;

    impl ProductCatalog for NameCatalog {
        fn get(&self, id: &str) -> Result<Option<ProductInfo>> {
            Ok(Some(ProductInfo {
                id: id.to_string(),
                name: format!("{id} (catalog)"),
                product_type: None,
                unit: None,
            }))
        }
    }

    struct DownCatalog;

    impl ProductCatalog for DownCatalog {
        fn get(&self, _id: &str) -> Result<Option<ProductInfo>> {
            Err(Error::UpstreamUnavailable("catalog down".into()))
        }
    }

    /// Cache whose backing store is unreachable
    #[derive(Default)]
    struct FailingCache {
        calls: AtomicUsize,
    }

    impl ResultCache for FailingCache {
        fn get(&self, _key: &str) -> Result<Option<CalculationResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::CacheError("connection refused".into()))
        }

        fn put(&self, _key: &str, _result: &CalculationResult, _ttl: Duration) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::CacheError("connection refused".into()))
        }

        fn invalidate_product(&self, _product_id: &str) -> Result<usize> {
            Err(Error::CacheError("connection refused".into()))
        }

        fn clear(&self) -> Result<usize> {
            Err(Error::CacheError("connection refused".into()))
        }

        fn stats(&self) -> CacheStats {
            CacheStats::default()
        }
    }

    fn cookies() -> MapSource {
        MapSource::default()
            .with(
                "cookies",
                24.0,
                Unit::Piece,
                &[("eggs", 2.0, Unit::Piece), ("flour", 500.0, Unit::Gram)],
            )
            .with("sauce", 1000.0, Unit::Gram, &[("tomato", 600.0, Unit::Gram)])
    }

    fn engine(source: MapSource) -> ScalingEngine {
        ScalingEngine::new(Arc::new(source), Arc::new(NoopCache), EngineLimits::default())
    }

    #[test]
    fn test_recipe_for_wrong_product_is_inconsistent() {
        let mut source = cookies();
        let sauce = source.0["sauce"].clone();
        source.0.insert("ketchup".to_string(), sauce);

        let err = engine(source)
            .calculate(&CalculationRequest::new("ketchup", 500.0, "gram"))
            .unwrap_err();
        assert!(matches!(err, Error::InconsistentGraph(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Internal);
    }

    #[test]
    fn test_scale_up_example() {
        let result = engine(cookies())
            .calculate(&CalculationRequest::new("cookies", 100.0, "piece"))
            .unwrap();

        assert_eq!(result.scale_factor, 4.166667);
        assert_eq!(result.ingredients[0].calculated_quantity, 8.0);
        assert_eq!(result.ingredients[1].calculated_quantity, 2083.333);
        assert_eq!(result.calculation_metadata.precision, 3);
        assert_eq!(result.calculation_metadata.algorithm_version, "v1.0");
        assert!(!result.cached);
    }

    #[test]
    fn test_precision_zero() {
        let result = engine(cookies())
            .calculate(&CalculationRequest::new("cookies", 100.0, "piece").with_precision(0))
            .unwrap();
        assert_eq!(result.ingredients[1].calculated_quantity, 2083.0);
    }

    #[test]
    fn test_scale_down_example() {
        let result = engine(cookies())
            .calculate(&CalculationRequest::new("sauce", 500.0, "g"))
            .unwrap();
        assert_eq!(result.scale_factor, 0.5);
        assert_eq!(result.ingredients[0].calculated_quantity, 300.0);
    }

    #[test]
    fn test_input_errors() {
        let engine = engine(cookies());
        let cases = [
            CalculationRequest::new("cookies", 0.0, "piece"),
            CalculationRequest::new("cookies", -1.0, "piece"),
            CalculationRequest::new("cookies", f64::INFINITY, "piece"),
            CalculationRequest::new("cookies", 10.0, "cup"),
            CalculationRequest::new("cookies", 10.0, "gram"),
            CalculationRequest::new("cookies", 10.0, "piece").hierarchical(11),
            CalculationRequest::new("cookies", 10.0, "piece").hierarchical(0),
            CalculationRequest::new("cookies", 10.0, "piece").with_precision(11),
        ];
        for request in cases {
            let err = engine.calculate(&request).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{request:?} -> {err}");
        }
    }

    #[test]
    fn test_missing_recipe() {
        let err = engine(cookies())
            .calculate(&CalculationRequest::new("cake", 1.0, "piece"))
            .unwrap_err();
        assert!(matches!(err, Error::RecipeNotFound(ref id) if id == "cake"));
    }

    #[test]
    fn test_scale_factor_bounds() {
        let engine = engine(cookies());
        let err = engine
            .calculate(&CalculationRequest::new("cookies", 0.001, "piece"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidScaleFactor { .. }));

        let err = engine
            .calculate(&CalculationRequest::new("cookies", 24_001.0, "piece"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidScaleFactor { .. }));

        assert!(engine
            .calculate(&CalculationRequest::new("cookies", 24_000.0, "piece"))
            .is_ok());
    }

    #[test]
    fn test_too_many_ingredients() {
        let limits = EngineLimits {
            max_ingredients: 1,
            ..EngineLimits::default()
        };
        let engine = ScalingEngine::new(Arc::new(cookies()), Arc::new(NoopCache), limits);
        let err = engine
            .calculate(&CalculationRequest::new("cookies", 24.0, "piece"))
            .unwrap_err();
        assert!(matches!(err, Error::TooManyIngredients { count: 2, max: 1 }));
    }

    #[test]
    fn test_hierarchical_mode_rounds_expanded_entries() {
        let source = MapSource::default()
            .with("pizza", 1.0, Unit::Piece, &[("sauce", 250.0, Unit::Gram)])
            .with("sauce", 1000.0, Unit::Gram, &[("tomato", 600.0, Unit::Gram)]);
        let result = engine(source)
            .calculate(&CalculationRequest::new("pizza", 3.0, "piece").hierarchical(5))
            .unwrap();

        assert_eq!(result.ingredients.len(), 2);
        assert_eq!(result.ingredients[0].calculated_quantity, 750.0);
        assert_eq!(result.ingredients[1].calculated_quantity, 450.0);
        assert_eq!(result.ingredients[1].depth_level, 2);
        assert_eq!(result.calculation_metadata.depth_reached, 2);
        assert!(!result.calculation_metadata.truncated);
    }

    #[test]
    fn test_cache_hit_is_flagged() {
        let engine = ScalingEngine::new(
            Arc::new(cookies()),
            Arc::new(MemoryResultCache::new(16)),
            EngineLimits::default(),
        );
        let request = CalculationRequest::new("cookies", 48.0, "piece");

        let first = engine.calculate(&request).unwrap();
        let second = engine.calculate(&request).unwrap();
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.ingredients, second.ingredients);
        assert_eq!(engine.cache_stats().hits, 1);

        // "pcs" normalizes to the same key
        let third = engine
            .calculate(&CalculationRequest::new("cookies", 48.0, "pcs"))
            .unwrap();
        assert!(third.cached);

        assert_eq!(engine.invalidate_product("flour"), 1);
        assert!(!engine.calculate(&request).unwrap().cached);
        assert_eq!(engine.clear_cache(), 1);
    }

    #[test]
    fn test_cache_failures_do_not_fail_calculation() {
        let cache = Arc::new(FailingCache::default());
        let engine = ScalingEngine::new(
            Arc::new(cookies()),
            Arc::clone(&cache) as Arc<dyn ResultCache>,
            EngineLimits::default(),
        );
        let request = CalculationRequest::new("cookies", 100.0, "piece");

        let first = engine.calculate(&request).unwrap();
        assert!(!first.cached);
        assert_eq!(first.scale_factor, 4.166667);
        assert_eq!(first.ingredients[0].calculated_quantity, 8.0);
        assert_eq!(first.ingredients[1].calculated_quantity, 2083.333);

        let second = engine.calculate(&request).unwrap();
        assert!(!second.cached);
        assert_eq!(first.ingredients, second.ingredients);
        assert_eq!(cache.calls.load(Ordering::SeqCst), 4);

        assert_eq!(engine.invalidate_product("flour"), 0);
        assert_eq!(engine.clear_cache(), 0);
    }

    #[test]
    fn test_catalog_enrichment() {
        let engine = engine(cookies()).with_catalog(Arc::new(NameCatalog));
        let result = engine
            .calculate(&CalculationRequest::new("cookies", 24.0, "piece"))
            .unwrap();
        assert_eq!(result.product_name.as_deref(), Some("cookies (catalog)"));
        assert_eq!(result.ingredients[0].ingredient_name.as_deref(), Some("eggs (catalog)"));
    }

    #[test]
    fn test_catalog_failure_does_not_fail_calculation() {
        let engine = engine(cookies()).with_catalog(Arc::new(DownCatalog));
        let result = engine
            .calculate(&CalculationRequest::new("cookies", 24.0, "piece"))
            .unwrap();
        assert!(result.ingredients[0].ingredient_name.is_none());
    }
}
