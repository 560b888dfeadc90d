// tests/hierarchy.rs

//! Hierarchy expansion over stored graphs, including graphs that were
//! corrupted behind the store's back.

mod common;

use common::{add_product, seed_bakery, setup_db};
use recipe_scaler::db::models::ProductType;
use recipe_scaler::hierarchy::ABSOLUTE_DEPTH_CEILING;
use recipe_scaler::{
    CalculationRequest, EngineLimits, Error, ExpansionState, GraphStore, HierarchyResolver,
    NoopCache, RecipeDraft, RecipeSource, ScalingEngine, Unit,
};
use rusqlite::{Connection, params};
use std::sync::Arc;

/// Write two active recipes that use each other (a -> b -> a) directly
/// into the database
fn corrupt_with_cycle(db_path: &str) {
    let conn = Connection::open(db_path).unwrap();
    let now = "2026-01-01T00:00:00Z";
    for (recipe_id, product, child) in [("ra", "a", "b"), ("rb", "b", "a")] {
        conn.execute(
            "INSERT INTO products (id, name, product_type, unit) VALUES (?1, ?2, 'semi_product', 'gram')",
            params![product, product.to_uppercase()],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO recipes (id, product_id, name, version, status, yield_quantity, yield_unit, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, 'active', 100.0, 'gram', ?4, ?4)",
            params![recipe_id, product, format!("Recipe {product}"), now],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_product_id, quantity, unit, sort_order, is_optional)
             VALUES (?1, ?2, 50.0, 'gram', 0, 0)",
            params![recipe_id, child],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO recipe_dependencies (parent_recipe_id, child_product_id) VALUES (?1, ?2)",
            params![recipe_id, child],
        )
        .unwrap();
    }
}

#[test]
fn test_corrupted_cycle_terminates_with_cycle_state() {
    let (_dir, db_path) = setup_db();
    corrupt_with_cycle(&db_path);
    let store = Arc::new(GraphStore::open(&db_path).unwrap());

    let source: Arc<dyn RecipeSource> = Arc::clone(&store) as Arc<dyn RecipeSource>;
    let engine = ScalingEngine::new(source, Arc::new(NoopCache), EngineLimits::default());
    let result = engine
        .calculate(&CalculationRequest::new("a", 200.0, "gram").hierarchical(10))
        .unwrap();

    assert_eq!(result.ingredients.len(), 2);
    let b = &result.ingredients[0];
    assert_eq!(b.ingredient_product_id, "b");
    assert_eq!(b.expansion, Some(ExpansionState::Expanded));
    assert_eq!(b.calculated_quantity, 100.0);

    let back = &result.ingredients[1];
    assert_eq!(back.ingredient_product_id, "a");
    assert_eq!(back.depth_level, 2);
    assert!(matches!(
        &back.expansion,
        Some(ExpansionState::CycleAborted { path }) if path == &vec!["a", "b", "a"]
    ));
    assert!(result.calculation_metadata.truncated);
}

#[test]
fn test_corrupted_cycle_is_reported_by_validation() {
    let (_dir, db_path) = setup_db();
    corrupt_with_cycle(&db_path);
    let store = GraphStore::open(&db_path).unwrap();

    let report = store.validate_recipe("ra").unwrap();
    assert!(!report.is_valid);
    assert!(report.errors.iter().any(|e| e.contains("Circular dependency")));

    // The store hierarchy terminates as well
    let rows = store.hierarchy("ra", 10).unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_resolver_stops_at_ceiling_on_long_chain() {
    let (_dir, db_path) = setup_db();
    let store = Arc::new(
        GraphStore::open(&db_path)
            .unwrap()
            .with_limits(100, ABSOLUTE_DEPTH_CEILING),
    );

    let chain_len = ABSOLUTE_DEPTH_CEILING as usize + 6;
    for i in 0..=chain_len {
        add_product(&store, &format!("p{i}"), ProductType::SemiProduct, Unit::Gram);
    }
    for i in 0..chain_len {
        store
            .upsert_recipe(
                &RecipeDraft::new(&format!("p{i}"), &format!("Step {i}"), 1.0, Unit::Gram)
                    .with_id(&format!("r{i}"))
                    .active()
                    .ingredient(&format!("p{}", i + 1), 1.0, Unit::Gram),
                store.as_ref(),
            )
            .unwrap();
    }

    let resolver = HierarchyResolver::new(
        Arc::clone(&store) as Arc<dyn RecipeSource>,
        ABSOLUTE_DEPTH_CEILING,
        10_000,
    );
    let expansion = resolver.expand("r0", u32::MAX).unwrap();
    assert_eq!(expansion.entries.len(), ABSOLUTE_DEPTH_CEILING as usize);
    assert_eq!(expansion.depth_reached, ABSOLUTE_DEPTH_CEILING);
    assert!(expansion.truncated);
    assert_eq!(
        expansion.entries.last().map(|e| &e.state),
        Some(&ExpansionState::DepthExceeded)
    );

    let rows = store.hierarchy("r0", ABSOLUTE_DEPTH_CEILING).unwrap();
    assert_eq!(rows.len(), ABSOLUTE_DEPTH_CEILING as usize);
    assert!(matches!(
        store.hierarchy("r0", ABSOLUTE_DEPTH_CEILING + 1),
        Err(Error::MaxDepthExceeded(_))
    ));
}

#[test]
fn test_store_hierarchy_rows() {
    let (_dir, db_path) = setup_db();
    let store = GraphStore::open(&db_path).unwrap();
    let bakery = seed_bakery(&store);

    let rows = store.hierarchy(&bakery.bread, 5).unwrap();
    let ids: Vec<&str> = rows
        .iter()
        .map(|r| r.ingredient_product_id.as_str())
        .collect();
    assert_eq!(ids, vec!["dough", "flour", "water", "salt", "yeast", "seeds"]);

    // Unit scale: one batch of bread (2 loaves) needs 0.9 dough batches
    let flour = &rows[1];
    assert_eq!(flour.depth_level, 2);
    assert!((flour.quantity - 540.0).abs() < 1e-9);
    assert_eq!(flour.path, vec!["bread", "dough", "flour"]);

    assert!(matches!(store.hierarchy(&bakery.bread, 0), Err(Error::InvalidInput(_))));
    assert!(matches!(store.hierarchy(&bakery.bread, 11), Err(Error::MaxDepthExceeded(10))));
    assert!(matches!(store.hierarchy("missing", 3), Err(Error::RecipeNotFound(_))));

    let complexity = store.complexity(&bakery.bread).unwrap();
    assert_eq!(complexity.ingredient_count, 2);
    assert_eq!(complexity.optional_ingredients, 1);
    assert_eq!(complexity.hierarchy_depth, 2);
    assert_eq!(complexity.total_ingredients_expanded, 6);
}
