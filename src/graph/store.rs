// src/graph/store.rs

//! SQLite-backed owner of the product/recipe graph
//!
//! Every structural mutation runs in a single `BEGIN IMMEDIATE` transaction:
//! rows are written, derived dependency rows rebuilt, and the cycle check
//! runs against the adjacency as it would be committed. Any failure rolls the
//! whole mutation back, so callers never observe a partial state.

use super::cycle::find_cycle_path;
use super::{
    ComplexityLevel, ComplexityReport, HierarchyRow, IngredientDraft, RecipeDetail, RecipeDraft,
    ValidationReport,
};
use crate::catalog::{ProductCatalog, ProductInfo};
use crate::db::{self, models::*};
use crate::error::{Error, Result};
use crate::hierarchy::{self, ABSOLUTE_DEPTH_CEILING};
use crate::source::{IngredientLine, RecipeSource, RecipeView};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Default upper bound on ingredient lines per recipe
pub const DEFAULT_MAX_INGREDIENTS_PER_RECIPE: usize = 100;

/// Default upper bound for [`GraphStore::hierarchy`] depth
pub const DEFAULT_MAX_RECIPE_DEPTH: u32 = 10;

/// Entry cap for internal expansions (complexity metrics)
const INTERNAL_EXPANSION_LIMIT: usize = 100_000;

pub struct GraphStore {
    conn: Mutex<Connection>,
    max_ingredients_per_recipe: usize,
    max_recipe_depth: u32,
}

impl GraphStore {
    /// Wrap an already migrated connection
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            max_ingredients_per_recipe: DEFAULT_MAX_INGREDIENTS_PER_RECIPE,
            max_recipe_depth: DEFAULT_MAX_RECIPE_DEPTH,
        }
    }

    /// Open an initialized database file
    pub fn open(db_path: &str) -> Result<Self> {
        Ok(Self::new(db::open(db_path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(db::open_in_memory()?))
    }

    /// Override the per-recipe ingredient limit and the hierarchy depth limit
    ///
    /// The depth limit is clamped to [`ABSOLUTE_DEPTH_CEILING`].
    pub fn with_limits(mut self, max_ingredients_per_recipe: usize, max_recipe_depth: u32) -> Self {
        self.max_ingredients_per_recipe = max_ingredients_per_recipe;
        self.max_recipe_depth = max_recipe_depth.min(ABSOLUTE_DEPTH_CEILING);
        self
    }

    pub fn max_recipe_depth(&self) -> u32 {
        self.max_recipe_depth
    }

    // --- products ---

    pub fn upsert_product(&self, product: &Product) -> Result<()> {
        if product.id.trim().is_empty() {
            return Err(Error::Validation("Product id must not be empty".into()));
        }
        if product.name.trim().is_empty() {
            return Err(Error::Validation("Product name must not be empty".into()));
        }
        let conn = self.conn.lock();
        product.upsert(&conn)?;
        debug!("Upserted product {}", product.id);
        Ok(())
    }

    pub fn product(&self, id: &str) -> Result<Option<Product>> {
        let conn = self.conn.lock();
        Product::find_by_id(&conn, id)
    }

    pub fn products(&self) -> Result<Vec<Product>> {
        let conn = self.conn.lock();
        Product::list_all(&conn)
    }

    // --- recipe mutations ---

    /// Create or replace a recipe and its whole ingredient set
    ///
    /// Validation order: self-reference, size, field checks, product
    /// existence through `catalog`, then (inside the transaction) the cycle
    /// check. `catalog` is consulted before the store is locked, so the store
    /// itself may be passed as the catalog.
    pub fn upsert_recipe(
        &self,
        draft: &RecipeDraft,
        catalog: &dyn ProductCatalog,
    ) -> Result<Recipe> {
        validate_draft(draft, self.max_ingredients_per_recipe)?;

        let missing = catalog.missing(&draft.referenced_products())?;
        if let Some(first) = missing.into_iter().next() {
            return Err(Error::ProductNotFound(first));
        }

        let mut conn = self.conn.lock();
        let recipe = db::transaction_immediate(&mut conn, |tx| {
            let existing = match &draft.id {
                Some(id) => Recipe::find_by_id(tx, id)?,
                None => None,
            };

            let recipe = match existing {
                Some(current) => update_recipe(tx, current, draft)?,
                None => create_recipe(tx, draft)?,
            };

            let children: Vec<&str> = draft
                .ingredients
                .iter()
                .map(|i| i.product_id.as_str())
                .collect();
            DependencyEdge::rebuild_for_recipe(tx, &recipe.id, &children)?;

            if recipe.status.is_active() {
                check_acyclic(tx, &recipe.product_id, &children)?;
            }
            Ok(recipe)
        })?;

        info!(
            "Saved recipe {} for product {} (version {}, {})",
            recipe.id, recipe.product_id, recipe.version, recipe.status
        );
        Ok(recipe)
    }

    /// Change a recipe's status
    ///
    /// Activation archives the product's previously active recipe and re-runs
    /// the cycle check; leaving the active state never needs one.
    pub fn set_status(&self, recipe_id: &str, status: RecipeStatus) -> Result<Recipe> {
        let mut conn = self.conn.lock();
        let recipe = db::transaction_immediate(&mut conn, |tx| {
            let mut recipe = Recipe::find_by_id(tx, recipe_id)?
                .ok_or_else(|| Error::RecipeNotFound(recipe_id.to_string()))?;
            if recipe.status == status {
                return Ok(recipe);
            }

            if status.is_active() {
                let ingredients = RecipeIngredient::find_by_recipe(tx, recipe_id)?;
                check_activatable(&ingredients)?;

                let archived =
                    Recipe::archive_active_for_product(tx, &recipe.product_id, recipe_id)?;
                if archived > 0 {
                    debug!(
                        "Archived {} previously active recipe(s) of {}",
                        archived, recipe.product_id
                    );
                }
                Recipe::set_status(tx, recipe_id, status)?;

                let children: Vec<&str> = ingredients
                    .iter()
                    .map(|i| i.ingredient_product_id.as_str())
                    .collect();
                check_acyclic(tx, &recipe.product_id, &children)?;
            } else {
                Recipe::set_status(tx, recipe_id, status)?;
            }

            recipe.status = status;
            Ok(recipe)
        })?;

        info!("Recipe {} is now {}", recipe.id, recipe.status);
        Ok(recipe)
    }

    /// Delete a recipe with its ingredients, dependency rows and versions
    pub fn delete_recipe(&self, recipe_id: &str) -> Result<()> {
        let mut conn = self.conn.lock();
        db::transaction_immediate(&mut conn, |tx| {
            if Recipe::delete(tx, recipe_id)? == 0 {
                return Err(Error::RecipeNotFound(recipe_id.to_string()));
            }
            Ok(())
        })?;
        info!("Deleted recipe {}", recipe_id);
        Ok(())
    }

    // --- queries ---

    pub fn recipe_by_id(&self, recipe_id: &str) -> Result<Option<RecipeDetail>> {
        let conn = self.conn.lock();
        match Recipe::find_by_id(&conn, recipe_id)? {
            Some(recipe) => Ok(Some(load_detail(&conn, recipe)?)),
            None => Ok(None),
        }
    }

    pub fn active_recipe_for_product(&self, product_id: &str) -> Result<Option<RecipeDetail>> {
        let conn = self.conn.lock();
        match Recipe::find_active_by_product(&conn, product_id)? {
            Some(recipe) => Ok(Some(load_detail(&conn, recipe)?)),
            None => Ok(None),
        }
    }

    pub fn list_recipes(&self, status: Option<RecipeStatus>) -> Result<Vec<Recipe>> {
        let conn = self.conn.lock();
        Recipe::list(&conn, status)
    }

    /// Derived dependency rows of a recipe
    pub fn dependencies(&self, recipe_id: &str) -> Result<Vec<DependencyEdge>> {
        let conn = self.conn.lock();
        DependencyEdge::find_by_parent(&conn, recipe_id)
    }

    /// Recipes (of any status) that list `product_id` as an ingredient
    pub fn recipes_using_product(&self, product_id: &str) -> Result<Vec<Recipe>> {
        let conn = self.conn.lock();
        let mut recipes = Vec::new();
        for id in RecipeIngredient::find_recipes_using(&conn, product_id)? {
            if let Some(recipe) = Recipe::find_by_id(&conn, &id)? {
                recipes.push(recipe);
            }
        }
        Ok(recipes)
    }

    pub fn versions(&self, recipe_id: &str) -> Result<Vec<RecipeVersion>> {
        let conn = self.conn.lock();
        RecipeVersion::find_by_recipe(&conn, recipe_id)
    }

    /// Flattened hierarchy of a recipe at unit scale
    pub fn hierarchy(&self, recipe_id: &str, max_depth: u32) -> Result<Vec<HierarchyRow>> {
        if max_depth == 0 {
            return Err(Error::InvalidInput("max_depth must be at least 1".into()));
        }
        if max_depth > self.max_recipe_depth {
            return Err(Error::MaxDepthExceeded(self.max_recipe_depth));
        }

        let view = self
            .view_by_id(recipe_id)?
            .ok_or_else(|| Error::RecipeNotFound(recipe_id.to_string()))?;
        let expansion = hierarchy::walk(self, &view, 1.0, max_depth, INTERNAL_EXPANSION_LIMIT)?;

        Ok(expansion
            .entries
            .into_iter()
            .map(|entry| HierarchyRow {
                ingredient_product_id: entry.ingredient_product_id,
                ingredient_name: entry.ingredient_name,
                quantity: entry.absolute_quantity,
                unit: entry.unit,
                depth_level: entry.depth_level,
                path: entry.path,
            })
            .collect())
    }

    /// Re-check the business rules of a stored recipe
    pub fn validate_recipe(&self, recipe_id: &str) -> Result<ValidationReport> {
        let conn = self.conn.lock();
        let recipe = Recipe::find_by_id(&conn, recipe_id)?
            .ok_or_else(|| Error::RecipeNotFound(recipe_id.to_string()))?;
        let ingredients = RecipeIngredient::find_by_recipe(&conn, recipe_id)?;

        let mut errors = Vec::new();
        if ingredients.is_empty() {
            errors.push("Recipe must have at least one ingredient".to_string());
        } else if ingredients.iter().all(|i| i.is_optional) {
            errors.push("Recipe must have at least one required ingredient".to_string());
        }
        if !(recipe.yield_quantity.is_finite() && recipe.yield_quantity > 0.0) {
            errors.push(format!("Yield quantity {} must be positive", recipe.yield_quantity));
        }

        let children: Vec<&str> = ingredients
            .iter()
            .map(|i| i.ingredient_product_id.as_str())
            .collect();
        let adjacency = DependencyEdge::active_adjacency(&conn)?;
        if let Some(path) = find_cycle_path(&adjacency, &recipe.product_id, &children) {
            errors.push(format!("Circular dependency detected: {}", path.join(" -> ")));
        }

        Ok(ValidationReport {
            recipe_id: recipe.id,
            is_valid: errors.is_empty(),
            errors,
        })
    }

    /// Complexity metrics, expanding through the store's depth limit
    pub fn complexity(&self, recipe_id: &str) -> Result<ComplexityReport> {
        let view = self
            .view_by_id(recipe_id)?
            .ok_or_else(|| Error::RecipeNotFound(recipe_id.to_string()))?;
        let expansion = hierarchy::walk(
            self,
            &view,
            1.0,
            self.max_recipe_depth,
            INTERNAL_EXPANSION_LIMIT,
        )?;

        let ingredient_count = view.ingredients.len();
        let optional_ingredients = view.ingredients.iter().filter(|i| i.is_optional).count();
        let ingredient_groups = view
            .ingredients
            .iter()
            .filter_map(|i| i.group.as_deref())
            .collect::<HashSet<_>>()
            .len();
        let hierarchy_depth = expansion.depth_reached.max(1);
        let complexity_score =
            ComplexityReport::score(ingredient_count, hierarchy_depth, ingredient_groups);

        Ok(ComplexityReport {
            recipe_id: view.recipe_id,
            ingredient_count,
            required_ingredients: ingredient_count - optional_ingredients,
            optional_ingredients,
            ingredient_groups,
            hierarchy_depth,
            total_ingredients_expanded: expansion.entries.len(),
            complexity_score,
            complexity_level: ComplexityLevel::from_score(complexity_score),
        })
    }

    fn view_by_id(&self, recipe_id: &str) -> Result<Option<RecipeView>> {
        let conn = self.conn.lock();
        match Recipe::find_by_id(&conn, recipe_id)? {
            Some(recipe) => Ok(Some(load_view(&conn, recipe)?)),
            None => Ok(None),
        }
    }
}

impl RecipeSource for GraphStore {
    fn active_recipe_for_product(&self, product_id: &str) -> Result<Option<RecipeView>> {
        let conn = self.conn.lock();
        match Recipe::find_active_by_product(&conn, product_id)? {
            Some(recipe) => Ok(Some(load_view(&conn, recipe)?)),
            None => Ok(None),
        }
    }

    fn recipe_by_id(&self, recipe_id: &str) -> Result<Option<RecipeView>> {
        self.view_by_id(recipe_id)
    }
}

impl ProductCatalog for GraphStore {
    fn get(&self, id: &str) -> Result<Option<ProductInfo>> {
        Ok(self.product(id)?.map(product_info))
    }

    fn get_batch(&self, ids: &[String]) -> Result<HashMap<String, ProductInfo>> {
        let conn = self.conn.lock();
        let mut found = HashMap::with_capacity(ids.len());
        for id in ids {
            if found.contains_key(id) {
                continue;
            }
            if let Some(product) = Product::find_by_id(&conn, id)? {
                found.insert(id.clone(), product_info(product));
            }
        }
        Ok(found)
    }
}

fn product_info(product: Product) -> ProductInfo {
    ProductInfo {
        id: product.id,
        name: product.name,
        product_type: Some(product.product_type),
        unit: Some(product.unit),
    }
}

/// Checks that need no I/O; the self-reference check comes first
fn validate_draft(draft: &RecipeDraft, max_ingredients: usize) -> Result<()> {
    if draft
        .ingredients
        .iter()
        .any(|i| i.product_id == draft.product_id)
    {
        warn!("Rejected self-referencing recipe for {}", draft.product_id);
        return Err(Error::CircularDependency {
            path: vec![draft.product_id.clone(), draft.product_id.clone()],
        });
    }

    if draft.ingredients.len() > max_ingredients {
        return Err(Error::TooManyIngredients {
            count: draft.ingredients.len(),
            max: max_ingredients,
        });
    }

    if draft.product_id.trim().is_empty() {
        return Err(Error::Validation("Product id must not be empty".into()));
    }
    if draft.name.trim().is_empty() {
        return Err(Error::Validation("Recipe name must not be empty".into()));
    }
    if !(draft.yield_quantity.is_finite() && draft.yield_quantity > 0.0) {
        return Err(Error::Validation(format!(
            "Yield quantity must be positive, got {}",
            draft.yield_quantity
        )));
    }

    let mut seen = HashSet::new();
    for ingredient in &draft.ingredients {
        if !(ingredient.quantity.is_finite() && ingredient.quantity > 0.0) {
            return Err(Error::Validation(format!(
                "Quantity of {} must be positive, got {}",
                ingredient.product_id, ingredient.quantity
            )));
        }
        if !seen.insert(ingredient.product_id.as_str()) {
            return Err(Error::Validation(format!(
                "Ingredient {} is listed more than once",
                ingredient.product_id
            )));
        }
    }

    if draft.status.is_active() {
        if draft.ingredients.is_empty() {
            return Err(Error::Validation(
                "Recipe must have at least one ingredient".into(),
            ));
        }
        if draft.ingredients.iter().all(|i| i.is_optional) {
            return Err(Error::Validation(
                "Recipe must have at least one required ingredient".into(),
            ));
        }
    }

    Ok(())
}

fn check_activatable(ingredients: &[RecipeIngredient]) -> Result<()> {
    if ingredients.is_empty() {
        return Err(Error::Validation(
            "Recipe must have at least one ingredient".into(),
        ));
    }
    if ingredients.iter().all(|i| i.is_optional) {
        return Err(Error::Validation(
            "Recipe must have at least one required ingredient".into(),
        ));
    }
    Ok(())
}

/// Fail with the offending path if any child reaches `product_id` over
/// the active edges visible to `conn`
fn check_acyclic(conn: &Connection, product_id: &str, children: &[&str]) -> Result<()> {
    let adjacency = DependencyEdge::active_adjacency(conn)?;
    if let Some(path) = find_cycle_path(&adjacency, product_id, children) {
        warn!("Rejected recipe change for {}: cycle {}", product_id, path.join(" -> "));
        return Err(Error::CircularDependency { path });
    }
    Ok(())
}

fn create_recipe(conn: &Connection, draft: &RecipeDraft) -> Result<Recipe> {
    let mut recipe = Recipe::new(
        &draft.product_id,
        &draft.name,
        draft.yield_quantity,
        draft.yield_unit,
    );
    if let Some(id) = &draft.id {
        recipe.id = id.clone();
    }
    recipe.description = draft.description.clone();
    recipe.status = draft.status;

    if recipe.status.is_active() {
        Recipe::archive_active_for_product(conn, &recipe.product_id, &recipe.id)?;
    }
    recipe.insert(conn)?;
    let ingredients = insert_ingredients(conn, &recipe.id, &draft.ingredients)?;

    let summary = draft
        .change_summary
        .clone()
        .unwrap_or_else(|| "Initial version".to_string());
    snapshot(conn, &recipe, &ingredients, summary)?;
    Ok(recipe)
}

fn update_recipe(conn: &Connection, mut recipe: Recipe, draft: &RecipeDraft) -> Result<Recipe> {
    if recipe.product_id != draft.product_id {
        return Err(Error::Validation(format!(
            "Recipe {} produces {}; its product cannot change",
            recipe.id, recipe.product_id
        )));
    }

    let current = RecipeIngredient::find_by_recipe(conn, &recipe.id)?;
    let significant = recipe.yield_quantity != draft.yield_quantity
        || recipe.yield_unit != draft.yield_unit
        || ingredients_changed(&current, &draft.ingredients);

    recipe.name = draft.name.clone();
    recipe.description = draft.description.clone();
    recipe.yield_quantity = draft.yield_quantity;
    recipe.yield_unit = draft.yield_unit;
    recipe.status = draft.status;
    recipe.updated_at = now_timestamp();
    if significant {
        recipe.version += 1;
    }

    if recipe.status.is_active() {
        Recipe::archive_active_for_product(conn, &recipe.product_id, &recipe.id)?;
    }
    recipe.update(conn)?;

    RecipeIngredient::delete_by_recipe(conn, &recipe.id)?;
    let ingredients = insert_ingredients(conn, &recipe.id, &draft.ingredients)?;

    if significant {
        let summary = draft
            .change_summary
            .clone()
            .unwrap_or_else(|| format!("Updated to version {}", recipe.version));
        snapshot(conn, &recipe, &ingredients, summary)?;
    }
    Ok(recipe)
}

fn insert_ingredients(
    conn: &Connection,
    recipe_id: &str,
    drafts: &[IngredientDraft],
) -> Result<Vec<RecipeIngredient>> {
    let mut rows = Vec::with_capacity(drafts.len());
    for (position, draft) in drafts.iter().enumerate() {
        let mut row =
            RecipeIngredient::new(recipe_id, &draft.product_id, draft.quantity, draft.unit);
        row.sort_order = draft.sort_order.unwrap_or(position as u32);
        row.ingredient_group = draft.group.clone();
        row.notes = draft.notes.clone();
        row.is_optional = draft.is_optional;
        row.insert(conn)?;
        rows.push(row);
    }
    Ok(rows)
}

/// Whether the ingredient set differs in anything that affects quantities
fn ingredients_changed(current: &[RecipeIngredient], drafts: &[IngredientDraft]) -> bool {
    if current.len() != drafts.len() {
        return true;
    }
    let by_product: HashMap<&str, &RecipeIngredient> = current
        .iter()
        .map(|i| (i.ingredient_product_id.as_str(), i))
        .collect();

    drafts.iter().any(|draft| match by_product.get(draft.product_id.as_str()) {
        Some(existing) => {
            existing.quantity != draft.quantity
                || existing.unit != draft.unit
                || existing.is_optional != draft.is_optional
        }
        None => true,
    })
}

fn snapshot(
    conn: &Connection,
    recipe: &Recipe,
    ingredients: &[RecipeIngredient],
    summary: String,
) -> Result<()> {
    let data = serde_json::json!({
        "recipe": recipe,
        "ingredients": ingredients,
    });
    RecipeVersion::new(&recipe.id, recipe.version, data, Some(summary)).insert(conn)?;
    Ok(())
}

fn load_detail(conn: &Connection, recipe: Recipe) -> Result<RecipeDetail> {
    let ingredients = RecipeIngredient::find_by_recipe(conn, &recipe.id)?;
    Ok(RecipeDetail {
        recipe,
        ingredients,
    })
}

fn load_view(conn: &Connection, recipe: Recipe) -> Result<RecipeView> {
    let output = Product::find_by_id(conn, &recipe.product_id)?;
    let mut ingredients = Vec::new();
    for row in RecipeIngredient::find_by_recipe(conn, &recipe.id)? {
        let name = Product::find_by_id(conn, &row.ingredient_product_id)?.map(|p| p.name);
        ingredients.push(IngredientLine {
            product_id: row.ingredient_product_id,
            product_name: name,
            quantity: row.quantity,
            unit: row.unit,
            is_optional: row.is_optional,
            sort_order: row.sort_order,
            group: row.ingredient_group,
        });
    }

    Ok(RecipeView {
        recipe_id: recipe.id,
        product_id: recipe.product_id,
        product_name: output.as_ref().map(|p| p.name.clone()),
        product_type: output.map(|p| p.product_type),
        version: recipe.version,
        yield_quantity: recipe.yield_quantity,
        yield_unit: recipe.yield_unit,
        ingredients,
    })
}
