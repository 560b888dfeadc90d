// src/commands/recipe.rs

//! Recipe lifecycle commands

use super::{Context, print_json, read_input};
use anyhow::{Context as _, Result, anyhow};
use recipe_scaler::RecipeDraft;
use recipe_scaler::db::models::RecipeStatus;
use tracing::info;

/// Create or replace a recipe from a JSON draft
pub fn cmd_recipe_import(ctx: &Context, file: &str) -> Result<()> {
    let content = read_input(file)?;
    let draft: RecipeDraft = serde_json::from_str(&content)
        .with_context(|| format!("Invalid recipe draft in {}", file))?;

    let store = ctx.store()?;
    let catalog = ctx.catalog(&store)?;
    let recipe = store.upsert_recipe(&draft, catalog.as_ref())?;

    info!("Imported recipe {} for product {}", recipe.id, recipe.product_id);
    println!(
        "Recipe {} '{}' for {} (version {}, {})",
        recipe.id, recipe.name, recipe.product_id, recipe.version, recipe.status
    );
    Ok(())
}

/// Change the status of a recipe (activate, archive)
pub fn cmd_recipe_set_status(ctx: &Context, recipe_id: &str, status: RecipeStatus) -> Result<()> {
    let store = ctx.store()?;
    let recipe = store.set_status(recipe_id, status)?;
    println!("Recipe {} is now {}", recipe.id, recipe.status);
    Ok(())
}

pub fn cmd_recipe_validate(ctx: &Context, recipe_id: &str) -> Result<()> {
    let store = ctx.store()?;
    let report = store.validate_recipe(recipe_id)?;

    if report.is_valid {
        println!("Recipe {} is valid", recipe_id);
        return Ok(());
    }

    println!("Recipe {} has {} problem(s):", recipe_id, report.errors.len());
    for error in &report.errors {
        println!("  - {}", error);
    }
    Err(anyhow!("Recipe {} failed validation", recipe_id))
}

pub fn cmd_recipe_show(ctx: &Context, recipe_id: &str, json: bool) -> Result<()> {
    let store = ctx.store()?;
    let detail = store
        .recipe_by_id(recipe_id)?
        .ok_or_else(|| anyhow!("Recipe '{}' not found", recipe_id))?;

    if json {
        return print_json(&detail);
    }

    let recipe = &detail.recipe;
    println!("Recipe: {} ({})", recipe.name, recipe.id);
    println!("  Product: {}", recipe.product_id);
    println!("  Status: {}", recipe.status);
    println!("  Version: {}", recipe.version);
    println!("  Yield: {} {}", recipe.yield_quantity, recipe.yield_unit);
    if let Some(description) = &recipe.description {
        println!("  Description: {}", description);
    }
    println!("  Ingredients ({}):", detail.ingredients.len());
    for ingredient in &detail.ingredients {
        print!(
            "    {:>3}. {} {} {}",
            ingredient.sort_order,
            ingredient.quantity,
            ingredient.unit,
            ingredient.ingredient_product_id
        );
        if let Some(group) = &ingredient.ingredient_group {
            print!(" [{}]", group);
        }
        if ingredient.is_optional {
            print!(" (optional)");
        }
        println!();
    }
    Ok(())
}

pub fn cmd_recipe_list(ctx: &Context, status: Option<&str>) -> Result<()> {
    let status = status
        .map(|s| s.parse::<RecipeStatus>().map_err(|e| anyhow!(e)))
        .transpose()?;

    let store = ctx.store()?;
    let recipes = store.list_recipes(status)?;
    if recipes.is_empty() {
        println!("No recipes found.");
        return Ok(());
    }

    println!("Recipes ({}):", recipes.len());
    for recipe in &recipes {
        println!(
            "  {}  {:<24} v{:<3} {:<10} {}",
            recipe.id, recipe.product_id, recipe.version, recipe.status, recipe.name
        );
    }
    Ok(())
}

pub fn cmd_recipe_versions(ctx: &Context, recipe_id: &str) -> Result<()> {
    let store = ctx.store()?;
    let versions = store.versions(recipe_id)?;
    if versions.is_empty() {
        println!("No version history for recipe {}", recipe_id);
        return Ok(());
    }

    println!("Versions of {} ({}):", recipe_id, versions.len());
    for version in &versions {
        println!(
            "  v{:<4} {}  {}",
            version.version_number,
            version.created_at,
            version.change_summary.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub fn cmd_recipe_complexity(ctx: &Context, recipe_id: &str) -> Result<()> {
    let store = ctx.store()?;
    let report = store.complexity(recipe_id)?;

    println!("Complexity of {}:", recipe_id);
    println!(
        "  Ingredients: {} ({} required, {} optional, {} groups)",
        report.ingredient_count,
        report.required_ingredients,
        report.optional_ingredients,
        report.ingredient_groups
    );
    println!("  Hierarchy depth: {}", report.hierarchy_depth);
    println!("  Expanded ingredients: {}", report.total_ingredients_expanded);
    println!(
        "  Score: {} ({})",
        report.complexity_score,
        report.complexity_level.as_str()
    );
    Ok(())
}

pub fn cmd_recipe_used_by(ctx: &Context, product_id: &str) -> Result<()> {
    let store = ctx.store()?;
    let recipes = store.recipes_using_product(product_id)?;
    if recipes.is_empty() {
        println!("No recipe uses {}", product_id);
        return Ok(());
    }

    println!("Recipes using {}:", product_id);
    for recipe in &recipes {
        println!("  {} {} ({})", recipe.id, recipe.name, recipe.status);
    }
    Ok(())
}

pub fn cmd_recipe_delete(ctx: &Context, recipe_id: &str) -> Result<()> {
    let store = ctx.store()?;
    store.delete_recipe(recipe_id)?;
    println!("Deleted recipe {}", recipe_id);
    Ok(())
}
