// src/commands/product.rs

//! Product registry commands

use super::Context;
use anyhow::{Result, anyhow};
use recipe_scaler::Unit;
use recipe_scaler::db::models::{Product, ProductType};

/// Register or update a product
pub fn cmd_product_add(
    ctx: &Context,
    id: &str,
    name: &str,
    product_type: &str,
    unit: &str,
) -> Result<()> {
    let product_type: ProductType = product_type.parse().map_err(|e: String| anyhow!(e))?;
    let unit: Unit = unit.parse()?;

    let store = ctx.store()?;
    store.upsert_product(&Product::new(id, name, product_type, unit))?;
    println!("Product '{}' ({}, {})", id, product_type.as_str(), unit);
    Ok(())
}

pub fn cmd_product_list(ctx: &Context) -> Result<()> {
    let store = ctx.store()?;
    let products = store.products()?;

    if products.is_empty() {
        println!("No products registered.");
        println!("\nUse 'recipe-scaler product add <id> <name>' to add one.");
        return Ok(());
    }

    println!("Products ({}):", products.len());
    for product in &products {
        println!(
            "  {:<24} {:<32} {:<13} {}",
            product.id,
            product.name,
            product.product_type.as_str(),
            product.unit
        );
    }
    Ok(())
}
