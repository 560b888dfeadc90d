// src/commands/calculate.rs

//! Scaling and hierarchy commands

use super::{Context, print_json, read_input};
use anyhow::{Context as _, Result};
use recipe_scaler::CalculationRequest;
use std::time::{Duration, Instant};
use tracing::info;

/// Print the expanded ingredient tree of a recipe at unit scale
pub fn cmd_hierarchy(ctx: &Context, recipe_id: &str, max_depth: u32) -> Result<()> {
    let store = ctx.store()?;
    let rows = store.hierarchy(recipe_id, max_depth)?;

    println!("Hierarchy of {} ({} rows):", recipe_id, rows.len());
    for row in &rows {
        let indent = "  ".repeat(row.depth_level as usize);
        println!(
            "{}{} {} {}",
            indent,
            row.quantity,
            row.unit,
            row.ingredient_name.as_deref().unwrap_or(&row.ingredient_product_id)
        );
    }
    Ok(())
}

/// Scale one product and print the result as JSON
pub fn cmd_calculate(
    ctx: &Context,
    product_id: &str,
    quantity: f64,
    unit: &str,
    hierarchy: bool,
    max_depth: u32,
    precision: Option<u32>,
) -> Result<()> {
    let mut request = CalculationRequest::new(product_id, quantity, unit);
    if hierarchy {
        request = request.hierarchical(max_depth);
    }
    request.precision = precision;

    let store = ctx.store()?;
    let engine = ctx.engine(&store)?;
    let result = engine.calculate(&request)?;
    print_json(&result)
}

/// Run a JSON array of requests and print the batch result
pub fn cmd_batch(ctx: &Context, file: &str, timeout_secs: Option<u64>) -> Result<()> {
    let content = read_input(file)?;
    let requests: Vec<CalculationRequest> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid batch request file {}", file))?;
    let deadline = timeout_secs.map(|secs| Instant::now() + Duration::from_secs(secs));

    let store = ctx.store()?;
    let engine = ctx.engine(&store)?;
    let batch = engine.calculate_batch(&requests, deadline)?;

    info!(
        "Batch finished: {} successful, {} failed, {} skipped",
        batch.summary.successful, batch.summary.failed, batch.summary.skipped
    );
    print_json(&batch)
}
