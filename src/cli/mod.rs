// src/cli/mod.rs
//! CLI definitions for recipe-scaler
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations are in the `commands` module.
//!
//! - `init` - Create the recipe database
//! - `product` - Product registry
//! - `recipe` - Recipe lifecycle (import, activate, archive, inspect)
//! - `hierarchy` - Expanded sub-recipe tree of a recipe
//! - `calculate` / `batch` - Scale recipes to target quantities

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod product;
mod recipe;

pub use product::ProductCommands;
pub use recipe::RecipeCommands;

#[derive(Parser)]
#[command(name = "recipe-scaler")]
#[command(version)]
#[command(
    about = "Scale recipes and expand sub-recipes into absolute ingredient quantities",
    long_about = None
)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database file (overrides [database] path)
    #[arg(short, long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the recipe database
    Init,

    /// Product registry
    #[command(subcommand)]
    Product(ProductCommands),

    /// Recipe management
    #[command(subcommand)]
    Recipe(RecipeCommands),

    /// Show the expanded ingredient tree of a recipe
    Hierarchy {
        /// Recipe id
        recipe_id: String,

        /// Deepest level to expand
        #[arg(long, default_value_t = recipe_scaler::graph::DEFAULT_MAX_RECIPE_DEPTH)]
        max_depth: u32,
    },

    /// Scale the active recipe of a product to a target quantity
    Calculate {
        /// Product to produce
        product_id: String,

        /// Target quantity
        quantity: f64,

        /// Target unit (must match the recipe's yield unit)
        unit: String,

        /// Expand sub-recipes into their own ingredients
        #[arg(long)]
        hierarchy: bool,

        /// Deepest level to expand with --hierarchy
        #[arg(long, default_value_t = recipe_scaler::scaling::DEFAULT_MAX_DEPTH)]
        max_depth: u32,

        /// Decimal places for continuous units
        #[arg(long)]
        precision: Option<u32>,
    },

    /// Run a batch of calculation requests from a JSON file
    ///
    /// The file holds an array of requests:
    /// [{"product_id": "bread", "target_quantity": 10, "target_unit": "piece"}]
    Batch {
        /// JSON file with the requests ("-" for stdin)
        file: String,

        /// Skip requests not started within this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}
