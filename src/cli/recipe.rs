// src/cli/recipe.rs
//! Recipe lifecycle commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum RecipeCommands {
    /// Create or replace a recipe from a JSON file
    ///
    /// The file holds a recipe draft: product_id, name, yield_quantity,
    /// yield_unit, status and the complete ingredient list. An existing
    /// recipe is updated when the draft carries its id.
    Import {
        /// JSON file with the recipe draft ("-" for stdin)
        file: String,
    },

    /// Make a recipe the active recipe of its product
    Activate {
        recipe_id: String,
    },

    /// Archive a recipe
    Archive {
        recipe_id: String,
    },

    /// Re-check a stored recipe
    Validate {
        recipe_id: String,
    },

    /// Show a recipe with its ingredients
    Show {
        recipe_id: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List recipes
    List {
        /// Only recipes with this status (draft, active, archived, deprecated)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show the version history of a recipe
    Versions {
        recipe_id: String,
    },

    /// Show complexity metrics of a recipe
    Complexity {
        recipe_id: String,
    },

    /// Show which recipes use a product as an ingredient
    UsedBy {
        product_id: String,
    },

    /// Delete a recipe and its ingredients
    Delete {
        recipe_id: String,
    },
}
