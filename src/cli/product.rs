// src/cli/product.rs
//! Product registry commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum ProductCommands {
    /// Register or update a product
    Add {
        /// Product id
        id: String,

        /// Display name
        name: String,

        /// Product type: raw, semi_product or finished
        #[arg(short = 't', long, default_value = "raw")]
        product_type: String,

        /// Base unit of the product
        #[arg(short, long, default_value = "gram")]
        unit: String,
    },

    /// List registered products
    List,
}
