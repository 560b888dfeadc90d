// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, ProductCommands, RecipeCommands};
use commands::Context;
use recipe_scaler::db::models::RecipeStatus;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = Context::load(cli.config.as_deref(), cli.db_path).map_err(commands::public_error)?;

    let result = match command {
        Commands::Init => commands::cmd_init(&ctx),

        Commands::Product(cmd) => match cmd {
            ProductCommands::Add {
                id,
                name,
                product_type,
                unit,
            } => commands::cmd_product_add(&ctx, &id, &name, &product_type, &unit),
            ProductCommands::List => commands::cmd_product_list(&ctx),
        },

        Commands::Recipe(cmd) => match cmd {
            RecipeCommands::Import { file } => commands::cmd_recipe_import(&ctx, &file),
            RecipeCommands::Activate { recipe_id } => {
                commands::cmd_recipe_set_status(&ctx, &recipe_id, RecipeStatus::Active)
            }
            RecipeCommands::Archive { recipe_id } => {
                commands::cmd_recipe_set_status(&ctx, &recipe_id, RecipeStatus::Archived)
            }
            RecipeCommands::Validate { recipe_id } => {
                commands::cmd_recipe_validate(&ctx, &recipe_id)
            }
            RecipeCommands::Show { recipe_id, json } => {
                commands::cmd_recipe_show(&ctx, &recipe_id, json)
            }
            RecipeCommands::List { status } => commands::cmd_recipe_list(&ctx, status.as_deref()),
            RecipeCommands::Versions { recipe_id } => {
                commands::cmd_recipe_versions(&ctx, &recipe_id)
            }
            RecipeCommands::Complexity { recipe_id } => {
                commands::cmd_recipe_complexity(&ctx, &recipe_id)
            }
            RecipeCommands::UsedBy { product_id } => {
                commands::cmd_recipe_used_by(&ctx, &product_id)
            }
            RecipeCommands::Delete { recipe_id } => commands::cmd_recipe_delete(&ctx, &recipe_id),
        },

        Commands::Hierarchy {
            recipe_id,
            max_depth,
        } => commands::cmd_hierarchy(&ctx, &recipe_id, max_depth),

        Commands::Calculate {
            product_id,
            quantity,
            unit,
            hierarchy,
            max_depth,
            precision,
        } => commands::cmd_calculate(
            &ctx,
            &product_id,
            quantity,
            &unit,
            hierarchy,
            max_depth,
            precision,
        ),

        Commands::Batch { file, timeout_secs } => commands::cmd_batch(&ctx, &file, timeout_secs),
    };
    result.map_err(commands::public_error)
}
