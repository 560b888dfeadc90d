// src/commands/init.rs

use super::Context;
use anyhow::Result;
use recipe_scaler::db;
use tracing::info;

/// Create and migrate the database
pub fn cmd_init(ctx: &Context) -> Result<()> {
    db::init(ctx.db_path())?;
    info!("Database ready at {}", ctx.db_path());
    println!("Initialized recipe database at {}", ctx.db_path());
    Ok(())
}
