// src/commands/mod.rs
//! Command handlers for the recipe-scaler CLI

mod calculate;
mod init;
mod product;
mod recipe;

pub use calculate::{cmd_batch, cmd_calculate, cmd_hierarchy};
pub use init::cmd_init;
pub use product::{cmd_product_add, cmd_product_list};
pub use recipe::{
    cmd_recipe_complexity, cmd_recipe_delete, cmd_recipe_import, cmd_recipe_list,
    cmd_recipe_set_status, cmd_recipe_show, cmd_recipe_used_by, cmd_recipe_validate,
    cmd_recipe_versions,
};

use anyhow::{Context as _, Result, anyhow};
use recipe_scaler::client::{HttpProductCatalog, HttpRecipeSource};
use recipe_scaler::{
    ErrorKind, GraphStore, ProductCatalog, RecipeSource, ScalerConfig, ScalingEngine,
};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};

/// Resolved configuration shared by all commands
pub struct Context {
    pub config: ScalerConfig,
}

impl Context {
    /// Load the config file (if any) and apply command-line overrides
    pub fn load(config_path: Option<&Path>, db_path: Option<String>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => ScalerConfig::load(path)?,
            None => ScalerConfig::default(),
        };
        if let Some(db_path) = db_path {
            config.database.path = db_path;
        }
        debug!("Using database {}", config.database.path);
        Ok(Self { config })
    }

    pub fn db_path(&self) -> &str {
        &self.config.database.path
    }

    /// Open the local graph store with the configured limits
    pub fn store(&self) -> Result<Arc<GraphStore>> {
        let limits = &self.config.limits;
        let store = GraphStore::open(self.db_path())?
            .with_limits(limits.max_ingredients_per_recipe, limits.max_recipe_depth);
        Ok(Arc::new(store))
    }

    /// The product catalog: the product service when configured, the local
    /// product table otherwise
    pub fn catalog(&self, store: &Arc<GraphStore>) -> Result<Arc<dyn ProductCatalog>> {
        match &self.config.upstream.product_service_url {
            Some(url) => Ok(Arc::new(HttpProductCatalog::new(
                url,
                self.config.request_timeout(),
                self.config.retry_policy(),
            )?)),
            None => Ok(Arc::clone(store) as Arc<dyn ProductCatalog>),
        }
    }

    /// Build the scaling engine over the configured recipe source
    pub fn engine(&self, store: &Arc<GraphStore>) -> Result<ScalingEngine> {
        let source: Arc<dyn RecipeSource> = match &self.config.upstream.recipe_service_url {
            Some(url) => Arc::new(HttpRecipeSource::new(
                url,
                self.config.request_timeout(),
                self.config.retry_policy(),
            )?),
            None => Arc::clone(store) as Arc<dyn RecipeSource>,
        };

        Ok(ScalingEngine::new(source, self.config.build_cache(), self.config.engine_limits())
            .with_catalog(self.catalog(store)?)
            .with_cache_ttl(self.config.cache_ttl()))
    }
}

/// Read a file, or stdin when `file` is "-"
pub(crate) fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Turn a failed command into what the user gets to see
///
/// Internal library errors are logged in full and replaced by their public
/// message. Everything else passes through with its context intact.
pub fn public_error(err: anyhow::Error) -> anyhow::Error {
    match err.downcast_ref::<recipe_scaler::Error>() {
        Some(lib) if lib.kind() == ErrorKind::Internal => {
            error!("{:#}", err);
            anyhow!(lib.public_message())
        }
        _ => err,
    }
}
