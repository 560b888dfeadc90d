// src/config.rs

//! Configuration file handling
//!
//! Example `recipe-scaler.toml`:
//!
//! ```toml
//! [database]
//! path = "/var/lib/recipe-scaler/recipes.db"
//!
//! [limits]
//! min_scale = 0.001
//! max_scale = 1000.0
//! max_recipe_depth = 10
//!
//! [cache]
//! enabled = true
//! ttl_secs = 1800
//!
//! # Optional remote graph owner and product catalog
//! [upstream]
//! recipe_service_url = "http://recipes.internal:8080"
//! product_service_url = "http://products.internal:8080"
//! timeout_ms = 5000
//! max_retries = 3
//! ```
//!
//! Every key is optional; missing keys take the defaults below.

use crate::cache::{MemoryResultCache, NoopCache, ResultCache};
use crate::client::RetryPolicy;
use crate::error::{Error, Result};
use crate::hierarchy::ABSOLUTE_DEPTH_CEILING;
use crate::scaling::EngineLimits;
use crate::units::{DEFAULT_PRECISION, MAX_PRECISION};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalerConfig {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub upstream: UpstreamSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// SQLite database file (default: recipe-scaler.db)
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsSection {
    /// Smallest accepted scale factor (default: 0.001)
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,

    /// Largest accepted scale factor (default: 1000)
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,

    /// Ingredient lines per calculation, after expansion (default: 1000)
    #[serde(default = "default_max_ingredients")]
    pub max_ingredients: usize,

    /// Ingredient lines per stored recipe (default: 100)
    #[serde(default = "default_max_ingredients_per_recipe")]
    pub max_ingredients_per_recipe: usize,

    /// Largest hierarchy depth a caller may request (default: 10)
    #[serde(default = "default_max_recipe_depth")]
    pub max_recipe_depth: u32,

    /// Decimal places for continuous units when a request gives none (default: 3)
    #[serde(default = "default_precision")]
    pub default_precision: u32,

    /// Requests per batch (default: 100)
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSection {
    /// Cache calculation results (default: true)
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Time-to-live of a cached result in seconds (default: 1800)
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Maximum number of cached results (default: 10000)
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamSection {
    /// Remote recipe service; the local database is used when unset
    #[serde(default)]
    pub recipe_service_url: Option<String>,

    /// Remote product service; the local product table is used when unset
    #[serde(default)]
    pub product_service_url: Option<String>,

    /// Per-request timeout in milliseconds (default: 5000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay in milliseconds, doubled per retry (default: 100)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Cap on a single retry delay in milliseconds (default: 2000)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Random extra delay as a fraction of the delay (default: 0.25)
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f32,
}

fn default_db_path() -> String {
    "recipe-scaler.db".to_string()
}

fn default_min_scale() -> f64 {
    0.001
}

fn default_max_scale() -> f64 {
    1000.0
}

fn default_max_ingredients() -> usize {
    1000
}

fn default_max_ingredients_per_recipe() -> usize {
    100
}

fn default_max_recipe_depth() -> u32 {
    10
}

fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

fn default_max_batch_size() -> usize {
    100
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    1800
}

fn default_cache_capacity() -> usize {
    10_000
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    2000
}

fn default_jitter_factor() -> f32 {
    0.25
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            max_ingredients: default_max_ingredients(),
            max_ingredients_per_recipe: default_max_ingredients_per_recipe(),
            max_recipe_depth: default_max_recipe_depth(),
            default_precision: default_precision(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl(),
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            recipe_service_url: None,
            product_service_url: None,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl ScalerConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let config = Self::parse(&content)
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: ScalerConfig = toml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        if !(limits.min_scale.is_finite() && limits.min_scale > 0.0) {
            return Err(Error::ConfigError(format!(
                "limits.min_scale must be positive, got {}",
                limits.min_scale
            )));
        }
        if !(limits.max_scale.is_finite() && limits.max_scale >= limits.min_scale) {
            return Err(Error::ConfigError(format!(
                "limits.max_scale must be >= limits.min_scale, got {}",
                limits.max_scale
            )));
        }
        if limits.max_recipe_depth == 0 || limits.max_recipe_depth > ABSOLUTE_DEPTH_CEILING {
            return Err(Error::ConfigError(format!(
                "limits.max_recipe_depth must be between 1 and {ABSOLUTE_DEPTH_CEILING}, got {}",
                limits.max_recipe_depth
            )));
        }
        if limits.default_precision > MAX_PRECISION {
            return Err(Error::ConfigError(format!(
                "limits.default_precision must be <= {MAX_PRECISION}, got {}",
                limits.default_precision
            )));
        }
        if limits.max_ingredients == 0
            || limits.max_ingredients_per_recipe == 0
            || limits.max_batch_size == 0
        {
            return Err(Error::ConfigError(
                "limits.max_ingredients, limits.max_ingredients_per_recipe and limits.max_batch_size must be positive".into(),
            ));
        }

        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(Error::ConfigError(
                "cache.capacity must be positive when the cache is enabled".into(),
            ));
        }

        let upstream = &self.upstream;
        if upstream.timeout_ms == 0 {
            return Err(Error::ConfigError("upstream.timeout_ms must be positive".into()));
        }
        if !(0.0..=1.0).contains(&upstream.jitter_factor) {
            return Err(Error::ConfigError(format!(
                "upstream.jitter_factor must be between 0.0 and 1.0, got {}",
                upstream.jitter_factor
            )));
        }
        for url in [&upstream.recipe_service_url, &upstream.product_service_url]
            .into_iter()
            .flatten()
        {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::ConfigError(format!(
                    "Upstream URL must start with http:// or https://, got '{url}'"
                )));
            }
        }

        Ok(())
    }

    pub fn engine_limits(&self) -> EngineLimits {
        EngineLimits {
            min_scale: self.limits.min_scale,
            max_scale: self.limits.max_scale,
            max_ingredients: self.limits.max_ingredients,
            max_depth: self.limits.max_recipe_depth,
            default_precision: self.limits.default_precision,
            max_batch_size: self.limits.max_batch_size,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.upstream.max_retries,
            base_delay: Duration::from_millis(self.upstream.base_delay_ms),
            max_delay: Duration::from_millis(self.upstream.max_delay_ms),
            jitter_factor: self.upstream.jitter_factor,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// The result cache described by the `[cache]` section
    pub fn build_cache(&self) -> Arc<dyn ResultCache> {
        if self.cache.enabled {
            Arc::new(MemoryResultCache::new(self.cache.capacity))
        } else {
            Arc::new(NoopCache)
        }
    }
}
