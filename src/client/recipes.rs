// src/client/recipes.rs

//! Recipe lookup against a remote graph owner

use super::{JsonClient, RetryPolicy};
use crate::error::Result;
use crate::source::{RecipeSource, RecipeView};
use std::time::Duration;

/// [`RecipeSource`] backed by the recipe service HTTP API
///
/// Endpoints:
/// - `GET {base}/api/v1/recipes/product/{product_id}` - active recipe of a product
/// - `GET {base}/api/v1/recipes/{recipe_id}`
///
/// Both return a [`RecipeView`] as JSON, or 404.
pub struct HttpRecipeSource {
    http: JsonClient,
}

impl HttpRecipeSource {
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            http: JsonClient::new(base_url, timeout, retry)?,
        })
    }
}

impl RecipeSource for HttpRecipeSource {
    fn active_recipe_for_product(&self, product_id: &str) -> Result<Option<RecipeView>> {
        self.http
            .get_json(&["api", "v1", "recipes", "product", product_id])
    }

    fn recipe_by_id(&self, recipe_id: &str) -> Result<Option<RecipeView>> {
        self.http.get_json(&["api", "v1", "recipes", recipe_id])
    }
}
