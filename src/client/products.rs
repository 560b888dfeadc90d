// src/client/products.rs

//! Product existence and metadata from the product service

use super::{JsonClient, RetryPolicy};
use crate::catalog::{ProductCatalog, ProductInfo};
use crate::error::Result;
use std::time::Duration;

/// [`ProductCatalog`] backed by `GET {base}/api/v1/products/{id}`
pub struct HttpProductCatalog {
    http: JsonClient,
}

impl HttpProductCatalog {
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            http: JsonClient::new(base_url, timeout, retry)?,
        })
    }
}

impl ProductCatalog for HttpProductCatalog {
    fn get(&self, id: &str) -> Result<Option<ProductInfo>> {
        self.http.get_json(&["api", "v1", "products", id])
    }
}
