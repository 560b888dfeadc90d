// src/catalog.rs

//! Product metadata lookup
//!
//! The catalog answers two questions: does a product exist (used to validate
//! recipe mutations, where a failure is fatal) and what is it called (used to
//! enrich calculation results, where a failure only logs).

use crate::db::models::ProductType;
use crate::error::Result;
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Product metadata as returned by a catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub product_type: Option<ProductType>,
    #[serde(default)]
    pub unit: Option<Unit>,
}

pub trait ProductCatalog: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<ProductInfo>>;

    /// Look up several products at once; unknown ids are absent from the map
    fn get_batch(&self, ids: &[String]) -> Result<HashMap<String, ProductInfo>> {
        let mut found = HashMap::with_capacity(ids.len());
        for id in ids {
            if found.contains_key(id) {
                continue;
            }
            if let Some(info) = self.get(id)? {
                found.insert(id.clone(), info);
            }
        }
        Ok(found)
    }

    /// The subset of `ids` the catalog does not know, in input order
    fn missing(&self, ids: &[String]) -> Result<Vec<String>> {
        let found = self.get_batch(ids)?;
        let mut missing: Vec<String> = Vec::new();
        for id in ids {
            if !found.contains_key(id) && !missing.contains(id) {
                missing.push(id.clone());
            }
        }
        Ok(missing)
    }
}
