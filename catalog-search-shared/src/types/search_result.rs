//! Search result types.
//!
//! This module defines the lightweight read record returned by product searches.

use serde::{Deserialize, Serialize};

use crate::types::indexed_product::IndexedProduct;
use crate::types::product_event::ProductId;

/// A single product returned by a search.
///
/// Serialized with camelCase keys:
/// `{"id":1,"name":"...","price":1.0,"description":null,"categoryName":null}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchProductRecord {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub category_name: Option<String>,
}

impl From<IndexedProduct> for SearchProductRecord {
    fn from(doc: IndexedProduct) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            price: doc.price,
            description: doc.description,
            category_name: doc.category_name,
        }
    }
}
