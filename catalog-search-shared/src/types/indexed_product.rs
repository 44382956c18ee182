//! Indexed product document.
//!
//! This module defines the denormalized document stored in the search index.

use serde::{Deserialize, Serialize};

use crate::types::product_event::{ProductId, ProductSnapshot};

/// Document representation of a product in the search index.
///
/// Every field is taken from the latest applied snapshot. There is no
/// soft-delete flag: a deleted product has no document at all.
///
/// # Fields
///
/// - `id`: Catalog product id, also the document key
/// - `name`: Product name (matched by searches, indexed as keyword)
/// - `price`: Current price
/// - `description`: Optional description text (matched by searches)
/// - `category_name`: Optional category name (indexed as keyword for filtering)
/// - `version`: Catalog version of the snapshot the document was built from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedProduct {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default)]
    pub version: u64,
}

impl IndexedProduct {
    /// Build the document for a product snapshot.
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_search_shared::{IndexedProduct, ProductSnapshot};
    ///
    /// let snapshot = ProductSnapshot {
    ///     product_id: 1,
    ///     name: "Kettle".to_string(),
    ///     description: None,
    ///     price: 19.5,
    ///     category_name: Some("Kitchen".to_string()),
    ///     version: 2,
    /// };
    /// let doc = IndexedProduct::from_snapshot(&snapshot);
    /// assert_eq!(doc.document_id(), "1");
    /// ```
    pub fn from_snapshot(snapshot: &ProductSnapshot) -> Self {
        Self {
            id: snapshot.product_id,
            name: snapshot.name.clone(),
            price: snapshot.price,
            description: snapshot.description.clone(),
            category_name: snapshot.category_name.clone(),
            version: snapshot.version,
        }
    }

    /// The document ID used in the search index.
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }
}

impl From<ProductSnapshot> for IndexedProduct {
    fn from(snapshot: ProductSnapshot) -> Self {
        Self {
            id: snapshot.product_id,
            name: snapshot.name,
            price: snapshot.price,
            description: snapshot.description,
            category_name: snapshot.category_name,
            version: snapshot.version,
        }
    }
}
