//! Product domain events.
//!
//! This module defines the wire contract between the catalog (producer) and the
//! search indexer (consumer). Events are JSON objects tagged by `type`:
//!
//! ```json
//! {"type":"ProductCreated","productId":1,"name":"Kettle","price":19.5,"version":3}
//! ```
//!
//! The schema is append-only. Unknown fields are ignored and every field added
//! after the first release must carry a default, so older consumers keep
//! decoding newer payloads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a product in the catalog.
pub type ProductId = i64;

/// Full state of a product at the time it was committed in the catalog.
///
/// `Created` and `Updated` events both carry a snapshot, never a delta, so the
/// indexer can apply either one with the same upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    /// Monotonic version assigned by the catalog. Missing on the wire means `0`.
    #[serde(default)]
    pub version: u64,
}

/// Identity of a removed product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDeleted {
    pub product_id: ProductId,
    /// `0` means the delete is unconditional.
    #[serde(default)]
    pub version: u64,
}

/// Closed set of product events published by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProductEvent {
    #[serde(rename = "ProductCreated")]
    Created(ProductSnapshot),
    #[serde(rename = "ProductUpdated")]
    Updated(ProductSnapshot),
    #[serde(rename = "ProductDeleted")]
    Deleted(ProductDeleted),
}

/// Reasons an event payload is rejected.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    /// The payload is not a JSON event of a known type.
    #[error("Malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload decoded but violates the contract.
    #[error("Invalid event: {0}")]
    Invalid(String),
}

impl ProductEvent {
    /// Create a `Created` event.
    pub fn created(
        product_id: ProductId,
        name: impl Into<String>,
        description: Option<String>,
        price: f64,
        category_name: Option<String>,
        version: u64,
    ) -> Self {
        Self::Created(ProductSnapshot {
            product_id,
            name: name.into(),
            description,
            price,
            category_name,
            version,
        })
    }

    /// Create an `Updated` event.
    pub fn updated(
        product_id: ProductId,
        name: impl Into<String>,
        description: Option<String>,
        price: f64,
        category_name: Option<String>,
        version: u64,
    ) -> Self {
        Self::Updated(ProductSnapshot {
            product_id,
            name: name.into(),
            description,
            price,
            category_name,
            version,
        })
    }

    /// Create a `Deleted` event.
    pub fn deleted(product_id: ProductId, version: u64) -> Self {
        Self::Deleted(ProductDeleted {
            product_id,
            version,
        })
    }

    /// The product this event is about.
    pub fn product_id(&self) -> ProductId {
        match self {
            Self::Created(snapshot) | Self::Updated(snapshot) => snapshot.product_id,
            Self::Deleted(deleted) => deleted.product_id,
        }
    }

    /// The catalog version carried by the event.
    pub fn version(&self) -> u64 {
        match self {
            Self::Created(snapshot) | Self::Updated(snapshot) => snapshot.version,
            Self::Deleted(deleted) => deleted.version,
        }
    }

    /// The wire name of the event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => "ProductCreated",
            Self::Updated(_) => "ProductUpdated",
            Self::Deleted(_) => "ProductDeleted",
        }
    }

    /// Decode and validate an event from its JSON payload.
    pub fn decode(payload: &[u8]) -> Result<Self, EventDecodeError> {
        let event: Self = serde_json::from_slice(payload)?;
        event.validate()?;
        Ok(event)
    }

    /// Encode the event as JSON.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Check the invariants JSON typing alone does not enforce.
    pub fn validate(&self) -> Result<(), EventDecodeError> {
        match self {
            Self::Created(snapshot) | Self::Updated(snapshot) => {
                if snapshot.name.trim().is_empty() {
                    return Err(EventDecodeError::Invalid(format!(
                        "product {} has an empty name",
                        snapshot.product_id
                    )));
                }
                if !snapshot.price.is_finite() || snapshot.price < 0.0 {
                    return Err(EventDecodeError::Invalid(format!(
                        "product {} has an invalid price {}",
                        snapshot.product_id, snapshot.price
                    )));
                }
                Ok(())
            }
            Self::Deleted(_) => Ok(()),
        }
    }
}
