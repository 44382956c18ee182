//! Core data structures shared across the catalog search workspace.

pub mod indexed_product;
pub mod product_event;
pub mod search_query;
pub mod search_result;

pub use indexed_product::IndexedProduct;
pub use product_event::{ProductEvent, ProductSnapshot};
