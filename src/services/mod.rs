pub mod catalog_service;
pub mod tabular;

pub use catalog_service::{CatalogService, ImportSummary, SearchParams, SearchResponse};
