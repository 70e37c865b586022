//! Sales transaction analytics: parse and clean a `|`-delimited sales file,
//! aggregate it, enrich it from a product catalog and render a text report.

pub mod analytics;
pub mod catalog;
pub mod config;
pub mod enrich;
mod error;
pub mod files;
pub mod records;
pub mod report;

pub use crate::catalog::{Catalog, HttpCatalog, ProductInfo, ProductMapping};
pub use crate::config::Config;
pub use crate::enrich::{
    enrich_sales_data, save_enriched_data, EnrichedTransaction, EnrichmentStats,
};
pub use crate::error::{Error, Result};
pub use crate::records::{
    parse_transactions, validate_and_filter, Filter, FilterSummary, Transaction,
};
pub use crate::report::generate_sales_report;
