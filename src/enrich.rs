use crate::analytics::percentage;
use crate::catalog::{Catalog, ProductInfo};
use crate::error::Result;
use crate::records::Transaction;
use csv::{QuoteStyle, WriterBuilder};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::io;

/// Sales product ids are offset by 100 from catalog ids: `P101` is catalog
/// product 1.
const PRODUCT_ID_OFFSET: i64 = 100;

const ENRICHED_HEADER: [&str; 12] = [
    "TransactionID",
    "Date",
    "ProductID",
    "ProductName",
    "Quantity",
    "UnitPrice",
    "CustomerID",
    "Region",
    "API_Category",
    "API_Brand",
    "API_Rating",
    "API_Match",
];

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedTransaction {
    pub transaction: Transaction,
    pub product: Option<ProductInfo>,
}

impl EnrichedTransaction {
    pub fn api_match(&self) -> bool {
        self.product.is_some()
    }
}

impl Serialize for EnrichedTransaction {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let tx = &self.transaction;
        let product = self.product.as_ref();
        let category = product.and_then(|p| p.category.as_deref());
        let brand = product.and_then(|p| p.brand.as_deref());
        let mut state = serializer.serialize_struct("EnrichedTransaction", ENRICHED_HEADER.len())?;
        state.serialize_field("TransactionID", &tx.transaction_id)?;
        state.serialize_field("Date", &tx.date)?;
        state.serialize_field("ProductID", &tx.product_id)?;
        state.serialize_field("ProductName", &tx.product_name)?;
        state.serialize_field("Quantity", &tx.quantity)?;
        state.serialize_field("UnitPrice", &tx.unit_price.to_string())?;
        state.serialize_field("CustomerID", &tx.customer_id)?;
        state.serialize_field("Region", &tx.region)?;
        state.serialize_field("API_Category", &category)?;
        state.serialize_field("API_Brand", &brand)?;
        state.serialize_field("API_Rating", &product.and_then(|p| p.rating))?;
        state.serialize_field("API_Match", &self.api_match())?;
        state.end()
    }
}

pub fn catalog_id(product_id: &str) -> Option<u32> {
    let numeric: i64 = product_id.strip_prefix('P')?.parse().ok()?;
    u32::try_from(numeric - PRODUCT_ID_OFFSET)
        .ok()
        .filter(|&id| id > 0)
}

/// Attaches catalog metadata to every transaction. Each distinct catalog id
/// is looked up once; failed lookups count as no match.
pub fn enrich_sales_data(
    transactions: &[Transaction],
    catalog: &dyn Catalog,
) -> Vec<EnrichedTransaction> {
    let mut seen: HashMap<u32, Option<ProductInfo>> = HashMap::new();

    transactions
        .iter()
        .map(|tx| {
            let product = catalog_id(&tx.product_id).and_then(|id| {
                seen.entry(id)
                    .or_insert_with(|| match catalog.product(id) {
                        Ok(product) => product,
                        Err(err) => {
                            warn!("lookup of product {} failed: {}", tx.product_id, err);
                            None
                        }
                    })
                    .clone()
            });
            if product.is_none() {
                debug!("no catalog match for {}", tx.product_id);
            }
            EnrichedTransaction {
                transaction: tx.clone(),
                product,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnrichmentStats {
    pub matched: usize,
    pub total: usize,
}

impl EnrichmentStats {
    pub fn success_rate(&self) -> Decimal {
        percentage(Decimal::from(self.matched), Decimal::from(self.total))
    }
}

impl From<&[EnrichedTransaction]> for EnrichmentStats {
    fn from(enriched: &[EnrichedTransaction]) -> Self {
        EnrichmentStats {
            matched: enriched.iter().filter(|tx| tx.api_match()).count(),
            total: enriched.len(),
        }
    }
}

/// Writes the header even when there are no rows.
pub fn save_enriched_data<T: io::Write>(
    enriched: &[EnrichedTransaction],
    target: T,
) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .from_writer(target);
    writer.write_record(ENRICHED_HEADER)?;
    for tx in enriched {
        writer.serialize(tx)?;
    }
    writer.flush()?;
    Ok(())
}
