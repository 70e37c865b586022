use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeSet;
use std::str::FromStr;

const FIELD_COUNT: usize = 8;
const HEADER_MARKER: &str = "TransactionID";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub date: String,
    pub product_id: String,
    #[serde(deserialize_with = "strip_commas")]
    pub product_name: String,
    #[serde(deserialize_with = "parse_grouped_quantity")]
    pub quantity: i64,
    #[serde(deserialize_with = "parse_grouped_price")]
    pub unit_price: Decimal,
    pub customer_id: String,
    pub region: String,
}

impl Transaction {
    /// `None` when quantity times unit price does not fit in a `Decimal`.
    pub fn checked_amount(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_price)
    }

    /// Saturates at the `Decimal` bounds. Validated records never overflow.
    pub fn amount(&self) -> Decimal {
        Decimal::from(self.quantity).saturating_mul(self.unit_price)
    }

    fn is_valid(&self) -> bool {
        if self.checked_amount().is_none() {
            warn!(
                "amount of transaction {} overflows, will be skipped",
                self.transaction_id
            );
            return false;
        }
        let text_fields = [
            &self.transaction_id,
            &self.date,
            &self.product_id,
            &self.product_name,
            &self.customer_id,
            &self.region,
        ];
        text_fields.iter().all(|f| !f.is_empty())
            && self.quantity > 0
            && self.unit_price > Decimal::ZERO
            && self.transaction_id.starts_with('T')
            && self.product_id.starts_with('P')
            && self.customer_id.starts_with('C')
    }
}

fn strip_commas<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;
    Ok(s.replace(',', ""))
}

fn parse_grouped_quantity<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = strip_commas(deserializer)?;
    s.trim().parse::<i64>().map_err(serde::de::Error::custom)
}

fn parse_grouped_price<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let s = strip_commas(deserializer)?;
    Decimal::from_str(s.trim()).map_err(serde::de::Error::custom)
}

fn is_header(record: &StringRecord) -> bool {
    record
        .get(0)
        .map_or(false, |field| field.eq_ignore_ascii_case(HEADER_MARKER))
}

/// Parses `|`-delimited sales lines. Malformed lines are logged and dropped.
pub fn parse_transactions(text: &str) -> Vec<Transaction> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut transactions = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let line = line + 1;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!("line {} could not be read, will be skipped: {}", line, err);
                continue;
            }
        };
        if is_header(&record) {
            continue;
        }
        if record.len() != FIELD_COUNT {
            if !(record.len() == 1 && record[0].is_empty()) {
                debug!(
                    "line {} has {} fields instead of {}, skipped",
                    line,
                    record.len(),
                    FIELD_COUNT
                );
            }
            continue;
        }
        match record.deserialize::<Transaction>(None) {
            Ok(tx) => transactions.push(tx),
            Err(err) => warn!(
                "line {} could not be parsed, will be skipped: {}",
                line, err
            ),
        }
    }
    transactions
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub region: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.region.is_none() && self.min_amount.is_none() && self.max_amount.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSummary {
    pub total_input: usize,
    pub invalid: usize,
    pub filtered_by_region: usize,
    pub filtered_by_amount: usize,
    pub final_count: usize,
}

/// What a user can narrow the run down to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub regions: Vec<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

impl FilterOptions {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let regions: BTreeSet<&str> = transactions
            .iter()
            .map(|tx| tx.region.as_str())
            .filter(|r| !r.is_empty())
            .collect();
        let amounts = transactions.iter().filter_map(Transaction::checked_amount);
        FilterOptions {
            regions: regions.into_iter().map(str::to_owned).collect(),
            min_amount: amounts.clone().min(),
            max_amount: amounts.max(),
        }
    }
}

pub fn validate_and_filter(
    transactions: Vec<Transaction>,
    filter: &Filter,
) -> (Vec<Transaction>, FilterSummary) {
    let total_input = transactions.len();
    let (mut valid, invalid): (Vec<_>, Vec<_>) =
        transactions.into_iter().partition(Transaction::is_valid);

    let options = FilterOptions::from_transactions(&valid);
    info!("available regions: {}", options.regions.join(", "));
    if let (Some(min), Some(max)) = (options.min_amount, options.max_amount) {
        info!("transaction amount range: min = {}, max = {}", min, max);
    }

    let mut summary = FilterSummary {
        total_input,
        invalid: invalid.len(),
        ..Default::default()
    };

    if let Some(region) = filter.region.as_deref().filter(|r| !r.is_empty()) {
        let before = valid.len();
        valid.retain(|tx| tx.region == region);
        summary.filtered_by_region = before - valid.len();
    }
    if let Some(min) = filter.min_amount {
        let before = valid.len();
        valid.retain(|tx| tx.amount() >= min);
        summary.filtered_by_amount += before - valid.len();
    }
    if let Some(max) = filter.max_amount {
        let before = valid.len();
        valid.retain(|tx| tx.amount() <= max);
        summary.filtered_by_amount += before - valid.len();
    }

    summary.final_count = valid.len();
    (valid, summary)
}

#[cfg(test)]
use rust_decimal_macros::dec;

#[cfg(test)]
fn sample(id: &str, qty: i64, price: Decimal, customer: &str, region: &str) -> Transaction {
    Transaction {
        transaction_id: id.to_string(),
        date: "2024-12-01".to_string(),
        product_id: "P101".to_string(),
        product_name: "Laptop".to_string(),
        quantity: qty,
        unit_price: price,
        customer_id: customer.to_string(),
        region: region.to_string(),
    }
}

#[test]
fn parses_and_cleans_lines() {
    let text = "TransactionID|Date|ProductID|ProductName|Quantity|UnitPrice|CustomerID|Region\n\
                T001|2024-12-01|P101|Laptop,Pro|2|45,000.50|C001|North\n\
                \n\
                T002|2024-12-02|P102|Mouse|1,200|500|C002|South\r\n";

    let txs = parse_transactions(text);

    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].product_name, "LaptopPro");
    assert_eq!(txs[0].unit_price, dec!(45000.50));
    assert_eq!(txs[0].amount(), dec!(90001.00));
    assert_eq!(txs[1].quantity, 1200);
    assert_eq!(txs[1].region, "South");
}

#[test]
fn skips_wrong_field_count_and_bad_numbers() {
    let text = "T001|2024-12-01|P101|Laptop|2|100|C001\n\
                T002|2024-12-01|P101|Laptop|two|100|C001|North\n\
                T003|2024-12-01|P101|Laptop|2|100|C001|North|extra\n\
                T004|2024-12-01|P101|Laptop|2|1.5|C001|North\n";

    let txs = parse_transactions(text);

    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].transaction_id, "T004");
}

#[test]
fn keeps_blank_fields_for_validation() {
    let txs = parse_transactions("T001|2024-12-01|P101|Laptop|2|100|C001|\n");
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].region, "");
}

#[test]
fn rejects_invalid_records() {
    let txs = vec![
        sample("T001", 1, dec!(10), "C001", "North"),
        sample("T002", 0, dec!(10), "C001", "North"),
        sample("T003", 1, dec!(0), "C001", "North"),
        sample("X004", 1, dec!(10), "C001", "North"),
        sample("T005", 1, dec!(10), "D001", "North"),
        sample("T006", 1, dec!(10), "C001", ""),
        sample("T007", -3, dec!(10), "C001", "North"),
    ];

    let (valid, summary) = validate_and_filter(txs, &Filter::default());

    assert_eq!(valid.len(), 1);
    assert_eq!(valid[0].transaction_id, "T001");
    assert_eq!(summary.total_input, 7);
    assert_eq!(summary.invalid, 6);
    assert_eq!(summary.final_count, 1);
}

#[test]
fn applies_region_and_amount_filters() {
    let txs = vec![
        sample("T001", 1, dec!(100), "C001", "North"),
        sample("T002", 2, dec!(100), "C001", "North"),
        sample("T003", 5, dec!(100), "C001", "North"),
        sample("T004", 2, dec!(100), "C002", "South"),
    ];
    let filter = Filter {
        region: Some("North".to_string()),
        min_amount: Some(dec!(200)),
        max_amount: Some(dec!(400)),
    };

    let (valid, summary) = validate_and_filter(txs, &filter);

    let ids: Vec<_> = valid.iter().map(|tx| tx.transaction_id.as_str()).collect();
    assert_eq!(ids, ["T002"]);
    assert_eq!(
        summary,
        FilterSummary {
            total_input: 4,
            invalid: 0,
            filtered_by_region: 1,
            filtered_by_amount: 2,
            final_count: 1,
        }
    );
}

#[test]
fn empty_region_filter_keeps_everything() {
    let txs = vec![
        sample("T001", 1, dec!(100), "C001", "North"),
        sample("T002", 1, dec!(100), "C002", "South"),
    ];
    let filter = Filter {
        region: Some(String::new()),
        ..Default::default()
    };

    let (valid, summary) = validate_and_filter(txs, &filter);

    assert_eq!(valid.len(), 2);
    assert_eq!(summary.filtered_by_region, 0);
}

#[test]
fn filter_options_cover_regions_and_amounts() {
    let txs = vec![
        sample("T001", 3, dec!(10), "C001", "West"),
        sample("T002", 1, dec!(5), "C001", "East"),
        sample("T003", 1, dec!(50), "C001", "West"),
    ];

    let options = FilterOptions::from_transactions(&txs);

    assert_eq!(options.regions, ["East", "West"]);
    assert_eq!(options.min_amount, Some(dec!(5)));
    assert_eq!(options.max_amount, Some(dec!(50)));
}

#[test]
fn overflowing_amount_is_invalid() {
    let text = "T001|2024-12-01|P101|Laptop|9223372036854775807|100000000000|C001|North\n\
                T002|2024-12-01|P101|Laptop|1|100|C001|North\n";

    let txs = parse_transactions(text);
    assert_eq!(txs.len(), 2);
    assert_eq!(FilterOptions::from_transactions(&txs).max_amount, Some(dec!(100)));

    let (valid, summary) = validate_and_filter(txs, &Filter::default());

    assert_eq!(valid.len(), 1);
    assert_eq!(valid[0].transaction_id, "T002");
    assert_eq!(summary.invalid, 1);
}
