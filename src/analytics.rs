//! Grouping and summation passes over validated transactions.
//!
//! Every grouping keeps first-seen order before sorting, and all sorts are
//! stable, so ties are reported in the order they appear in the input.

use crate::records::Transaction;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub const TOP_N: usize = 5;
pub const LOW_PERFORMANCE_THRESHOLD: i64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct RegionStats {
    pub region: String,
    pub total_sales: Decimal,
    pub transaction_count: usize,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductStats {
    pub name: String,
    pub quantity: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerStats {
    pub customer_id: String,
    pub total_spent: Decimal,
    pub purchase_count: usize,
    pub avg_order_value: Decimal,
    pub products_bought: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyStats {
    pub date: String,
    pub revenue: Decimal,
    pub transaction_count: usize,
    pub unique_customers: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeakDay {
    pub date: String,
    pub revenue: Decimal,
    pub transaction_count: usize,
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `part / whole * 100` rounded to two places, zero when `whole` is zero.
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    round2(part / whole * Decimal::ONE_HUNDRED)
}

/// Groups by `key` keeping first-seen order.
fn group_by<'a, K, F>(
    transactions: &'a [Transaction],
    key: F,
) -> Vec<(K, Vec<&'a Transaction>)>
where
    K: std::hash::Hash + Eq + Clone,
    F: Fn(&'a Transaction) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&Transaction>)> = Vec::new();
    for tx in transactions {
        let k = key(tx);
        let slot = *index.entry(k.clone()).or_insert_with(|| {
            groups.push((k, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(tx);
    }
    groups
}

/// Totals saturate at the `Decimal` bounds instead of overflowing.
fn sum_amounts<'a>(txs: impl IntoIterator<Item = &'a Transaction>) -> Decimal {
    txs.into_iter().fold(Decimal::ZERO, |total, tx| total.saturating_add(tx.amount()))
}

fn revenue_of(txs: &[&Transaction]) -> Decimal {
    sum_amounts(txs.iter().copied())
}

fn quantity_of(txs: &[&Transaction]) -> i64 {
    txs.iter().fold(0i64, |total, tx| total.saturating_add(tx.quantity))
}

pub fn calculate_total_revenue(transactions: &[Transaction]) -> Decimal {
    sum_amounts(transactions)
}

pub fn region_wise_sales(transactions: &[Transaction]) -> Vec<RegionStats> {
    let overall = calculate_total_revenue(transactions);
    let mut stats: Vec<RegionStats> = group_by(transactions, |tx| tx.region.as_str())
        .into_iter()
        .map(|(region, txs)| {
            let total_sales = revenue_of(&txs);
            RegionStats {
                region: region.to_owned(),
                total_sales,
                transaction_count: txs.len(),
                percentage: percentage(total_sales, overall),
            }
        })
        .collect();
    stats.sort_by(|a, b| b.total_sales.cmp(&a.total_sales));
    stats
}

fn product_stats(transactions: &[Transaction]) -> Vec<ProductStats> {
    group_by(transactions, |tx| tx.product_name.as_str())
        .into_iter()
        .map(|(name, txs)| ProductStats {
            name: name.to_owned(),
            quantity: quantity_of(&txs),
            revenue: revenue_of(&txs),
        })
        .collect()
}

pub fn top_selling_products(transactions: &[Transaction], n: usize) -> Vec<ProductStats> {
    let mut products = product_stats(transactions);
    products.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    products.truncate(n);
    products
}

pub fn customer_analysis(transactions: &[Transaction]) -> Vec<CustomerStats> {
    let groups = group_by(transactions, |tx| tx.customer_id.as_str());
    let mut customers: Vec<CustomerStats> = groups
        .into_iter()
        .map(|(customer, txs)| {
            let total_spent = revenue_of(&txs);
            let products: BTreeSet<&str> =
                txs.iter().map(|tx| tx.product_name.as_str()).collect();
            CustomerStats {
                customer_id: customer.to_owned(),
                total_spent,
                purchase_count: txs.len(),
                avg_order_value: round2(total_spent / Decimal::from(txs.len())),
                products_bought: products.into_iter().map(str::to_owned).collect(),
            }
        })
        .collect();
    customers.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));
    customers
}

pub fn daily_sales_trend(transactions: &[Transaction]) -> Vec<DailyStats> {
    let mut days: BTreeMap<&str, (Decimal, usize, HashSet<&str>)> = BTreeMap::new();
    for tx in transactions {
        let (revenue, count, customers) = days.entry(tx.date.as_str()).or_default();
        *revenue = revenue.saturating_add(tx.amount());
        *count += 1;
        customers.insert(tx.customer_id.as_str());
    }
    days.into_iter()
        .map(|(date, (revenue, transaction_count, customers))| DailyStats {
            date: date.to_owned(),
            revenue,
            transaction_count,
            unique_customers: customers.len(),
        })
        .collect()
}

pub fn find_peak_sales_day(transactions: &[Transaction]) -> Option<PeakDay> {
    let mut peak: Option<PeakDay> = None;
    for (date, txs) in group_by(transactions, |tx| tx.date.as_str()) {
        let revenue = revenue_of(&txs);
        if peak.as_ref().map_or(true, |p| revenue > p.revenue) {
            peak = Some(PeakDay {
                date: date.to_owned(),
                revenue,
                transaction_count: txs.len(),
            });
        }
    }
    peak
}

pub fn low_performing_products(
    transactions: &[Transaction],
    threshold: i64,
) -> Vec<ProductStats> {
    let mut products: Vec<ProductStats> = product_stats(transactions)
        .into_iter()
        .filter(|p| p.quantity < threshold)
        .collect();
    products.sort_by_key(|p| p.quantity);
    products
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx(
        id: &str,
        date: &str,
        product: &str,
        qty: i64,
        price: Decimal,
        customer: &str,
        region: &str,
    ) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            date: date.to_string(),
            product_id: "P101".to_string(),
            product_name: product.to_string(),
            quantity: qty,
            unit_price: price,
            customer_id: customer.to_string(),
            region: region.to_string(),
        }
    }

    fn fixture() -> Vec<Transaction> {
        vec![
            tx("T001", "2024-12-02", "Laptop", 2, dec!(1000), "C001", "North"),
            tx("T002", "2024-12-01", "Mouse", 12, dec!(10), "C002", "South"),
            tx("T003", "2024-12-02", "Laptop", 1, dec!(1000), "C002", "North"),
            tx("T004", "2024-12-01", "Cable", 3, dec!(5.50), "C001", "East"),
            tx("T005", "2024-12-03", "Mouse", 1, dec!(10), "C003", "South"),
        ]
    }

    #[test]
    fn total_revenue() {
        assert_eq!(calculate_total_revenue(&fixture()), dec!(3146.50));
        assert_eq!(calculate_total_revenue(&[]), Decimal::ZERO);
    }

    #[test]
    fn regions_sorted_by_sales() {
        let regions = region_wise_sales(&fixture());

        let names: Vec<_> = regions.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(names, ["North", "South", "East"]);
        assert_eq!(regions[0].total_sales, dec!(3000));
        assert_eq!(regions[0].transaction_count, 2);
        assert_eq!(regions[0].percentage, dec!(95.34));
        assert_eq!(regions[1].percentage, dec!(4.13));
        assert_eq!(regions[2].percentage, dec!(0.52));
    }

    #[test]
    fn top_products_by_quantity() {
        let top = top_selling_products(&fixture(), 2);

        assert_eq!(top.len(), 2);
        assert_eq!(
            top[0],
            ProductStats {
                name: "Mouse".into(),
                quantity: 13,
                revenue: dec!(130)
            }
        );
        assert_eq!(top[1].name, "Laptop");
        assert_eq!(top[1].quantity, 3);
    }

    #[test]
    fn customers_sorted_by_spend() {
        let customers = customer_analysis(&fixture());

        assert_eq!(customers[0].customer_id, "C001");
        assert_eq!(customers[0].total_spent, dec!(2016.50));
        assert_eq!(customers[0].purchase_count, 2);
        assert_eq!(customers[0].avg_order_value, dec!(1008.25));
        assert_eq!(customers[0].products_bought, ["Cable", "Laptop"]);
        assert_eq!(customers[1].customer_id, "C002");
        assert_eq!(customers[1].products_bought, ["Laptop", "Mouse"]);
        assert_eq!(customers[2].customer_id, "C003");
    }

    #[test]
    fn daily_trend_is_chronological() {
        let days = daily_sales_trend(&fixture());

        let dates: Vec<_> = days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, ["2024-12-01", "2024-12-02", "2024-12-03"]);
        assert_eq!(days[0].revenue, dec!(136.50));
        assert_eq!(days[0].transaction_count, 2);
        assert_eq!(days[0].unique_customers, 2);
        assert_eq!(days[1].unique_customers, 2);
    }

    #[test]
    fn peak_day() {
        let peak = find_peak_sales_day(&fixture()).unwrap();
        assert_eq!(peak.date, "2024-12-02");
        assert_eq!(peak.revenue, dec!(3000));
        assert_eq!(peak.transaction_count, 2);

        assert_eq!(find_peak_sales_day(&[]), None);
    }

    #[test]
    fn peak_day_tie_goes_to_first_seen() {
        let txs = vec![
            tx("T001", "2024-12-05", "Mouse", 1, dec!(10), "C001", "North"),
            tx("T002", "2024-12-01", "Mouse", 1, dec!(10), "C001", "North"),
        ];
        assert_eq!(find_peak_sales_day(&txs).unwrap().date, "2024-12-05");
    }

    #[test]
    fn low_performers_ascending() {
        let low = low_performing_products(&fixture(), LOW_PERFORMANCE_THRESHOLD);

        let names: Vec<_> = low.iter().map(|p| (p.name.as_str(), p.quantity)).collect();
        assert_eq!(names, [("Laptop", 3), ("Cable", 3)]);
    }

    #[test]
    fn huge_quantities_saturate() {
        let txs = vec![
            tx("T001", "2024-12-01", "Bolt", i64::MAX, dec!(1), "C001", "North"),
            tx("T002", "2024-12-01", "Bolt", 1, dec!(1), "C002", "North"),
        ];

        let top = top_selling_products(&txs, TOP_N);

        assert_eq!(top[0].quantity, i64::MAX);
        assert_eq!(top[0].revenue, Decimal::from(i64::MAX) + Decimal::ONE);
        assert!(low_performing_products(&txs, LOW_PERFORMANCE_THRESHOLD).is_empty());
    }

    #[test]
    fn revenue_totals_saturate() {
        let txs = vec![
            tx("T001", "2024-12-01", "Bond", 1, Decimal::MAX, "C001", "North"),
            tx("T002", "2024-12-01", "Bond", 1, Decimal::MAX, "C001", "North"),
        ];

        assert_eq!(calculate_total_revenue(&txs), Decimal::MAX);
        assert_eq!(daily_sales_trend(&txs)[0].revenue, Decimal::MAX);
        assert_eq!(region_wise_sales(&txs)[0].percentage, dec!(100));
    }

    #[test]
    fn percentage_of_zero_total() {
        assert_eq!(percentage(dec!(5), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percentage(dec!(1), dec!(3)), dec!(33.33));
    }
}
