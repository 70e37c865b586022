use crate::analytics::{
    calculate_total_revenue, customer_analysis, daily_sales_trend, find_peak_sales_day,
    low_performing_products, region_wise_sales, top_selling_products, LOW_PERFORMANCE_THRESHOLD,
    TOP_N,
};
use crate::enrich::{EnrichedTransaction, EnrichmentStats};
use crate::error::Result;
use crate::records::Transaction;
use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashSet;
use std::io::Write;

const WIDE_RULE: usize = 50;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rupee amount with thousands separators, e.g. `₹1,545,000.50`.
pub fn format_money(value: Decimal, decimals: u32) -> String {
    format!("₹{}", group_thousands(value, decimals))
}

fn group_thousands(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let plain = format!("{:.*}", decimals as usize, rounded.abs());
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (plain.as_str(), None),
    };

    let mut grouped = String::with_capacity(plain.len() + int_part.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        grouped.push('-');
    }
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(frac_part) = frac_part {
        grouped.push('.');
        grouped.push_str(frac_part);
    }
    grouped
}

/// Share of total as a rounded float would print it: `45.5`, `50.0`.
fn format_percent(value: Decimal) -> String {
    let value = value.normalize();
    if value.scale() == 0 {
        format!("{}.0", value)
    } else {
        value.to_string()
    }
}

fn rule<W: Write>(out: &mut W, ch: char) -> Result<()> {
    writeln!(out, "{}", ch.to_string().repeat(WIDE_RULE))?;
    Ok(())
}

fn section<W: Write>(out: &mut W, title: &str) -> Result<()> {
    writeln!(out, "{}", title)?;
    rule(out, '-')
}

pub fn generate_sales_report<W: Write>(
    transactions: &[Transaction],
    enriched: &[EnrichedTransaction],
    generated_at: &NaiveDateTime,
    mut out: W,
) -> Result<()> {
    rule(&mut out, '=')?;
    writeln!(out, "        SALES ANALYTICS REPORT")?;
    writeln!(out, "  Generated: {}", generated_at.format(TIMESTAMP_FORMAT))?;
    writeln!(out, "  Records Processed: {}", transactions.len())?;
    rule(&mut out, '=')?;
    writeln!(out)?;

    let total_revenue = calculate_total_revenue(transactions);
    let avg_order_value = if transactions.is_empty() {
        Decimal::ZERO
    } else {
        total_revenue / Decimal::from(transactions.len())
    };
    let first = transactions.iter().map(|tx| tx.date.as_str()).min();
    let last = transactions.iter().map(|tx| tx.date.as_str()).max();
    let date_range = match (first, last) {
        (Some(first), Some(last)) => format!("{} to {}", first, last),
        _ => "N/A".to_string(),
    };

    section(&mut out, "OVERALL SUMMARY")?;
    writeln!(out, "Total Revenue:        {}", format_money(total_revenue, 2))?;
    writeln!(out, "Total Transactions:   {}", transactions.len())?;
    writeln!(out, "Average Order Value:  {}", format_money(avg_order_value, 2))?;
    writeln!(out, "Date Range:           {}", date_range)?;
    writeln!(out)?;

    section(&mut out, "REGION-WISE PERFORMANCE")?;
    writeln!(
        out,
        "{:<10}{:<15}{:<12}{}",
        "Region", "Sales", "% of Total", "Transactions"
    )?;
    for region in region_wise_sales(transactions) {
        writeln!(
            out,
            "{:<10}{}   {:>6}%        {}",
            region.region,
            format_money(region.total_sales, 2),
            format_percent(region.percentage),
            region.transaction_count
        )?;
    }
    writeln!(out)?;

    section(&mut out, "TOP 5 PRODUCTS")?;
    writeln!(out, "{:<6}{:<20}{:<8}{}", "Rank", "Product", "Qty", "Revenue")?;
    for (rank, product) in top_selling_products(transactions, TOP_N).iter().enumerate() {
        writeln!(
            out,
            "{:<6}{:<20}{:<8}{}",
            rank + 1,
            product.name,
            product.quantity,
            format_money(product.revenue, 2)
        )?;
    }
    writeln!(out)?;

    section(&mut out, "TOP 5 CUSTOMERS")?;
    writeln!(out, "{:<6}{:<12}{:<15}{}", "Rank", "Customer", "Spent", "Orders")?;
    for (rank, customer) in customer_analysis(transactions).iter().take(TOP_N).enumerate() {
        writeln!(
            out,
            "{:<6}{:<12}{}   {}",
            rank + 1,
            customer.customer_id,
            format_money(customer.total_spent, 2),
            customer.purchase_count
        )?;
    }
    writeln!(out)?;

    section(&mut out, "DAILY SALES TREND")?;
    writeln!(out, "{:<12}{:<15}{:<8}{}", "Date", "Revenue", "Txns", "Customers")?;
    for day in daily_sales_trend(transactions) {
        writeln!(
            out,
            "{:<12}{}   {:<8}{}",
            day.date,
            format_money(day.revenue, 2),
            day.transaction_count,
            day.unique_customers
        )?;
    }
    writeln!(out)?;

    section(&mut out, "PRODUCT PERFORMANCE ANALYSIS")?;
    match find_peak_sales_day(transactions) {
        Some(peak) => writeln!(
            out,
            "Best Sales Day: {} | Revenue: {} | Transactions: {}",
            peak.date,
            format_money(peak.revenue, 2),
            peak.transaction_count
        )?,
        None => writeln!(out, "Best Sales Day: N/A")?,
    }
    let low = low_performing_products(transactions, LOW_PERFORMANCE_THRESHOLD);
    if low.is_empty() {
        writeln!(out, "No low performing products found.")?;
    } else {
        writeln!(out, "Low Performing Products:")?;
        for product in low {
            writeln!(
                out,
                " - {}: Qty={}, Revenue={}",
                product.name,
                product.quantity,
                format_money(product.revenue, 2)
            )?;
        }
    }
    writeln!(out)?;

    let stats = EnrichmentStats::from(enriched);
    section(&mut out, "API ENRICHMENT SUMMARY")?;
    writeln!(out, "Total Records Enriched: {}", stats.matched)?;
    writeln!(out, "Enrichment Success Rate: {:.2}%", stats.success_rate())?;
    let mut listed = HashSet::new();
    let missing: Vec<&Transaction> = enriched
        .iter()
        .filter(|tx| !tx.api_match())
        .map(|tx| &tx.transaction)
        .filter(|tx| listed.insert(tx.product_id.as_str()))
        .collect();
    if !missing.is_empty() {
        writeln!(out, "Products Not Enriched:")?;
        for tx in missing {
            writeln!(out, " - {} ({})", tx.product_id, tx.product_name)?;
        }
    }
    writeln!(out)?;

    out.flush()?;
    Ok(())
}
