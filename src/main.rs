use env_logger::Env;
use log::{error, info};
use std::{env, io};

use tally::catalog::{create_product_mapping, PREFETCH_LIMIT};
use tally::config::{prompt_filter, API_URL_VAR};
use tally::files::{create_output, read_sales_data};
use tally::records::FilterOptions;
use tally::{
    enrich_sales_data, generate_sales_report, parse_transactions, save_enriched_data,
    validate_and_filter, Catalog, Config, EnrichmentStats, HttpCatalog,
};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn run() -> tally::Result<()> {
    let config = Config::from_args(env::args().skip(1), |key| env::var(key).ok())?;

    info!("[1/8] reading sales data from '{}'", config.input.display());
    let text = read_sales_data(&config.input)?;

    info!("[2/8] parsing and cleaning data");
    let parsed = parse_transactions(&text);
    info!("parsed {} records", parsed.len());

    let filter = if config.interactive {
        let options = FilterOptions::from_transactions(&parsed);
        prompt_filter(io::stdin().lock(), io::stdout(), &options)?
    } else {
        config.filter.clone()
    };

    info!("[3/8] validating transactions");
    let (transactions, summary) = validate_and_filter(parsed, &filter);
    info!(
        "valid: {} | invalid: {} | filtered by region: {} | filtered by amount: {}",
        summary.final_count, summary.invalid, summary.filtered_by_region, summary.filtered_by_amount
    );

    info!("[4/8] connecting to product catalog at {}", config.api_url);
    let http = HttpCatalog::new(&config.api_url, config.api_timeout)?;
    let catalog: Box<dyn Catalog> = if config.prefetch {
        let products = http.fetch_all_products(PREFETCH_LIMIT).unwrap_or_else(|err| {
            error!(
                "failed to fetch products (set {} to use another catalog): {}",
                API_URL_VAR, err
            );
            Vec::new()
        });
        Box::new(create_product_mapping(products))
    } else {
        Box::new(http)
    };

    info!("[5/8] enriching sales data");
    let enriched = enrich_sales_data(&transactions, catalog.as_ref());
    let stats = EnrichmentStats::from(enriched.as_slice());
    info!(
        "enriched {}/{} transactions ({:.1}%)",
        stats.matched,
        stats.total,
        stats.success_rate()
    );

    info!("[6/8] saving enriched data");
    save_enriched_data(&enriched, create_output(&config.enriched_output)?)?;
    info!("saved to '{}'", config.enriched_output.display());

    info!("[7/8] generating report");
    let generated_at = chrono::Local::now().naive_local();
    generate_sales_report(
        &transactions,
        &enriched,
        &generated_at,
        create_output(&config.report_output)?,
    )?;
    info!("report saved to '{}'", config.report_output.display());

    info!("[8/8] process complete");
    Ok(())
}
