use crate::catalog::DEFAULT_API_URL;
use crate::error::{Error, Result};
use crate::records::{Filter, FilterOptions};
use crate::report::format_money;
use rust_decimal::Decimal;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const API_URL_VAR: &str = "SALES_API_URL";
pub const API_TIMEOUT_VAR: &str = "SALES_API_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const USAGE: &str = "usage: sales-tally [INPUT] [--region R] [--min-amount N] [--max-amount N] \
[--enriched-out PATH] [--report-out PATH] [--api-url URL] [--interactive] [--prefetch]";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input: PathBuf,
    pub enriched_output: PathBuf,
    pub report_output: PathBuf,
    pub api_url: String,
    pub api_timeout: Duration,
    pub filter: Filter,
    pub interactive: bool,
    pub prefetch: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input: PathBuf::from("data/sales_data.txt"),
            enriched_output: PathBuf::from("data/enriched_sales_data.txt"),
            report_output: PathBuf::from("output/sales_report.txt"),
            api_url: DEFAULT_API_URL.to_string(),
            api_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            filter: Filter::default(),
            interactive: false,
            prefetch: false,
        }
    }
}

pub fn parse_amount(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim().replace(',', "").as_str())
        .map_err(|_| Error::InvalidAmount(raw.trim().to_string()))
}

impl Config {
    /// Builds the configuration from command-line arguments (without the
    /// program name) and an environment lookup. Flags win over the
    /// environment.
    pub fn from_args<I, E>(args: I, env: E) -> Result<Config>
    where
        I: IntoIterator<Item = String>,
        E: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = env(API_URL_VAR) {
            config.api_url = url;
        }
        if let Some(secs) = env(API_TIMEOUT_VAR) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Usage(format!("{} must be a whole number of seconds", API_TIMEOUT_VAR))
            })?;
            config.api_timeout = Duration::from_secs(secs);
        }

        let mut input = None;
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = || {
                args.next()
                    .ok_or_else(|| Error::Usage(format!("{} needs a value\n{}", arg, USAGE)))
            };
            match arg.as_str() {
                "--region" => config.filter.region = non_blank(value()?),
                "--min-amount" => config.filter.min_amount = Some(parse_amount(&value()?)?),
                "--max-amount" => config.filter.max_amount = Some(parse_amount(&value()?)?),
                "--enriched-out" => config.enriched_output = PathBuf::from(value()?),
                "--report-out" => config.report_output = PathBuf::from(value()?),
                "--api-url" => config.api_url = value()?,
                "--interactive" => config.interactive = true,
                "--prefetch" => config.prefetch = true,
                flag if flag.starts_with("--") => {
                    return Err(Error::Usage(format!("unknown option '{}'\n{}", flag, USAGE)))
                }
                _ if input.is_none() => input = Some(PathBuf::from(&arg)),
                _ => {
                    return Err(Error::Usage(format!(
                        "exactly one input file is supported\n{}",
                        USAGE
                    )))
                }
            }
        }

        if let Some(input) = input {
            config.input = input;
        }
        check_range(&config.filter)?;
        Ok(config)
    }
}

fn check_range(filter: &Filter) -> Result<()> {
    if let (Some(min), Some(max)) = (filter.min_amount, filter.max_amount) {
        if min > max {
            return Err(Error::Usage(format!(
                "minimum amount {} is greater than maximum amount {}",
                min, max
            )));
        }
    }
    Ok(())
}

fn non_blank(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> Result<Option<String>> {
    write!(output, "{}", question)?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(non_blank(line))
}

/// Asks the user on `output` which filters to apply, reading answers from
/// `input`. A blank answer skips that filter.
pub fn prompt_filter<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    options: &FilterOptions,
) -> Result<Filter> {
    writeln!(output, "Filter Options Available:")?;
    writeln!(output, "Regions: {}", options.regions.join(", "))?;
    if let (Some(min), Some(max)) = (options.min_amount, options.max_amount) {
        writeln!(
            output,
            "Amount Range: {} - {}",
            format_money(min, 0),
            format_money(max, 0)
        )?;
    }

    let wants_filter = ask(&mut input, &mut output, "Do you want to filter data? (y/n): ")?
        .map_or(false, |a| a.eq_ignore_ascii_case("y"));
    if !wants_filter {
        return Ok(Filter::default());
    }

    let region = ask(&mut input, &mut output, "Enter region (or press Enter to skip): ")?;
    let min_amount = ask(
        &mut input,
        &mut output,
        "Enter minimum amount (or press Enter to skip): ",
    )?
    .map(|raw| parse_amount(&raw))
    .transpose()?;
    let max_amount = ask(
        &mut input,
        &mut output,
        "Enter maximum amount (or press Enter to skip): ",
    )?
    .map(|raw| parse_amount(&raw))
    .transpose()?;

    let filter = Filter {
        region,
        min_amount,
        max_amount,
    };
    check_range(&filter)?;
    Ok(filter)
}
