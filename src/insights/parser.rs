//! Parsing of notebook exit values into an insights payload.
//!
//! The insights notebook ends with `dbutils.notebook.exit(json.dumps(...))`,
//! which the Jobs API returns as `notebook_output.result`. Anything that does
//! not match the expected shape is reported as unparseable so the caller can
//! fall back to querying the tables.

use serde_json::{Map, Value as Json};

use super::payload::{CountrySales, InsightsPayload, TopProduct};
use crate::jobs::RunOutput;

/// Why a run's output could not be turned into a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// No `notebook_output.result` was recorded.
    Missing,
    /// The API truncated the exit value.
    Truncated,
    /// The exit value is not the expected JSON document.
    Malformed(String),
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "no notebook output recorded"),
            Self::Truncated => write!(f, "notebook output was truncated"),
            Self::Malformed(reason) => write!(f, "unparseable notebook output: {}", reason),
        }
    }
}

/// Extracts an insights payload from a run's recorded output.
pub fn parse_run_output(output: &RunOutput) -> Result<InsightsPayload, ParseFailure> {
    let notebook = output.notebook_output.as_ref().ok_or(ParseFailure::Missing)?;
    if notebook.truncated {
        return Err(ParseFailure::Truncated);
    }
    let result = notebook
        .result
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or(ParseFailure::Missing)?;

    parse_insights_json(result)
}

/// Parses a JSON document with `top_products` and `sales_by_country` arrays.
///
/// Record keys are matched case-insensitively and numeric measures may be
/// encoded as numbers or numeric strings. A present but null label reads as
/// empty and a null measure as zero, the same as NULL cells on the table path.
pub fn parse_insights_json(text: &str) -> Result<InsightsPayload, ParseFailure> {
    let doc: Json =
        serde_json::from_str(text).map_err(|e| ParseFailure::Malformed(e.to_string()))?;
    let root = doc
        .as_object()
        .ok_or_else(|| ParseFailure::Malformed("expected a JSON object".to_string()))?;

    let top_products = records(root, "top_products")?
        .iter()
        .map(|record| {
            Ok(TopProduct {
                description: text_field(record, "description")?,
                total_quantity_sold: number_field(record, "total_quantity_sold")? as i64,
            })
        })
        .collect::<Result<Vec<_>, ParseFailure>>()?;

    let sales_by_country = records(root, "sales_by_country")?
        .iter()
        .map(|record| {
            Ok(CountrySales {
                country: text_field(record, "country")?,
                total_sales_revenue: number_field(record, "total_sales_revenue")?,
            })
        })
        .collect::<Result<Vec<_>, ParseFailure>>()?;

    Ok(InsightsPayload {
        top_products,
        sales_by_country,
    })
}

fn records<'a>(root: &'a Map<String, Json>, key: &str) -> Result<Vec<&'a Map<String, Json>>, ParseFailure> {
    let items = lookup(root, key)
        .and_then(Json::as_array)
        .ok_or_else(|| ParseFailure::Malformed(format!("missing '{}' array", key)))?;

    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| ParseFailure::Malformed(format!("'{}' entries must be objects", key)))
        })
        .collect()
}

fn lookup<'a>(record: &'a Map<String, Json>, key: &str) -> Option<&'a Json> {
    record
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

fn text_field(record: &Map<String, Json>, key: &str) -> Result<String, ParseFailure> {
    match lookup(record, key) {
        Some(Json::String(s)) => Ok(s.clone()),
        Some(Json::Null) => Ok(String::new()),
        _ => Err(ParseFailure::Malformed(format!("missing text field '{}'", key))),
    }
}

fn number_field(record: &Map<String, Json>, key: &str) -> Result<f64, ParseFailure> {
    match lookup(record, key) {
        Some(Json::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ParseFailure::Malformed(format!("'{}' out of range", key))),
        Some(Json::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| ParseFailure::Malformed(format!("'{}' is not numeric", key))),
        Some(Json::Null) => Ok(0.0),
        _ => Err(ParseFailure::Malformed(format!("missing numeric field '{}'", key))),
    }
}
