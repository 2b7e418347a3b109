//! Insights payload types.

use serde::{Deserialize, Serialize};

use crate::jobs::{LifeCycleState, ResultState};
use crate::warehouse::{QueryResult, Value};

/// One best-selling product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProduct {
    #[serde(rename = "Description")]
    pub description: String,
    pub total_quantity_sold: i64,
}

/// Revenue for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySales {
    #[serde(rename = "Country")]
    pub country: String,
    pub total_sales_revenue: f64,
}

/// The top-products and sales-by-country summary returned to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightsPayload {
    pub top_products: Vec<TopProduct>,
    pub sales_by_country: Vec<CountrySales>,
}

impl InsightsPayload {
    /// Assembles a payload from the two fallback query results.
    ///
    /// Columns are read positionally (label, measure), so either template
    /// generation works regardless of column aliasing.
    pub fn from_query_results(top_products: &QueryResult, sales_by_country: &QueryResult) -> Self {
        Self {
            top_products: top_products
                .rows
                .iter()
                .map(|row| TopProduct {
                    description: label(row.first()),
                    total_quantity_sold: row.get(1).and_then(Value::as_i64).unwrap_or(0),
                })
                .collect(),
            sales_by_country: sales_by_country
                .rows
                .iter()
                .map(|row| CountrySales {
                    country: label(row.first()),
                    total_sales_revenue: row.get(1).and_then(Value::as_f64).unwrap_or(0.0),
                })
                .collect(),
        }
    }
}

fn label(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_display_string(),
    }
}

/// Where a resolved payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSource {
    /// Parsed from the notebook's recorded exit value.
    NotebookOutput,
    /// Assembled from direct warehouse queries.
    TableQuery,
}

/// Non-error outcome of resolving a run.
#[derive(Debug, Clone, PartialEq)]
pub enum InsightResolution {
    /// The run has not finished; no payload yet.
    Running {
        life_cycle_state: LifeCycleState,
        result_state: Option<ResultState>,
    },
    /// The run succeeded and a payload was produced.
    Ready {
        payload: InsightsPayload,
        source: InsightSource,
    },
}
