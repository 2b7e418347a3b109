//! Fixed analytical query templates over the retail star schema.
//!
//! All statements are trusted constants. Schema selection happens through
//! the warehouse request, so no identifier is ever spliced into SQL text.
//! The `Original` set keeps the first-generation statements for comparison;
//! `Fixed` corrects their joins and aggregations and is the default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Star-schema tables probed by the table-health check.
pub const STAR_SCHEMA_TABLES: [&str; 4] = ["fact_sales", "dim_product", "dim_customer", "dim_date"];

/// Which generation of query templates to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryVersion {
    Original,
    #[default]
    Fixed,
}

impl QueryVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Fixed => "fixed",
        }
    }
}

impl FromStr for QueryVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "original" | "v1" => Ok(Self::Original),
            "fixed" | "v2" => Ok(Self::Fixed),
            _ => Err(format!(
                "Unknown query version: {s}. Expected: original or fixed"
            )),
        }
    }
}

impl fmt::Display for QueryVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The business questions answered by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsightQuery {
    TopProducts,
    SalesByCountry,
    RecentSales,
    CustomerInsights,
    ProductPerformance,
}

impl InsightQuery {
    pub const ALL: [InsightQuery; 5] = [
        Self::TopProducts,
        Self::SalesByCountry,
        Self::RecentSales,
        Self::CustomerInsights,
        Self::ProductPerformance,
    ];

    /// URL slug used by the endpoint layer.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::TopProducts => "top-products",
            Self::SalesByCountry => "sales-by-country",
            Self::RecentSales => "recent-sales",
            Self::CustomerInsights => "customer-insights",
            Self::ProductPerformance => "product-performance",
        }
    }

    /// Human-readable label returned alongside the rows.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TopProducts => "Top 10 Best-Selling Products",
            Self::SalesByCountry => "Top 10 Countries by Sales Revenue",
            Self::RecentSales => "Recent Sales Trends (Last 30 Days)",
            Self::CustomerInsights => "Top Customers by Spending",
            Self::ProductPerformance => "Product Performance by Revenue",
        }
    }

    /// Returns the SQL for this question in the given template generation.
    pub fn sql(&self, version: QueryVersion) -> &'static str {
        match (self, version) {
            (Self::TopProducts, QueryVersion::Original) => TOP_PRODUCTS_ORIGINAL,
            (Self::TopProducts, QueryVersion::Fixed) => TOP_PRODUCTS,
            (Self::SalesByCountry, QueryVersion::Original) => SALES_BY_COUNTRY_ORIGINAL,
            (Self::SalesByCountry, QueryVersion::Fixed) => SALES_BY_COUNTRY,
            (Self::RecentSales, QueryVersion::Original) => RECENT_SALES_ORIGINAL,
            (Self::RecentSales, QueryVersion::Fixed) => RECENT_SALES,
            (Self::CustomerInsights, _) => CUSTOMER_INSIGHTS,
            (Self::ProductPerformance, _) => PRODUCT_PERFORMANCE,
        }
    }
}

/// Row-count probe for one of [`STAR_SCHEMA_TABLES`].
///
/// Returns `None` for any table outside the fixed list.
pub fn table_count_sql(table: &str) -> Option<String> {
    STAR_SCHEMA_TABLES
        .contains(&table)
        .then(|| format!("SELECT COUNT(*) AS row_count FROM {table}"))
}

const TOP_PRODUCTS: &str = "\
SELECT dp.Description, SUM(fs.quantity) AS total_quantity_sold
FROM fact_sales fs
JOIN dim_product dp ON fs.StockCode = dp.StockCode
GROUP BY dp.Description
ORDER BY total_quantity_sold DESC
LIMIT 10";

const TOP_PRODUCTS_ORIGINAL: &str = "\
SELECT Description, total_quantity_sold
FROM fact_sales
JOIN dim_product ON fact_sales.StockCode = dim_product.StockCode
ORDER BY total_quantity_sold DESC
LIMIT 10";

const SALES_BY_COUNTRY: &str = "\
SELECT dc.Country, SUM(fs.total_price) AS total_sales_revenue
FROM fact_sales fs
JOIN dim_customer dc ON fs.CustomerID = dc.CustomerID
GROUP BY dc.Country
ORDER BY total_sales_revenue DESC
LIMIT 10";

const SALES_BY_COUNTRY_ORIGINAL: &str = "\
SELECT Country, SUM(total_price) AS total_sales_revenue
FROM fact_sales
JOIN dim_customer ON fact_sales.CustomerID = dim_customer.CustomerID
GROUP BY Country
ORDER BY total_sales_revenue DESC
LIMIT 10";

const RECENT_SALES: &str = "\
SELECT dd.date_key, dd.year, dd.month, dd.day,
       SUM(fs.total_price) AS daily_revenue,
       SUM(fs.quantity) AS daily_quantity
FROM fact_sales fs
JOIN dim_date dd ON fs.date_key = dd.date_key
GROUP BY dd.date_key, dd.year, dd.month, dd.day
ORDER BY dd.date_key DESC
LIMIT 30";

const RECENT_SALES_ORIGINAL: &str = "\
SELECT date_key,
       SUM(total_price) AS daily_revenue,
       SUM(quantity) AS daily_quantity
FROM fact_sales
GROUP BY date_key
ORDER BY date_key DESC
LIMIT 30";

const CUSTOMER_INSIGHTS: &str = "\
SELECT dc.CustomerID, dc.Country,
       COUNT(DISTINCT fs.invoice_id) AS total_orders,
       SUM(fs.total_price) AS total_spent,
       AVG(fs.total_price) AS avg_order_value
FROM fact_sales fs
JOIN dim_customer dc ON fs.CustomerID = dc.CustomerID
GROUP BY dc.CustomerID, dc.Country
ORDER BY total_spent DESC
LIMIT 15";

const PRODUCT_PERFORMANCE: &str = "\
SELECT dp.StockCode, dp.Description,
       COUNT(DISTINCT fs.invoice_id) AS times_ordered,
       SUM(fs.quantity) AS total_quantity,
       SUM(fs.total_price) AS total_revenue,
       AVG(fs.unit_price) AS avg_unit_price
FROM fact_sales fs
JOIN dim_product dp ON fs.StockCode = dp.StockCode
GROUP BY dp.StockCode, dp.Description
ORDER BY total_revenue DESC
LIMIT 15";
