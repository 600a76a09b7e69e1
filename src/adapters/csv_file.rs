use crate::domain::model::OrderedUnitsMap;
use crate::domain::numeric::coerce_number;
use crate::domain::ports::{OrderedUnitsQuery, OrderedUnitsSource};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One received order line from an export of the order module.
#[derive(Debug, Deserialize)]
struct OrderLine {
    article_id: String,
    #[serde(default)]
    quantity: String,
    delivery_date: String,
}

/// Aggregates an order-lines CSV (`article_id,quantity,delivery_date`).
#[derive(Debug, Clone)]
pub struct CsvOrderedUnits {
    path: PathBuf,
}

impl CsvOrderedUnits {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sums quantities per requested article for lines delivered inside the
    /// query's range.
    pub fn aggregate(data: &[u8], query: &OrderedUnitsQuery) -> Result<OrderedUnitsMap> {
        let wanted: HashSet<&str> = query.article_ids.iter().map(String::as_str).collect();
        let period = query.period();

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data);

        let mut totals = OrderedUnitsMap::new();
        let mut skipped = 0usize;

        for line in reader.deserialize::<OrderLine>() {
            let line = line?;
            if !wanted.contains(line.article_id.as_str()) {
                continue;
            }

            let Some(delivered) = parse_delivery_date(&line.delivery_date) else {
                tracing::debug!(
                    "Skipping order line for {} with unreadable date '{}'",
                    line.article_id,
                    line.delivery_date
                );
                skipped += 1;
                continue;
            };
            if !period.contains(delivered) {
                continue;
            }

            let quantity = coerce_number(Some(&Value::String(line.quantity)));
            *totals.entry(line.article_id).or_insert(0.0) += quantity;
        }

        if skipped > 0 {
            tracing::debug!("{} order lines skipped because of bad dates", skipped);
        }

        Ok(totals)
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_delivery_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[async_trait]
impl OrderedUnitsSource for CsvOrderedUnits {
    async fn ordered_units_by_article(&self, query: &OrderedUnitsQuery) -> Result<OrderedUnitsMap> {
        tracing::debug!("Reading order lines from {}", self.path.display());
        let data = tokio::fs::read(&self.path).await?;
        Self::aggregate(&data, query)
    }
}
