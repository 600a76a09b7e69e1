use crate::domain::model::{DateRange, OrderedUnitsMap};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Request for purchased totals of a set of articles over an inclusive
/// delivery-date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedUnitsQuery {
    pub article_ids: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl OrderedUnitsQuery {
    pub fn new(article_ids: Vec<String>, period: DateRange) -> Self {
        Self {
            article_ids,
            start: period.start,
            end: period.end,
        }
    }

    pub fn period(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }
}

/// The order-aggregation collaborator.
///
/// Implementations return the total received quantity per requested article
/// for orders delivered inside the range. Articles without orders may be
/// left out of the map.
#[async_trait]
pub trait OrderedUnitsSource: Send + Sync {
    async fn ordered_units_by_article(&self, query: &OrderedUnitsQuery)
        -> Result<OrderedUnitsMap>;
}

#[async_trait]
impl<T: OrderedUnitsSource + ?Sized> OrderedUnitsSource for Box<T> {
    async fn ordered_units_by_article(
        &self,
        query: &OrderedUnitsQuery,
    ) -> Result<OrderedUnitsMap> {
        (**self).ordered_units_by_article(query).await
    }
}
