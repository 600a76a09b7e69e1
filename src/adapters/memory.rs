use crate::domain::model::OrderedUnitsMap;
use crate::domain::ports::{OrderedUnitsQuery, OrderedUnitsSource};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Fixed totals, typically an `[source.ordered]` table from the agreement
/// file. The date range is ignored since the totals are already aggregated.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderedUnits {
    totals: OrderedUnitsMap,
}

impl InMemoryOrderedUnits {
    pub fn new(totals: OrderedUnitsMap) -> Self {
        Self { totals }
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            totals: pairs.into_iter().map(|(id, qty)| (id.into(), qty)).collect(),
        }
    }
}

#[async_trait]
impl OrderedUnitsSource for InMemoryOrderedUnits {
    async fn ordered_units_by_article(&self, query: &OrderedUnitsQuery) -> Result<OrderedUnitsMap> {
        Ok(query
            .article_ids
            .iter()
            .filter_map(|id| self.totals.get(id).map(|qty| (id.clone(), *qty)))
            .collect())
    }
}
