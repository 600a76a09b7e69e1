use crate::core::eligibility::compute_eligible_tier_units;
use crate::core::progress::next_tier_progress;
use crate::core::rebate::compute_rebate_total;
use crate::core::tiers::{normalize_tiers, tier_index_for, NormalizedTiers};
use crate::domain::model::{
    DateRange, OrderedUnitsMap, RebateAgreement, SettlementMethod, TierProgress,
};
use crate::domain::ports::{OrderedUnitsQuery, OrderedUnitsSource};
use crate::utils::error::{RebateError, Result};
use serde::Serialize;

/// Everything a rebate screen needs for one agreement and one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebateReport {
    pub agreement: String,
    pub method: SettlementMethod,
    pub period: Option<DateRange>,
    pub tiers: NormalizedTiers,
    pub ordered: OrderedUnitsMap,
    pub eligible_tier_units: f64,
    /// Index into `tiers`; `None` below the first tier.
    pub current_tier: Option<usize>,
    pub rebate_total: f64,
    /// What the other settlement method would have paid.
    pub alternative_total: f64,
    pub progress: TierProgress,
}

impl RebateReport {
    /// Runs the whole calculation chain on data the caller already has.
    pub fn compute(agreement: &RebateAgreement, ordered: &OrderedUnitsMap) -> Self {
        let tiers = normalize_tiers(&agreement.tiers);
        let eligible_tier_units = compute_eligible_tier_units(&agreement.articles, ordered);

        Self {
            agreement: agreement.name.clone(),
            method: agreement.method,
            period: None,
            current_tier: tier_index_for(eligible_tier_units, &tiers),
            rebate_total: compute_rebate_total(eligible_tier_units, &tiers, agreement.method),
            alternative_total: compute_rebate_total(
                eligible_tier_units,
                &tiers,
                agreement.method.alternative(),
            ),
            progress: next_tier_progress(eligible_tier_units, &tiers),
            ordered: ordered.clone(),
            eligible_tier_units,
            tiers,
        }
    }

    pub fn with_period(mut self, period: DateRange) -> Self {
        self.period = Some(period);
        self
    }
}

/// Fetches ordered quantities from the aggregation collaborator and runs the
/// calculation chain on them.
pub struct RebateEngine<S: OrderedUnitsSource> {
    source: S,
}

impl<S: OrderedUnitsSource> RebateEngine<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn evaluate(
        &self,
        agreement: &RebateAgreement,
        period: DateRange,
    ) -> Result<RebateReport> {
        if !period.is_valid() {
            return Err(RebateError::InvalidConfigValueError {
                field: "period".to_string(),
                value: period.to_string(),
                reason: "Start date must not be after end date".to_string(),
            });
        }

        tracing::info!(
            "Evaluating agreement '{}' ({}) for {}",
            agreement.name,
            agreement.method,
            period
        );

        let ordered = if agreement.articles.is_empty() {
            // 沒有品項就不必呼叫聚合服務
            tracing::warn!("Agreement '{}' has no articles", agreement.name);
            OrderedUnitsMap::new()
        } else {
            let query = OrderedUnitsQuery::new(agreement.article_ids(), period);
            let ordered = self.source.ordered_units_by_article(&query).await?;
            tracing::debug!("Ordered units for {} articles: {:?}", query.article_ids.len(), ordered);
            ordered
        };

        let report = RebateReport::compute(agreement, &ordered).with_period(period);

        tracing::info!(
            "Eligible tier units: {:.2}, rebate total: {:.2} ({})",
            report.eligible_tier_units,
            report.rebate_total,
            report.progress.label
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryOrderedUnits;
    use crate::domain::model::{ArticleRef, RawTier};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn agreement(method: SettlementMethod) -> RebateAgreement {
        RebateAgreement {
            name: "House wine".to_string(),
            articles: vec![ArticleRef::new("A", 10.0), ArticleRef::new("B", 5.0)],
            tiers: vec![
                RawTier::new(3000.0, None, 3.0),
                RawTier::new(0.0, Some(1000.0), 1.0),
                RawTier::new(1000.0, Some(3000.0), 2.0),
            ],
            method,
        }
    }

    fn q1() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
    }

    struct FailingSource;

    #[async_trait]
    impl OrderedUnitsSource for FailingSource {
        async fn ordered_units_by_article(&self, _query: &OrderedUnitsQuery) -> Result<OrderedUnitsMap> {
            Err(RebateError::SourceError {
                message: "aggregation offline".to_string(),
            })
        }
    }

    struct CountingSource(AtomicUsize);

    #[async_trait]
    impl OrderedUnitsSource for CountingSource {
        async fn ordered_units_by_article(&self, _query: &OrderedUnitsQuery) -> Result<OrderedUnitsMap> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(OrderedUnitsMap::new())
        }
    }

    #[test]
    fn test_report_compute_runs_whole_chain() {
        let ordered: OrderedUnitsMap =
            [("A".to_string(), 20_000.0), ("B".to_string(), 2_500.0)].into_iter().collect();
        let report = RebateReport::compute(&agreement(SettlementMethod::Incremental), &ordered);

        assert_eq!(report.eligible_tier_units, 2500.0);
        assert_eq!(report.current_tier, Some(1));
        assert_eq!(report.rebate_total, 4000.0);
        assert_eq!(report.alternative_total, 5000.0);
        assert_eq!(report.progress.needed, 500.0);
        assert_eq!(report.tiers.len(), 3);
        assert_eq!(report.period, None);
    }

    #[test]
    fn test_report_stays_consistent_when_conversion_overflows() {
        let mut overflowing = agreement(SettlementMethod::Incremental);
        overflowing.articles = vec![ArticleRef::new("A", 1e-308)];
        overflowing.tiers = vec![
            RawTier::new(0.0, Some(10.0), 1.0),
            RawTier::new(10.0, None, 0.0),
        ];
        let ordered: OrderedUnitsMap = [("A".to_string(), 100.0)].into_iter().collect();

        let report = RebateReport::compute(&overflowing, &ordered);

        assert_eq!(report.eligible_tier_units, 0.0);
        assert_eq!(report.current_tier, Some(0));
        assert_eq!(report.rebate_total, 0.0);
        assert_eq!(report.alternative_total, 0.0);
        assert_eq!(report.progress.label, "Tier 1: 10 units to reach Tier 2");
    }

    #[tokio::test]
    async fn test_evaluate_queries_source_for_agreement_articles() {
        let source = InMemoryOrderedUnits::from_pairs([("A", 30_000.0), ("B", 2_500.0), ("X", 1e6)]);
        let engine = RebateEngine::new(source);

        let report = engine
            .evaluate(&agreement(SettlementMethod::Retroactive), q1())
            .await
            .unwrap();

        assert_eq!(report.eligible_tier_units, 3500.0);
        assert_eq!(report.rebate_total, 10500.0);
        assert_eq!(report.alternative_total, 6500.0);
        assert_eq!(report.period, Some(q1()));
        assert!(!report.ordered.contains_key("X"));
    }

    #[tokio::test]
    async fn test_evaluate_propagates_source_failure() {
        let engine = RebateEngine::new(FailingSource);
        let err = engine
            .evaluate(&agreement(SettlementMethod::Retroactive), q1())
            .await
            .unwrap_err();
        assert!(matches!(err, RebateError::SourceError { .. }));
    }

    #[tokio::test]
    async fn test_evaluate_rejects_reversed_period() {
        let engine = RebateEngine::new(InMemoryOrderedUnits::default());
        let reversed = DateRange::new(q1().end, q1().start);
        let result = engine
            .evaluate(&agreement(SettlementMethod::Retroactive), reversed)
            .await;
        assert!(matches!(result, Err(RebateError::InvalidConfigValueError { .. })));
    }

    #[tokio::test]
    async fn test_evaluate_skips_source_without_articles() {
        let engine = RebateEngine::new(CountingSource(AtomicUsize::new(0)));
        let mut empty = agreement(SettlementMethod::Incremental);
        empty.articles.clear();

        let report = engine.evaluate(&empty, q1()).await.unwrap();

        assert_eq!(engine.source().0.load(Ordering::SeqCst), 0);
        assert_eq!(report.eligible_tier_units, 0.0);
        assert_eq!(report.rebate_total, 0.0);
        assert_eq!(report.progress.label, "Tier 1: 1000 units to reach Tier 2");
    }
}
