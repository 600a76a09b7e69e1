use anyhow::Result;
use chrono::NaiveDate;
use httpmock::prelude::*;
use rebate_engine::{
    ArticleRef, DateRange, HttpOrderedUnits, OrderedUnitsQuery, OrderedUnitsSource, RawTier,
    RebateAgreement, RebateEngine, RebateError, SettlementMethod,
};
use std::collections::HashMap;

fn q1() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    )
}

fn wine_agreement() -> RebateAgreement {
    RebateAgreement {
        name: "House wine".to_string(),
        articles: vec![ArticleRef::new("RED-75", 6.0), ArticleRef::new("WHITE-75", 6.0)],
        tiers: vec![
            RawTier::new(0.0, Some(100.0), 0.5),
            RawTier::new(100.0, None, 1.0),
        ],
        method: SettlementMethod::Incremental,
    }
}

#[tokio::test]
async fn test_http_source_sends_query_and_parses_totals() -> Result<()> {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/ordered-units")
            .query_param("articleIds", "RED-75,WHITE-75")
            .query_param("start", "2024-01-01")
            .query_param("end", "2024-03-31")
            .header("Authorization", "Bearer test-token");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"RED-75": 480, "WHITE-75": "240", "ROSE-75": null}));
    });

    let headers = HashMap::from([("Authorization".to_string(), "Bearer test-token".to_string())]);
    let source = HttpOrderedUnits::new(server.url("/ordered-units"))
        .with_headers(headers)
        .with_timeout_seconds(5);

    let query = OrderedUnitsQuery::new(vec!["RED-75".to_string(), "WHITE-75".to_string()], q1());
    let ordered = source.ordered_units_by_article(&query).await?;

    api_mock.assert();
    assert_eq!(ordered.get("RED-75"), Some(&480.0));
    assert_eq!(ordered.get("WHITE-75"), Some(&240.0));
    assert_eq!(ordered.get("ROSE-75"), Some(&0.0));

    Ok(())
}

#[tokio::test]
async fn test_engine_with_http_source() -> Result<()> {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/ordered-units");
        then.status(200)
            .json_body(serde_json::json!({"RED-75": 600, "WHITE-75": 300}));
    });

    let engine = RebateEngine::new(HttpOrderedUnits::new(server.url("/ordered-units")));
    let report = engine.evaluate(&wine_agreement(), q1()).await?;

    api_mock.assert();
    // 600/6 + 300/6 = 150
    assert_eq!(report.eligible_tier_units, 150.0);
    assert_eq!(report.rebate_total, 100.0 * 0.5 + 50.0 * 1.0);
    assert_eq!(report.alternative_total, 150.0);

    Ok(())
}

#[tokio::test]
async fn test_http_source_error_status() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/ordered-units");
        then.status(503);
    });

    let engine = RebateEngine::new(HttpOrderedUnits::new(server.url("/ordered-units")));
    let err = engine.evaluate(&wine_agreement(), q1()).await.unwrap_err();

    api_mock.assert();
    assert!(matches!(err, RebateError::SourceError { .. }));
    assert_eq!(err.severity(), rebate_engine::utils::error::ErrorSeverity::Medium);
}

#[tokio::test]
async fn test_http_source_rejects_non_object_payload() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/ordered-units");
        then.status(200).json_body(serde_json::json!([480, 240]));
    });

    let source = HttpOrderedUnits::new(server.url("/ordered-units"));
    let query = OrderedUnitsQuery::new(vec!["RED-75".to_string()], q1());
    let result = source.ordered_units_by_article(&query).await;

    assert!(matches!(result, Err(RebateError::SourceError { .. })));
}
