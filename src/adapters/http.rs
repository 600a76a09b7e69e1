use crate::domain::model::OrderedUnitsMap;
use crate::domain::numeric::coerce_number;
use crate::domain::ports::{OrderedUnitsQuery, OrderedUnitsSource};
use crate::utils::error::{RebateError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Client for the order-aggregation service.
///
/// `GET {endpoint}?articleIds=A,B&start=2024-01-01&end=2024-03-31` answering
/// `{"A": 120, "B": "50"}`.
#[derive(Debug, Clone)]
pub struct HttpOrderedUnits {
    endpoint: String,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
    client: Client,
}

impl HttpOrderedUnits {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: HashMap::new(),
            timeout: None,
            client: Client::new(),
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout = Some(Duration::from_secs(seconds));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl OrderedUnitsSource for HttpOrderedUnits {
    async fn ordered_units_by_article(&self, query: &OrderedUnitsQuery) -> Result<OrderedUnitsMap> {
        // 構建請求
        let mut request = self.client.get(&self.endpoint).query(&[
            ("articleIds", query.article_ids.join(",")),
            ("start", query.start.format("%Y-%m-%d").to_string()),
            ("end", query.end.format("%Y-%m-%d").to_string()),
        ]);

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!(
            "Requesting ordered units for {} articles from {}",
            query.article_ids.len(),
            self.endpoint
        );
        let response = request.send().await?;
        tracing::debug!("Aggregation response status: {}", response.status());

        if !response.status().is_success() {
            return Err(RebateError::SourceError {
                message: format!("Aggregation request failed with status: {}", response.status()),
            });
        }

        let json_data: serde_json::Value = response.json().await?;
        let serde_json::Value::Object(entries) = json_data else {
            return Err(RebateError::SourceError {
                message: "Aggregation response is not a JSON object".to_string(),
            });
        };

        Ok(entries
            .iter()
            .map(|(id, qty)| (id.clone(), coerce_number(Some(qty))))
            .collect())
    }
}
