use crate::domain::numeric::deserialize_lenient_f64;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Purchased quantity per article id, as reported by the aggregation service.
pub type OrderedUnitsMap = HashMap<String, f64>;

/// A tier definition as entered by a user, before normalization.
///
/// Values are kept loosely typed; `threshold` and `rate` are accepted as
/// legacy names for `from` and `rebate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTier {
    #[serde(default, alias = "threshold", skip_serializing_if = "Option::is_none")]
    pub from: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Value>,
    #[serde(default, alias = "rate", skip_serializing_if = "Option::is_none")]
    pub rebate: Option<Value>,
}

impl RawTier {
    pub fn new(from: f64, to: Option<f64>, rebate: f64) -> Self {
        Self {
            from: Some(Value::from(from)),
            to: to.map(Value::from),
            rebate: Some(Value::from(rebate)),
        }
    }
}

impl From<Tier> for RawTier {
    fn from(tier: Tier) -> Self {
        RawTier::new(tier.from, tier.to, tier.rebate)
    }
}

/// One range of a tier schedule: `[from, to)` in tier units, `to == None`
/// meaning unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub from: f64,
    pub to: Option<f64>,
    pub rebate: f64,
}

impl Tier {
    pub fn is_open_ended(&self) -> bool {
        self.to.is_none()
    }

    /// Lower bound inclusive, upper bound exclusive.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.from && self.to.map_or(true, |to| value < to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementMethod {
    /// Whole volume at the rate of the tier reached.
    Retroactive,
    /// Each tier's rate on the volume inside that tier.
    Incremental,
}

impl SettlementMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementMethod::Retroactive => "RETROACTIVE",
            SettlementMethod::Incremental => "INCREMENTAL",
        }
    }

    pub fn alternative(&self) -> Self {
        match self {
            SettlementMethod::Retroactive => SettlementMethod::Incremental,
            SettlementMethod::Incremental => SettlementMethod::Retroactive,
        }
    }
}

impl fmt::Display for SettlementMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettlementMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RETROACTIVE" => Ok(SettlementMethod::Retroactive),
            "INCREMENTAL" => Ok(SettlementMethod::Incremental),
            other => Err(format!("Unknown settlement method: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub id: String,
    /// Purchased units that make up one tier unit.
    #[serde(
        default,
        alias = "unitsPerTierUnit",
        deserialize_with = "deserialize_lenient_f64"
    )]
    pub units_per_tier_unit: f64,
}

impl ArticleRef {
    pub fn new(id: impl Into<String>, units_per_tier_unit: f64) -> Self {
        Self {
            id: id.into(),
            units_per_tier_unit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "brand", rename_all = "lowercase")]
pub enum AgreementScope {
    Articles,
    Brand(String),
}

/// A vendor rebate agreement with its article list already resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebateAgreement {
    #[serde(default)]
    pub name: String,
    pub articles: Vec<ArticleRef>,
    pub tiers: Vec<RawTier>,
    pub method: SettlementMethod,
}

impl RebateAgreement {
    pub fn article_ids(&self) -> Vec<String> {
        self.articles.iter().map(|a| a.id.clone()).collect()
    }
}

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

/// Progress toward the next tier, ready for a progress bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierProgress {
    pub label: String,
    /// Rounded, always within `0..=100`.
    pub percent: u8,
    pub needed: f64,
}
