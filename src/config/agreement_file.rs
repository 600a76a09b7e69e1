use crate::adapters::{CsvOrderedUnits, HttpOrderedUnits, InMemoryOrderedUnits};
use crate::core::tiers::coerce_tier;
use crate::domain::model::{
    AgreementScope, ArticleRef, DateRange, OrderedUnitsMap, RawTier, RebateAgreement,
    SettlementMethod,
};
use crate::domain::numeric::{coerce_number, deserialize_lenient_f64, is_numeric_like};
use crate::domain::ports::OrderedUnitsSource;
use crate::utils::error::{RebateError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A rebate agreement as stored on disk (TOML).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementFile {
    pub agreement: AgreementSection,
    #[serde(default)]
    pub articles: Vec<ArticleRef>,
    #[serde(default)]
    pub tiers: Vec<RawTier>,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
    pub period: Option<PeriodConfig>,
    pub source: Option<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementSection {
    pub name: String,
    pub vendor: Option<String>,
    pub method: String,
    /// `articles` (default) or `brand`.
    pub scope: Option<String>,
    pub brand: Option<String>,
}

/// Article master data used to resolve brand-scoped agreements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub brand: String,
    #[serde(
        default = "default_units_per_tier_unit",
        alias = "unitsPerTierUnit",
        deserialize_with = "deserialize_lenient_f64"
    )]
    pub units_per_tier_unit: f64,
}

fn default_units_per_tier_unit() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodConfig {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// `csv`, `http` or `inline`.
    pub r#type: String,
    pub path: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
    pub ordered: Option<HashMap<String, serde_json::Value>>,
}

impl AgreementFile {
    /// 從 TOML 檔案載入協議
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RebateError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析協議
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RebateError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${AGGREGATION_TOKEN})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RebateError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn method(&self) -> Result<SettlementMethod> {
        self.agreement
            .method
            .parse()
            .map_err(|reason| RebateError::InvalidConfigValueError {
                field: "agreement.method".to_string(),
                value: self.agreement.method.clone(),
                reason,
            })
    }

    pub fn scope(&self) -> Result<AgreementScope> {
        match self
            .agreement
            .scope
            .as_deref()
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("articles") => Ok(AgreementScope::Articles),
            Some("brand") => {
                let brand = validation::validate_required_field("agreement.brand", &self.agreement.brand)?;
                validation::validate_non_empty_string("agreement.brand", brand)?;
                Ok(AgreementScope::Brand(brand.trim().to_string()))
            }
            Some(other) => Err(RebateError::InvalidConfigValueError {
                field: "agreement.scope".to_string(),
                value: other.to_string(),
                reason: "Scope must be 'articles' or 'brand'".to_string(),
            }),
        }
    }

    /// The concrete article list the engine works on. Brand agreements pull
    /// every catalog article of that brand; explicit `[[articles]]` entries
    /// override catalog factors for the same id.
    pub fn resolve_articles(&self) -> Result<Vec<ArticleRef>> {
        match self.scope()? {
            AgreementScope::Articles => Ok(self.articles.clone()),
            AgreementScope::Brand(brand) => {
                let explicit: HashMap<&str, &ArticleRef> =
                    self.articles.iter().map(|a| (a.id.as_str(), a)).collect();

                // 同一 id 在型錄出現多次時只取第一筆，避免重複計算採購量
                let mut seen: HashSet<String> = HashSet::new();
                let mut resolved: Vec<ArticleRef> = self
                    .catalog
                    .iter()
                    .filter(|entry| entry.brand.trim().eq_ignore_ascii_case(&brand))
                    .filter(|entry| seen.insert(entry.id.clone()))
                    .map(|entry| match explicit.get(entry.id.as_str()) {
                        Some(article) => (*article).clone(),
                        None => ArticleRef::new(entry.id.clone(), entry.units_per_tier_unit),
                    })
                    .collect();

                for article in &self.articles {
                    if seen.insert(article.id.clone()) {
                        resolved.push(article.clone());
                    }
                }

                tracing::debug!("Brand '{}' resolved to {} articles", brand, resolved.len());
                Ok(resolved)
            }
        }
    }

    pub fn period(&self) -> Result<Option<DateRange>> {
        let Some(period) = &self.period else {
            return Ok(None);
        };
        let range = DateRange::new(
            validation::validate_date("period.start", &period.start)?,
            validation::validate_date("period.end", &period.end)?,
        );
        if !range.is_valid() {
            return Err(RebateError::InvalidConfigValueError {
                field: "period".to_string(),
                value: range.to_string(),
                reason: "Start date must not be after end date".to_string(),
            });
        }
        Ok(Some(range))
    }

    pub fn into_agreement(&self) -> Result<RebateAgreement> {
        Ok(RebateAgreement {
            name: self.agreement.name.clone(),
            articles: self.resolve_articles()?,
            tiers: self.tiers.clone(),
            method: self.method()?,
        })
    }

    /// Problems the engine tolerates by defaulting values to zero. Reported
    /// so that whoever maintains the agreement can fix them.
    pub fn advisories(&self) -> Vec<String> {
        let mut notes = Vec::new();

        if self.tiers.is_empty() {
            notes.push("Agreement has no tiers; rebate will be 0".to_string());
        }

        for (i, raw) in self.tiers.iter().enumerate() {
            for (field, value) in [("from", &raw.from), ("rebate", &raw.rebate)] {
                match value {
                    Some(v) if is_numeric_like(v) => {}
                    Some(v) => notes.push(format!("tiers[{}].{} = {} is not a number, using 0", i, field, v)),
                    None => notes.push(format!("tiers[{}].{} is missing, using 0", i, field)),
                }
            }
            if let Some(to) = &raw.to {
                let blank = to.is_null() || to.as_str().is_some_and(|s| s.trim().is_empty());
                if !blank && !is_numeric_like(to) {
                    notes.push(format!("tiers[{}].to = {} is not a number, using 0", i, to));
                }
            }
        }

        let mut coerced: Vec<_> = self.tiers.iter().map(coerce_tier).collect();
        coerced.sort_by(|a, b| a.from.total_cmp(&b.from));
        for pair in coerced.windows(2) {
            if let Some(to) = pair[0].to {
                if pair[1].from < to {
                    notes.push(format!(
                        "Tier starting at {} overlaps the tier ending at {}; its start will be shifted",
                        pair[1].from, to
                    ));
                }
            }
        }

        if let Ok(AgreementScope::Brand(brand)) = self.scope() {
            let mut catalog_ids = HashSet::new();
            for entry in &self.catalog {
                if entry.brand.trim().eq_ignore_ascii_case(&brand)
                    && !catalog_ids.insert(entry.id.as_str())
                {
                    notes.push(format!(
                        "Catalog lists article {} more than once for brand '{}'; using the first entry",
                        entry.id, brand
                    ));
                }
            }
        }

        let articles = self.resolve_articles().unwrap_or_else(|_| self.articles.clone());
        for article in &articles {
            let factor = article.units_per_tier_unit;
            if factor.is_nan() || factor <= 0.0 {
                notes.push(format!(
                    "Article {} has no positive units_per_tier_unit and will not count",
                    article.id
                ));
            }
        }

        notes
    }

    /// Builds the ordered-units collaborator described by `[source]`.
    pub fn build_source(&self) -> Result<Box<dyn OrderedUnitsSource>> {
        let source = validation::validate_required_field("source", &self.source)?;
        source.build()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("agreement.name", &self.agreement.name)?;
        self.method()?;
        self.scope()?;

        let mut ids = HashSet::new();
        for article in &self.articles {
            validation::validate_non_empty_string("articles.id", &article.id)?;
            if !ids.insert(article.id.as_str()) {
                return Err(RebateError::InvalidConfigValueError {
                    field: "articles.id".to_string(),
                    value: article.id.clone(),
                    reason: "Duplicate article id".to_string(),
                });
            }
        }

        if let AgreementScope::Brand(brand) = self.scope()? {
            if self.resolve_articles()?.is_empty() {
                return Err(RebateError::ConfigValidationError {
                    field: "catalog".to_string(),
                    message: format!("No catalog articles found for brand '{}'", brand),
                });
            }
        }

        self.period()?;

        if let Some(source) = &self.source {
            source.validate()?;
        }

        Ok(())
    }
}

impl Validate for AgreementFile {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

impl SourceConfig {
    pub fn build(&self) -> Result<Box<dyn OrderedUnitsSource>> {
        self.validate()?;
        match self.r#type.as_str() {
            "csv" => {
                let path = validation::validate_required_field("source.path", &self.path)?;
                Ok(Box::new(CsvOrderedUnits::new(path)))
            }
            "http" => {
                let endpoint = validation::validate_required_field("source.endpoint", &self.endpoint)?;
                let mut client = HttpOrderedUnits::new(endpoint.clone())
                    .with_headers(self.headers.clone().unwrap_or_default());
                if let Some(timeout) = self.timeout_seconds {
                    client = client.with_timeout_seconds(timeout);
                }
                Ok(Box::new(client))
            }
            _ => {
                let ordered = validation::validate_required_field("source.ordered", &self.ordered)?;
                let totals: OrderedUnitsMap = ordered
                    .iter()
                    .map(|(id, qty)| (id.clone(), coerce_number(Some(qty))))
                    .collect();
                Ok(Box::new(InMemoryOrderedUnits::new(totals)))
            }
        }
    }
}

impl Validate for SourceConfig {
    fn validate(&self) -> Result<()> {
        match self.r#type.as_str() {
            "csv" => {
                let path = validation::validate_required_field("source.path", &self.path)?;
                validation::validate_path("source.path", path)?;
                validation::validate_file_extensions("source.path", std::slice::from_ref(path), &["csv"])
            }
            "http" => {
                let endpoint = validation::validate_required_field("source.endpoint", &self.endpoint)?;
                validation::validate_url("source.endpoint", endpoint)?;
                if let Some(timeout) = self.timeout_seconds {
                    validation::validate_positive_number("source.timeout_seconds", timeout, 1)?;
                }
                Ok(())
            }
            "inline" => validation::validate_required_field("source.ordered", &self.ordered).map(|_| ()),
            other => Err(RebateError::InvalidConfigValueError {
                field: "source.type".to_string(),
                value: other.to_string(),
                reason: "Supported source types: csv, http, inline".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::eligibility::compute_eligible_tier_units;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[agreement]
name = "Draught beer 2024"
vendor = "Northern Brewing"
method = "incremental"

[[articles]]
id = "KEG-30"
units_per_tier_unit = 1

[[articles]]
id = "BTL-33"
units_per_tier_unit = "24"

[[tiers]]
threshold = 0
to = 100
rate = 2.5

[[tiers]]
from = "100"
to = ""
rebate = 4

[period]
start = "2024-01-01"
end = "2024-12-31"

[source]
type = "inline"

[source.ordered]
KEG-30 = 80
BTL-33 = "480"
"#;

    #[test]
    fn test_parse_basic_agreement() {
        let file = AgreementFile::from_toml_str(BASIC).unwrap();
        assert!(file.validate().is_ok());

        let agreement = file.into_agreement().unwrap();
        assert_eq!(agreement.name, "Draught beer 2024");
        assert_eq!(agreement.method, SettlementMethod::Incremental);
        assert_eq!(agreement.articles[1].units_per_tier_unit, 24.0);
        assert_eq!(agreement.tiers.len(), 2);
        assert_eq!(
            file.period().unwrap().unwrap().start.to_string(),
            "2024-01-01"
        );
        assert!(file.advisories().is_empty());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("REBATE_TEST_ENDPOINT", "https://aggregation.example.com/units");

        let content = r#"
[agreement]
name = "Coffee"
method = "RETROACTIVE"

[source]
type = "http"
endpoint = "${REBATE_TEST_ENDPOINT}"
"#;

        let file = AgreementFile::from_toml_str(content).unwrap();
        assert_eq!(
            file.source.as_ref().unwrap().endpoint.as_deref(),
            Some("https://aggregation.example.com/units")
        );
        assert!(file.validate().is_ok());

        std::env::remove_var("REBATE_TEST_ENDPOINT");
    }

    #[test]
    fn test_unknown_method_fails_validation() {
        let content = r#"
[agreement]
name = "Coffee"
method = "flat"
"#;
        let file = AgreementFile::from_toml_str(content).unwrap();
        let err = file.validate().unwrap_err();
        assert!(matches!(err, RebateError::InvalidConfigValueError { ref field, .. } if field == "agreement.method"));
    }

    #[test]
    fn test_reversed_period_fails_validation() {
        let content = r#"
[agreement]
name = "Coffee"
method = "incremental"

[period]
start = "2024-06-30"
end = "2024-01-01"
"#;
        let file = AgreementFile::from_toml_str(content).unwrap();
        assert!(file.validate().is_err());
    }

    #[test]
    fn test_duplicate_article_ids_fail_validation() {
        let content = r#"
[agreement]
name = "Coffee"
method = "incremental"

[[articles]]
id = "A"
units_per_tier_unit = 1

[[articles]]
id = "A"
units_per_tier_unit = 2
"#;
        let file = AgreementFile::from_toml_str(content).unwrap();
        assert!(file.validate().is_err());
    }

    #[test]
    fn test_brand_scope_resolves_from_catalog() {
        let content = r#"
[agreement]
name = "Northern Brewing range"
method = "retroactive"
scope = "brand"
brand = "northern brewing"

[[articles]]
id = "BTL-33"
units_per_tier_unit = 12

[[articles]]
id = "PROMO-1"
units_per_tier_unit = 1

[[catalog]]
id = "KEG-30"
brand = "Northern Brewing"

[[catalog]]
id = "BTL-33"
brand = "Northern Brewing "
units_per_tier_unit = 24

[[catalog]]
id = "COLA-1"
brand = "Fizz"
units_per_tier_unit = 6
"#;
        let file = AgreementFile::from_toml_str(content).unwrap();
        assert!(file.validate().is_ok());

        let articles = file.resolve_articles().unwrap();
        assert_eq!(
            articles,
            vec![
                ArticleRef::new("KEG-30", 1.0),
                ArticleRef::new("BTL-33", 12.0),
                ArticleRef::new("PROMO-1", 1.0),
            ]
        );
    }

    #[test]
    fn test_brand_scope_counts_duplicate_catalog_rows_once() {
        let content = r#"
[agreement]
name = "Northern Brewing kegs"
method = "incremental"
scope = "brand"
brand = "Northern Brewing"

[[catalog]]
id = "KEG-30"
brand = "Northern Brewing"
units_per_tier_unit = 1

[[catalog]]
id = "KEG-30"
brand = "northern brewing"
units_per_tier_unit = 1

[[tiers]]
from = 0
rebate = 1
"#;
        let file = AgreementFile::from_toml_str(content).unwrap();
        assert!(file.validate().is_ok());

        let articles = file.resolve_articles().unwrap();
        assert_eq!(articles, vec![ArticleRef::new("KEG-30", 1.0)]);

        let ordered: OrderedUnitsMap = [("KEG-30".to_string(), 100.0)].into_iter().collect();
        assert_eq!(compute_eligible_tier_units(&articles, &ordered), 100.0);

        assert!(file
            .advisories()
            .iter()
            .any(|note| note.contains("KEG-30 more than once")));
    }

    #[test]
    fn test_advisories_cover_catalog_factors() {
        let content = r#"
[agreement]
name = "Fizz range"
method = "retroactive"
scope = "brand"
brand = "Fizz"

[[catalog]]
id = "COLA-1"
brand = "Fizz"
units_per_tier_unit = 0

[[catalog]]
id = "COLA-2"
brand = "Fizz"
units_per_tier_unit = 6

[[tiers]]
from = 0
rebate = 1
"#;
        let file = AgreementFile::from_toml_str(content).unwrap();
        let notes = file.advisories();

        assert!(notes.iter().any(|note| note.contains("Article COLA-1")));
        assert!(!notes.iter().any(|note| note.contains("Article COLA-2")));
    }

    #[test]
    fn test_brand_scope_without_matches_fails_validation() {
        let content = r#"
[agreement]
name = "Ghost brand"
method = "retroactive"
scope = "brand"
brand = "Nobody"

[[catalog]]
id = "COLA-1"
brand = "Fizz"
"#;
        let file = AgreementFile::from_toml_str(content).unwrap();
        assert!(matches!(
            file.validate(),
            Err(RebateError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_brand_scope_requires_brand() {
        let content = r#"
[agreement]
name = "Brandless"
method = "retroactive"
scope = "brand"
"#;
        let file = AgreementFile::from_toml_str(content).unwrap();
        assert!(matches!(
            file.validate(),
            Err(RebateError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_advisories_report_defaulted_values() {
        let content = r#"
[agreement]
name = "Messy"
method = "incremental"

[[articles]]
id = "A"
units_per_tier_unit = 0

[[tiers]]
from = 0
to = 500
rebate = "n/a"

[[tiers]]
from = 300
to = "eight hundred"
rebate = 2
"#;
        let file = AgreementFile::from_toml_str(content).unwrap();
        assert!(file.validate().is_ok());

        let notes = file.advisories();
        assert!(notes.iter().any(|n| n.contains("tiers[0].rebate")));
        assert!(notes.iter().any(|n| n.contains("tiers[1].to")));
        assert!(notes.iter().any(|n| n.contains("Article A")));
    }

    #[test]
    fn test_source_validation() {
        let csv_source = SourceConfig {
            r#type: "csv".to_string(),
            path: Some("orders.xlsx".to_string()),
            endpoint: None,
            timeout_seconds: None,
            headers: None,
            ordered: None,
        };
        assert!(csv_source.validate().is_err());

        let http_source = SourceConfig {
            r#type: "http".to_string(),
            path: None,
            endpoint: Some("https://aggregation.example.com".to_string()),
            timeout_seconds: Some(0),
            headers: None,
            ordered: None,
        };
        assert!(http_source.validate().is_err());

        let unknown = SourceConfig {
            r#type: "ftp".to_string(),
            ..http_source
        };
        assert!(unknown.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let file = AgreementFile::from_file(temp_file.path()).unwrap();
        assert_eq!(file.agreement.vendor.as_deref(), Some("Northern Brewing"));
        assert!(file.build_source().is_ok());
    }
}
