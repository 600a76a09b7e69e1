use crate::config::agreement_file::SourceConfig;
use crate::domain::model::DateRange;
use crate::utils::error::{RebateError, Result};
use crate::utils::validation::{self, Validate};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum OutputFormat {
    Summary,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "rebate-engine")]
#[command(about = "Computes vendor rebates from tiered agreements and ordered quantities")]
pub struct CliConfig {
    /// Path to the agreement TOML file
    #[arg(short, long, default_value = "agreement.toml")]
    pub agreement: String,

    /// First delivery date counted (YYYY-MM-DD), overrides [period].start
    #[arg(long)]
    pub start: Option<String>,

    /// Last delivery date counted (YYYY-MM-DD), overrides [period].end
    #[arg(long)]
    pub end: Option<String>,

    /// Read ordered quantities from an order-lines CSV instead of [source]
    #[arg(long, conflicts_with = "endpoint")]
    pub orders_csv: Option<String>,

    /// Ask this aggregation endpoint for ordered quantities instead of [source]
    #[arg(long)]
    pub endpoint: Option<String>,

    #[arg(long, value_enum, default_value = "summary")]
    pub format: OutputFormat,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Show the normalized tiers and resolved articles without fetching orders
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    /// Command-line dates win over the agreement file's `[period]`.
    pub fn resolve_period(&self, file_period: Option<DateRange>) -> Result<DateRange> {
        let start = match &self.start {
            Some(start) => Some(validation::validate_date("--start", start)?),
            None => file_period.map(|p| p.start),
        };
        let end = match &self.end {
            Some(end) => Some(validation::validate_date("--end", end)?),
            None => file_period.map(|p| p.end),
        };

        let start = validation::validate_required_field("period.start (or --start)", &start)?;
        let end = validation::validate_required_field("period.end (or --end)", &end)?;
        let period = DateRange::new(*start, *end);

        if !period.is_valid() {
            return Err(RebateError::InvalidConfigValueError {
                field: "period".to_string(),
                value: period.to_string(),
                reason: "Start date must not be after end date".to_string(),
            });
        }
        Ok(period)
    }

    pub fn source_override(&self) -> Option<SourceConfig> {
        let base = SourceConfig {
            r#type: String::new(),
            path: None,
            endpoint: None,
            timeout_seconds: None,
            headers: None,
            ordered: None,
        };

        if let Some(path) = &self.orders_csv {
            Some(SourceConfig {
                r#type: "csv".to_string(),
                path: Some(path.clone()),
                ..base
            })
        } else {
            self.endpoint.as_ref().map(|endpoint| SourceConfig {
                r#type: "http".to_string(),
                endpoint: Some(endpoint.clone()),
                ..base
            })
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("--agreement", &self.agreement)?;
        if let Some(start) = &self.start {
            validation::validate_date("--start", start)?;
        }
        if let Some(end) = &self.end {
            validation::validate_date("--end", end)?;
        }
        if let Some(source) = self.source_override() {
            source.validate()?;
        }
        Ok(())
    }
}
