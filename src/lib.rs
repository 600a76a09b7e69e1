pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, OutputFormat};

pub use adapters::{CsvOrderedUnits, HttpOrderedUnits, InMemoryOrderedUnits};
pub use config::AgreementFile;
pub use crate::core::{
    eligibility::compute_eligible_tier_units,
    engine::{RebateEngine, RebateReport},
    progress::next_tier_progress,
    rebate::compute_rebate_total,
    tiers::{normalize_tiers, tier_index_for, NormalizedTiers},
};
pub use domain::model::{
    ArticleRef, DateRange, OrderedUnitsMap, RawTier, RebateAgreement, SettlementMethod, Tier,
    TierProgress,
};
pub use domain::ports::{OrderedUnitsQuery, OrderedUnitsSource};
pub use utils::error::{RebateError, Result};
