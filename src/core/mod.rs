pub mod eligibility;
pub mod engine;
pub mod progress;
pub mod rebate;
pub mod tiers;

pub use crate::domain::model::{
    ArticleRef, DateRange, OrderedUnitsMap, RawTier, RebateAgreement, SettlementMethod, Tier,
    TierProgress,
};
pub use crate::domain::ports::{OrderedUnitsQuery, OrderedUnitsSource};
pub use crate::utils::error::Result;
