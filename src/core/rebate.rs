use crate::core::tiers::{tier_index_for, NormalizedTiers};
use crate::domain::model::SettlementMethod;
use crate::domain::numeric::finite_or_zero;

/// Total rebate owed for `eligible_tier_units` under the given settlement
/// method. Zero when there are no tiers or nothing was purchased; NaN and
/// infinite volumes count as nothing purchased.
pub fn compute_rebate_total(
    eligible_tier_units: f64,
    tiers: &NormalizedTiers,
    method: SettlementMethod,
) -> f64 {
    let units = finite_or_zero(eligible_tier_units);
    if tiers.is_empty() || units <= 0.0 {
        return 0.0;
    }

    match method {
        SettlementMethod::Retroactive => retroactive_total(units, tiers),
        SettlementMethod::Incremental => incremental_total(units, tiers),
    }
}

/// Whole volume at the rate of the tier it reached. Below the first tier
/// nothing is owed.
fn retroactive_total(units: f64, tiers: &NormalizedTiers) -> f64 {
    tier_index_for(units, tiers)
        .and_then(|index| tiers.get(index))
        .map_or(0.0, |tier| units * tier.rebate)
}

/// Marginal rates: each tier pays on the slice of volume inside it.
fn incremental_total(units: f64, tiers: &NormalizedTiers) -> f64 {
    let mut total = 0.0;

    for tier in tiers {
        let upper = tier.to.unwrap_or(units);
        // min/max 而不是 f64::clamp，上下界顛倒時 clamp 會 panic
        let segment = units.max(tier.from).min(upper) - tier.from;
        if segment > 0.0 {
            total += segment * tier.rebate;
        }

        match tier.to {
            None => break,
            Some(to) if units < to => break,
            Some(_) => {}
        }
    }

    total
}
