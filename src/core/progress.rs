use crate::core::tiers::{tier_index_for, NormalizedTiers};
use crate::domain::model::TierProgress;
use crate::domain::numeric::finite_or_zero;

pub const NO_TIERS_LABEL: &str = "No tiers";
pub const MAX_TIER_LABEL: &str = "Max tier reached";

/// Where `eligible_tier_units` sits in the schedule and how much is left
/// until the next tier starts.
pub fn next_tier_progress(eligible_tier_units: f64, tiers: &NormalizedTiers) -> TierProgress {
    let value = finite_or_zero(eligible_tier_units);

    let Some(first) = tiers.first() else {
        return TierProgress {
            label: NO_TIERS_LABEL.to_string(),
            percent: 0,
            needed: 0.0,
        };
    };

    if value < first.from {
        let needed = first.from - value;
        return TierProgress {
            label: format!("{} units to reach Tier 1", format_units(needed)),
            percent: to_percent(value / first.from.max(1.0)),
            needed,
        };
    }

    // 落在級距之間的空隙時，以起點不超過目前值的最後一段為準
    let current_index = tier_index_for(value, tiers)
        .or_else(|| tiers.iter().rposition(|tier| tier.from <= value))
        .unwrap_or(0);

    let (Some(current), Some(next)) = (tiers.get(current_index), tiers.get(current_index + 1))
    else {
        return TierProgress {
            label: MAX_TIER_LABEL.to_string(),
            percent: 100,
            needed: 0.0,
        };
    };

    let span = next.from - current.from;
    let progressed = value.min(next.from) - current.from;
    let percent = if span == 0.0 {
        0
    } else {
        to_percent(progressed / span)
    };
    let needed = (next.from - value).max(0.0);

    TierProgress {
        label: format!(
            "Tier {}: {} units to reach Tier {}",
            current_index + 1,
            format_units(needed),
            current_index + 2
        ),
        percent,
        needed,
    }
}

fn to_percent(ratio: f64) -> u8 {
    let percent = (ratio * 100.0).round();
    if percent.is_nan() {
        return 0;
    }
    percent.clamp(0.0, 100.0) as u8
}

/// Two decimals at most, no trailing zeros.
pub fn format_units(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{}", rounded)
    }
}
