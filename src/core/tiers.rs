use crate::domain::model::{RawTier, Tier};
use crate::domain::numeric::{coerce_bound, coerce_number};
use serde::Serialize;

/// A tier schedule that went through [`normalize_tiers`]: sorted by `from`,
/// contiguous, non-overlapping, and only the last tier may be open-ended.
///
/// There is no other way to build one, so the calculators can rely on the
/// ordering without re-checking it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedTiers(Vec<Tier>);

impl NormalizedTiers {
    /// Normalizes already-coerced tiers.
    pub fn from_tiers(mut tiers: Vec<Tier>) -> Self {
        tiers.sort_by(|a, b| a.from.total_cmp(&b.from));

        let mut normalized: Vec<Tier> = Vec::with_capacity(tiers.len());
        for mut current in tiers {
            if let Some(previous) = normalized.last_mut() {
                match previous.to {
                    None => {
                        // 前一段無上限，用目前這段的起點把它關起來
                        previous.to = Some(previous.from.max(current.from));
                    }
                    Some(previous_to) if current.from < previous_to => {
                        tracing::debug!(
                            "Tier starting at {} overlaps previous tier, shifted to {}",
                            current.from,
                            previous_to
                        );
                        current.from = previous_to;
                    }
                    Some(_) => {}
                }
            }
            normalized.push(current);
        }

        let last = normalized.len().saturating_sub(1);
        for i in 0..last {
            if normalized[i].to.is_none() {
                normalized[i].to = Some(normalized[i + 1].from);
            }
        }

        Self(normalized)
    }

    pub fn as_slice(&self) -> &[Tier] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tier> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tier> {
        self.0.get(index)
    }

    pub fn first(&self) -> Option<&Tier> {
        self.0.first()
    }

    pub fn into_vec(self) -> Vec<Tier> {
        self.0
    }
}

impl<'a> IntoIterator for &'a NormalizedTiers {
    type Item = &'a Tier;
    type IntoIter = std::slice::Iter<'a, Tier>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Coerces one raw record. Missing or invalid numbers become `0`, a blank
/// upper bound becomes open-ended.
pub fn coerce_tier(raw: &RawTier) -> Tier {
    Tier {
        from: coerce_number(raw.from.as_ref()),
        to: coerce_bound(raw.to.as_ref()),
        rebate: coerce_number(raw.rebate.as_ref()),
    }
}

/// Turns a user-entered tier list into a sorted, contiguous schedule.
/// Never fails; an empty list gives an empty schedule.
pub fn normalize_tiers(raw_tiers: &[RawTier]) -> NormalizedTiers {
    NormalizedTiers::from_tiers(raw_tiers.iter().map(coerce_tier).collect())
}

/// Index of the tier whose `[from, to)` range holds `value`.
pub fn tier_index_for(value: f64, tiers: &NormalizedTiers) -> Option<usize> {
    tiers.iter().position(|tier| tier.contains(value))
}
