use crate::domain::model::{ArticleRef, OrderedUnitsMap};
use crate::domain::numeric::finite_or_zero;

/// Sums purchased quantities of the agreement's articles, converted to tier
/// units. Missing quantities count as zero; an article with a conversion
/// factor of zero or below contributes nothing. A sum that overflows to
/// infinity is treated like any other unusable number and yields zero.
pub fn compute_eligible_tier_units(articles: &[ArticleRef], ordered: &OrderedUnitsMap) -> f64 {
    if articles.is_empty() {
        return 0.0;
    }

    let total: f64 = articles
        .iter()
        .map(|article| {
            let purchased = ordered
                .get(&article.id)
                .copied()
                .map(finite_or_zero)
                .unwrap_or(0.0);
            let factor = finite_or_zero(article.units_per_tier_unit);
            if factor > 0.0 {
                purchased / factor
            } else {
                0.0
            }
        })
        .sum();

    finite_or_zero(total)
}
