use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for stored prices (`NUMERIC(12, 2)`).
pub const PRICE_SCALE: u32 = 2;

/// One variant's pricing as seen by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePoint {
    pub price: Option<Decimal>,
    pub compare_at: Option<Decimal>,
    pub available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub price: Decimal,
    pub original_price: Option<Decimal>,
}

/// Parses a display price such as `"29.99"`, `"$1,299.00"` or `"USD 15"`.
#[must_use]
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Resolves the listing price of a product from its variants.
///
/// `price` is the minimum price over available variants, or over all
/// variants when none is available. `original_price` is the maximum
/// compare-at price across all variants that is strictly greater than
/// `price`. Prices are rounded to [`PRICE_SCALE`] first, so a value that
/// rounds to zero counts as missing. Returns `None` when no positive price
/// exists.
#[must_use]
pub fn resolve_price(points: &[PricePoint]) -> Option<ResolvedPrice> {
    let min_over = |only_available: bool| {
        points
            .iter()
            .filter(|p| !only_available || p.available)
            .filter_map(|p| p.price.map(to_stored_scale))
            .filter(|price| *price > Decimal::ZERO)
            .min()
    };

    let price = min_over(true).or_else(|| min_over(false))?;
    let original_price = points
        .iter()
        .filter_map(|p| p.compare_at.map(to_stored_scale))
        .filter(|compare_at| *compare_at > price)
        .max();

    Some(ResolvedPrice {
        price,
        original_price,
    })
}

/// Rounds half away from zero, matching how Postgres stores `NUMERIC`.
fn to_stored_scale(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
