//! Prize weighting algorithm.
//!
//! Two-level draw over the prizes that are currently available in a campaign:
//! the jackpot tier is paced against the campaign-wide number of remaining
//! redemptions, everything else is a plain weighted pick over raw weights.

use crate::entities::prize_entity as prizes;
use crate::error::{AppError, AppResult};
use rand::Rng;

/// Source of uniform values in `[0, 1)`.
pub trait UnitSource {
    fn next_unit(&mut self) -> f64;
}

/// Adapts any `rand::Rng` into a [`UnitSource`].
pub struct RngSource<R>(pub R);

impl<R: Rng> UnitSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.gen_range(0.0..1.0)
    }
}

/// Probability of drawing from the jackpot tier: `min(1, stock / redemptions)`.
///
/// Returns `None` when pacing does not apply (no jackpot stock or no remaining
/// redemptions), in which case the caller draws from the full set.
pub fn jackpot_probability(remaining_jackpot_stock: i64, remaining_redemptions: i64) -> Option<f64> {
    if remaining_jackpot_stock <= 0 || remaining_redemptions <= 0 {
        return None;
    }
    Some((remaining_jackpot_stock as f64 / remaining_redemptions as f64).min(1.0))
}

/// Draw exactly one prize from `available`.
///
/// `available` is expected to hold only active prizes with stock left;
/// `remaining_redemptions` is `Σ(earned - used)` over every coupon balance of
/// the campaign.
pub fn draw_prize<'a, S: UnitSource + ?Sized>(
    source: &mut S,
    available: &'a [prizes::Model],
    remaining_redemptions: i64,
) -> AppResult<&'a prizes::Model> {
    let (jackpot, other): (Vec<&prizes::Model>, Vec<&prizes::Model>) =
        available.iter().partition(|p| p.is_jackpot());

    let remaining_jackpot_stock: i64 = jackpot.iter().map(|p| p.stock_remaining).sum();

    if !jackpot.is_empty()
        && let Some(p) = jackpot_probability(remaining_jackpot_stock, remaining_redemptions)
    {
        let r = source.next_unit();
        if r <= p {
            return weighted_pick(source, &jackpot);
        }
        if !other.is_empty() {
            return weighted_pick(source, &other);
        }
    }

    let all: Vec<&prizes::Model> = available.iter().collect();
    weighted_pick(source, &all)
}

/// Weighted pick over raw weights (`base_probability`).
///
/// Walks the list with a running sum and selects the first prize whose running
/// sum reaches `r · totalWeight` (inclusive). Falls back to the last prize if
/// rounding leaves nothing selected.
pub fn weighted_pick<'a, S: UnitSource + ?Sized>(
    source: &mut S,
    candidates: &[&'a prizes::Model],
) -> AppResult<&'a prizes::Model> {
    let Some(last) = candidates.last() else {
        return Err(AppError::PrizeSelectionFailed(
            "empty candidate list".into(),
        ));
    };

    if let Some(bad) = candidates
        .iter()
        .find(|p| !p.base_probability.is_finite() || p.base_probability < 0.0)
    {
        return Err(AppError::PrizeSelectionFailed(format!(
            "prize {} has invalid weight {}",
            bad.id, bad.base_probability
        )));
    }

    let total_weight: f64 = candidates.iter().map(|p| p.base_probability).sum();
    if !total_weight.is_finite() || total_weight <= 0.0 {
        return Err(AppError::PrizeSelectionFailed(format!(
            "invalid total weight {total_weight}"
        )));
    }

    let r = source.next_unit() * total_weight;
    let mut running = 0.0;
    for p in candidates {
        running += p.base_probability;
        if running >= r {
            return Ok(*p);
        }
    }

    Ok(*last)
}
