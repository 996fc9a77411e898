use rust_decimal::{Decimal, RoundingStrategy};

use super::super::domain::{AdjustmentKind, PackageBaseline, PriceAdjustment};

/// Running price and timeline while rules are folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accumulator {
    pub price: Decimal,
    pub timeline_weeks: i64,
}

impl Accumulator {
    pub fn from_baseline(baseline: &PackageBaseline) -> Self {
        Self {
            price: baseline.base_price,
            timeline_weeks: i64::from(baseline.timeline_weeks()),
        }
    }

    /// Price rounded to the currency's minimum unit. No floor is applied.
    pub fn rounded_price(&self, currency_scale: u32) -> Decimal {
        self.price
            .round_dp_with_strategy(currency_scale, RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn clamped_timeline(&self) -> u32 {
        u32::try_from(self.timeline_weeks.max(0)).unwrap_or(u32::MAX)
    }
}

/// Raised when decimal arithmetic leaves the representable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{} adjustment of {amount} overflowed the running price", .kind.label())]
pub struct AdjustmentOverflow {
    pub kind: AdjustmentKind,
    pub amount: Decimal,
}

/// Apply one matched rule to the running accumulator.
///
/// Adjustments compound: a multiplier scales whatever earlier rules produced.
/// Negative intermediate prices are carried through untouched.
pub fn apply(
    accumulator: Accumulator,
    price_adjustment: Option<&PriceAdjustment>,
    timeline_delta: Option<i32>,
) -> Result<Accumulator, AdjustmentOverflow> {
    let price = match price_adjustment {
        Some(adjustment) => {
            let price = accumulator.price;
            let amount = adjustment.amount;
            let adjusted = match adjustment.kind {
                AdjustmentKind::Multiplier => price.checked_mul(amount),
                AdjustmentKind::FixedAdd => price.checked_add(amount),
                AdjustmentKind::FixedSubtract => price.checked_sub(amount),
            };
            adjusted.ok_or(AdjustmentOverflow {
                kind: adjustment.kind,
                amount,
            })?
        }
        None => accumulator.price,
    };

    let timeline_weeks = accumulator
        .timeline_weeks
        .saturating_add(i64::from(timeline_delta.unwrap_or(0)));

    Ok(Accumulator {
        price,
        timeline_weeks,
    })
}
