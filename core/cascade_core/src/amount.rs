//! Amount policy — what a contributor should pay, and whether a proposed
//! amount is acceptable for the pot's mode.
//!
//! Both functions are pure over the pot configuration.

use crate::error::{CoreError, Result};
use crate::types::{AmountMode, Cents, PotConfig, MIN_CONTRIBUTION};

/// Suggested amount for the next contributor.
///
/// - Fixed: the configured amount.
/// - Tiers: the middle tier (`floor(n/2)` by index).
/// - Free: an even split of the objective assuming one more contributor
///   joins, floored at the minimum contribution.
pub fn suggested_amount(pot: &PotConfig, current_contributors: u32) -> Cents {
    match &pot.mode {
        AmountMode::Fixed { amount } => *amount,
        AmountMode::Tiers { tiers } => match tiers.get(tiers.len() / 2) {
            Some(tier) => tier.amount,
            None => MIN_CONTRIBUTION,
        },
        AmountMode::Free => {
            let target_contributors = Cents::from(current_contributors) + 1;
            let even_split = div_ceil(pot.objective, target_contributors);
            even_split.max(MIN_CONTRIBUTION)
        }
    }
}

/// Validate a proposed contribution amount against the pot's mode.
///
/// Every mode enforces the 10 cent floor first; Fixed requires exact
/// equality, Tiers requires an exact tier match (the error lists the
/// accepted amounts), Free accepts anything at or above the floor.
pub fn validate_amount(pot: &PotConfig, amount: Cents) -> Result<()> {
    if amount < MIN_CONTRIBUTION {
        return Err(CoreError::AmountBelowMinimum { amount });
    }

    match &pot.mode {
        AmountMode::Fixed { amount: fixed } => {
            if amount != *fixed {
                return Err(CoreError::FixedAmountMismatch { required: *fixed });
            }
            Ok(())
        }
        AmountMode::Tiers { tiers } => {
            if tiers.is_empty() {
                return Err(CoreError::NoTiersConfigured);
            }
            if tiers.iter().any(|tier| tier.amount == amount) {
                Ok(())
            } else {
                Err(CoreError::AmountNotInTiers {
                    accepted: tiers.iter().map(|t| t.amount).collect(),
                })
            }
        }
        AmountMode::Free => Ok(()),
    }
}

/// Ceiling division for non-negative cents.
fn div_ceil(dividend: Cents, divisor: Cents) -> Cents {
    (dividend + divisor - 1) / divisor
}
