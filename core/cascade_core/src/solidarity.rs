//! Solidarity levy — splits a payment into its refund-eligible base and the
//! above-threshold levy.

use crate::types::{Cents, SolidarityPolicy, SolidaritySplit, BPS_SCALE};

/// Split `amount_paid` according to the pot's solidarity policy.
///
/// The levy applies only to the slice above the threshold and rounds down,
/// so a contributor is never charged more solidarity than the configured
/// rate. With no policy the whole payment stays refund-eligible.
///
/// The rate arrives in basis points; the product is widened to `i128` before
/// the division so large contributions cannot overflow.
pub fn split(amount_paid: Cents, policy: Option<&SolidarityPolicy>) -> SolidaritySplit {
    let Some(policy) = policy else {
        return SolidaritySplit {
            above_threshold: 0,
            solidarity: 0,
            refundable: amount_paid,
        };
    };

    let above_threshold = (amount_paid - policy.threshold).max(0);
    let solidarity =
        (i128::from(above_threshold) * i128::from(policy.rate_bps) / i128::from(BPS_SCALE)) as Cents;

    SolidaritySplit {
        above_threshold,
        solidarity,
        refundable: amount_paid - solidarity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_policy_keeps_everything_refundable() {
        let result = split(10_000, None);
        assert_eq!(result.above_threshold, 0);
        assert_eq!(result.solidarity, 0);
        assert_eq!(result.refundable, 10_000);
    }

    #[test]
    fn levies_ten_percent_above_threshold() {
        // 100 € paid, 50 € threshold, 10% rate → 5 € levy, 95 € refundable.
        let policy = SolidarityPolicy {
            threshold: 5_000,
            rate_bps: 1_000,
        };
        let result = split(10_000, Some(&policy));
        assert_eq!(result.above_threshold, 5_000);
        assert_eq!(result.solidarity, 500);
        assert_eq!(result.refundable, 9_500);
    }

    #[test]
    fn below_threshold_pays_no_levy() {
        let policy = SolidarityPolicy {
            threshold: 5_000,
            rate_bps: 1_000,
        };
        let result = split(4_000, Some(&policy));
        assert_eq!(result.above_threshold, 0);
        assert_eq!(result.solidarity, 0);
        assert_eq!(result.refundable, 4_000);
    }

    #[test]
    fn levy_rounds_down() {
        // 33 cents above threshold at 10% → 3.3 cents → 3 cents.
        let policy = SolidarityPolicy {
            threshold: 0,
            rate_bps: 1_000,
        };
        let result = split(33, Some(&policy));
        assert_eq!(result.solidarity, 3);
        assert_eq!(result.refundable, 30);
    }

    #[test]
    fn raising_the_rate_never_raises_the_refundable_amount() {
        let amount = 12_345;
        let mut previous = amount;
        for rate_bps in (0..=BPS_SCALE).step_by(250) {
            let policy = SolidarityPolicy {
                threshold: 5_000,
                rate_bps,
            };
            let refundable = split(amount, Some(&policy)).refundable;
            assert!(refundable <= previous);
            previous = refundable;
        }
    }

    #[test]
    fn full_rate_levies_the_entire_slice_above_threshold() {
        let policy = SolidarityPolicy {
            threshold: 1_000,
            rate_bps: BPS_SCALE,
        };
        let result = split(10_000, Some(&policy));
        assert_eq!(result.solidarity, 9_000);
        assert_eq!(result.refundable, 1_000);
    }
}
