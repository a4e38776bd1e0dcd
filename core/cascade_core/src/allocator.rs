//! Refund allocator — exact-remainder distribution of a surplus across
//! capped refund entries.
//!
//! The algorithm is "largest remainder" with cap-aware carry-forward:
//!
//! 1. Each entry gets a proportional base, `cap × floor(available / total)`
//!    (zero in the common case where the surplus is smaller than the
//!    refundable total).
//! 2. The remainder is handed out one cent at a time over the entries
//!    sorted by cap ascending, ties broken by id — smaller contributors are
//!    made whole first, and the order is reproducible no matter how the
//!    input was ordered.
//! 3. Passes repeat until the remainder is gone or every entry is at its
//!    cap. A remainder that survives exhausted caps means the caller asked
//!    for more than the refundable total — a contract violation, reported
//!    as [`CoreError::OverDistribution`] rather than silently under-paid.
//!
//! Guarantees, for `0 ≤ available ≤ Σ caps`:
//! `Σ refunds == available` and `0 ≤ refund_i ≤ cap_i` for every entry.

use crate::error::{CoreError, Result};
use crate::types::Cents;

/// One contribution's refund headroom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundableEntry {
    pub id: String,
    /// Cap on this entry's refund (its amount paid minus solidarity).
    pub refundable: Cents,
}

/// Distribute `available` cents across `entries`.
///
/// Returns the refunds in the same order as the input. Negative inputs are
/// rejected outright — the caller's surplus derivation is broken, clamping
/// would hide it.
pub fn allocate(available: Cents, entries: &[RefundableEntry]) -> Result<Vec<Cents>> {
    if available < 0 {
        return Err(CoreError::NegativeAmount { amount: available });
    }
    if let Some(entry) = entries.iter().find(|e| e.refundable < 0) {
        return Err(CoreError::NegativeAmount {
            amount: entry.refundable,
        });
    }

    let total_refundable: Cents = entries.iter().map(|e| e.refundable).sum();
    if available == 0 || total_refundable == 0 {
        return Ok(vec![0; entries.len()]);
    }

    // Proportional base share. The quotient is 0 unless the surplus reaches
    // the refundable total, in which case every entry starts at its cap.
    let quotient = available / total_refundable;
    let mut refunds: Vec<Cents> = entries
        .iter()
        .map(|e| {
            let base = i128::from(e.refundable) * i128::from(quotient);
            Cents::try_from(base).unwrap_or(Cents::MAX).min(e.refundable)
        })
        .collect();

    let mut remainder = available - refunds.iter().sum::<Cents>();

    // Canonical distribution order: smallest cap first, then id.
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| {
        entries[a]
            .refundable
            .cmp(&entries[b].refundable)
            .then_with(|| entries[a].id.cmp(&entries[b].id))
    });

    while remainder > 0 {
        let mut gave = false;
        for &i in &order {
            if remainder == 0 {
                break;
            }
            if refunds[i] < entries[i].refundable {
                refunds[i] += 1;
                remainder -= 1;
                gave = true;
            }
        }
        if !gave {
            return Err(CoreError::OverDistribution {
                available,
                total_refundable,
                leftover: remainder,
            });
        }
    }

    Ok(refunds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants;

    fn entries(caps: &[(&str, Cents)]) -> Vec<RefundableEntry> {
        caps.iter()
            .map(|&(id, refundable)| RefundableEntry {
                id: id.to_string(),
                refundable,
            })
            .collect()
    }

    #[test]
    fn three_equal_contributions_split_a_surplus_exactly() {
        // 200 € objective, three 100 € payments → 100 € surplus.
        let entries = entries(&[("c1", 10_000), ("c2", 10_000), ("c3", 10_000)]);
        let refunds = allocate(10_000, &entries).unwrap();
        assert_eq!(refunds, vec![3_334, 3_333, 3_333]);
        invariants::assert_exact_sum(10_000, &refunds);
        invariants::assert_caps_respected(&entries, &refunds);
    }

    #[test]
    fn zero_surplus_gives_zero_refunds() {
        let entries = entries(&[("c1", 5_000), ("c2", 8_000)]);
        assert_eq!(allocate(0, &entries).unwrap(), vec![0, 0]);
    }

    #[test]
    fn zero_refundable_total_gives_zero_refunds() {
        let entries = entries(&[("c1", 0), ("c2", 0)]);
        assert_eq!(allocate(500, &entries).unwrap(), vec![0, 0]);
    }

    #[test]
    fn smaller_contributors_get_the_extra_cents_first() {
        let entries = entries(&[("big", 10_000), ("small", 100)]);
        let refunds = allocate(101, &entries).unwrap();
        // Two passes: small (cap 100) is served before big each pass.
        assert_eq!(refunds, vec![50, 51]);
        invariants::assert_exact_sum(101, &refunds);
    }

    #[test]
    fn id_breaks_ties_between_equal_caps() {
        let entries = entries(&[("b", 1_000), ("a", 1_000)]);
        let refunds = allocate(3, &entries).unwrap();
        // "a" sorts first and picks up the odd cent.
        assert_eq!(refunds, vec![1, 2]);
    }

    #[test]
    fn surplus_equal_to_total_refundable_fills_every_cap() {
        let entries = entries(&[("c1", 700), ("c2", 300)]);
        let refunds = allocate(1_000, &entries).unwrap();
        assert_eq!(refunds, vec![700, 300]);
    }

    #[test]
    fn result_is_independent_of_input_order() {
        let forward = entries(&[("c1", 9_500), ("c2", 4_000), ("c3", 4_000)]);
        let reversed: Vec<_> = forward.iter().rev().cloned().collect();

        let refunds_fwd = allocate(7_777, &forward).unwrap();
        let refunds_rev = allocate(7_777, &reversed).unwrap();

        for (i, entry) in forward.iter().enumerate() {
            let j = reversed.iter().position(|e| e.id == entry.id).unwrap();
            assert_eq!(refunds_fwd[i], refunds_rev[j], "refund for {}", entry.id);
        }
    }

    #[test]
    fn rejects_negative_surplus() {
        let entries = entries(&[("c1", 1_000)]);
        assert!(matches!(
            allocate(-1, &entries),
            Err(CoreError::NegativeAmount { amount: -1 })
        ));
    }

    #[test]
    fn rejects_negative_caps() {
        let entries = entries(&[("c1", -5)]);
        assert!(matches!(
            allocate(100, &entries),
            Err(CoreError::NegativeAmount { amount: -5 })
        ));
    }

    #[test]
    fn over_distribution_is_a_hard_error() {
        let entries = entries(&[("c1", 100), ("c2", 200)]);
        let err = allocate(500, &entries).unwrap_err();
        assert_eq!(
            err,
            CoreError::OverDistribution {
                available: 500,
                total_refundable: 300,
                leftover: 200,
            }
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// For any surplus within the refundable total, refunds sum to
            /// the surplus exactly and never exceed their caps.
            #[test]
            fn exact_sum_within_caps(
                caps in proptest::collection::vec(0i64..50_000, 1..40),
                surplus_seed in 0u64..u64::MAX,
            ) {
                let total: i64 = caps.iter().sum();
                let available = if total == 0 { 0 } else { (surplus_seed % (total as u64 + 1)) as i64 };
                let entries: Vec<RefundableEntry> = caps
                    .iter()
                    .enumerate()
                    .map(|(i, &refundable)| RefundableEntry {
                        id: format!("c{i:03}"),
                        refundable,
                    })
                    .collect();

                let refunds = allocate(available, &entries).unwrap();
                invariants::assert_exact_sum(available, &refunds);
                invariants::assert_caps_respected(&entries, &refunds);
            }

            /// Shuffled input produces the same per-id refunds.
            #[test]
            fn deterministic_under_reordering(
                caps in proptest::collection::vec(0i64..10_000, 2..20),
                available_seed in 0u64..u64::MAX,
            ) {
                let total: i64 = caps.iter().sum();
                let available = if total == 0 { 0 } else { (available_seed % (total as u64 + 1)) as i64 };
                let entries: Vec<RefundableEntry> = caps
                    .iter()
                    .enumerate()
                    .map(|(i, &refundable)| RefundableEntry {
                        id: format!("c{i:03}"),
                        refundable,
                    })
                    .collect();
                let mut rotated = entries.clone();
                rotated.rotate_left(1);

                invariants::assert_deterministic(available, &entries, &rotated);
            }
        }
    }
}
