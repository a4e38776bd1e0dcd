#![allow(dead_code)]

//! Assertion helpers for the engine's invariants, shared by the unit and
//! property tests.

use crate::allocator::{allocate, RefundableEntry};
use crate::types::{Cents, Settlement, SolidarityPolicy};

/// INV-1: refunds sum exactly to the available surplus — not a cent more
/// or less.
pub fn assert_exact_sum(available: Cents, refunds: &[Cents]) {
    let distributed: Cents = refunds.iter().sum();
    assert_eq!(
        distributed, available,
        "INV-1 violated: distributed {distributed} cents of an available {available}"
    );
}

/// INV-2: no refund exceeds its contribution's refundable cap, and none is
/// negative.
pub fn assert_caps_respected(entries: &[RefundableEntry], refunds: &[Cents]) {
    assert_eq!(entries.len(), refunds.len());
    for (entry, &refund) in entries.iter().zip(refunds) {
        assert!(
            (0..=entry.refundable).contains(&refund),
            "INV-2 violated: refund {refund} outside [0, {}] for {}",
            entry.refundable,
            entry.id
        );
    }
}

/// INV-3: the allocator is deterministic — reordering the input never
/// changes any contribution's refund.
pub fn assert_deterministic(
    available: Cents,
    entries: &[RefundableEntry],
    reordered: &[RefundableEntry],
) {
    let refunds = allocate(available, entries).expect("allocation failed");
    let refunds_reordered = allocate(available, reordered).expect("allocation failed");
    for (entry, &refund) in entries.iter().zip(&refunds) {
        let j = reordered
            .iter()
            .position(|e| e.id == entry.id)
            .expect("entry missing after reorder");
        assert_eq!(
            refund, refunds_reordered[j],
            "INV-3 violated: refund for {} changed under reordering",
            entry.id
        );
    }
}

/// INV-4: with no surplus, every refund is zero, every final cost equals
/// the amount paid, and no solidarity is levied.
pub fn assert_no_surplus_idempotence(settlement: &Settlement) {
    assert_eq!(settlement.total_surplus, 0);
    assert_eq!(settlement.total_solidarity, 0);
    assert_eq!(settlement.reserve_used, 0);
    for line in &settlement.lines {
        assert_eq!(
            line.refund, 0,
            "INV-4 violated: refund without surplus for {}",
            line.contribution_id
        );
        assert_eq!(
            line.final_cost, line.amount_paid,
            "INV-4 violated: final cost drifted for {}",
            line.contribution_id
        );
        assert_eq!(line.solidarity, 0);
    }
}

/// INV-5: reserve precedence — the surplus fills the reserve gap before
/// anything is redistributed, and the remainder is fully redistributed.
pub fn assert_reserve_precedence(settlement: &Settlement, target: Cents, balance_before: Cents) {
    let needed = (target - balance_before).max(0);
    let expected_used = settlement.total_surplus.min(needed);
    assert_eq!(
        settlement.reserve_used, expected_used,
        "INV-5 violated: reserve took {} of a {} gap from a {} surplus",
        settlement.reserve_used, needed, settlement.total_surplus
    );
    let distributed: Cents = settlement.lines.iter().map(|l| l.refund).sum();
    assert_eq!(
        distributed,
        settlement.total_surplus - settlement.reserve_used,
        "INV-5 violated: redistribution does not account for the reserve"
    );
}

/// INV-6: within a settlement, every refund respects the solidarity cap of
/// its own contribution.
pub fn assert_caps_respected_in_lines(settlement: &Settlement, policy: Option<&SolidarityPolicy>) {
    for line in &settlement.lines {
        let cap = crate::solidarity::split(line.amount_paid, policy).refundable;
        assert!(
            (0..=cap).contains(&line.refund),
            "INV-6 violated: refund {} outside [0, {cap}] for {}",
            line.refund,
            line.contribution_id
        );
        assert_eq!(line.final_cost, line.amount_paid - line.refund);
    }
}
