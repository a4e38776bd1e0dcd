//! Cycle settlement — the terminal computation of a cycle's close, and the
//! live projections built on top of it.
//!
//! Everything here is pure: the same inputs always produce the same
//! [`Settlement`], and calling it never mutates anything. Persisting the
//! result and flipping the cycle's status exactly once is the caller's
//! responsibility.
//!
//! The flow for a cycle with a surplus:
//!
//! ```text
//! collected ─ objective ──► surplus
//!                              │ reserve absorption (up to target)
//!                              ▼
//!                     available for redistribution
//!                              │ solidarity caps per contribution
//!                              ▼
//!                       refund allocator
//! ```
//!
//! A deficit (or exact hit) short-circuits: nobody's payout drops below
//! what they already paid, no solidarity is levied, the reserve is
//! untouched.

use crate::allocator::{allocate, RefundableEntry};
use crate::error::Result;
use crate::solidarity;
use crate::types::{
    Cents, ContributionInput, CycleSnapshot, CycleStats, EquityDelta, PotConfig, RefundLine,
    Settlement,
};

/// Synthetic contribution id used by [`estimate_refund`]. `~` sorts after
/// every alphanumeric id, so the hypothetical contributor queues behind
/// real ones when amounts tie.
pub const ESTIMATE_ID: &str = "~estimate";

/// Settle one cycle: compute surplus, apply reserve absorption and
/// solidarity, and allocate penny-exact refunds.
///
/// Contributions outside `cycle.number` are ignored. The pot configuration
/// is validated on entry so a malformed snapshot (rate out of range,
/// non-positive reserve target) fails loudly instead of producing a
/// plausible-looking settlement.
pub fn settle_cycle(
    pot: &PotConfig,
    cycle: &CycleSnapshot,
    contributions: &[ContributionInput],
) -> Result<Settlement> {
    pot.validate()?;

    let cycle_contributions: Vec<&ContributionInput> = contributions
        .iter()
        .filter(|c| c.cycle_number == cycle.number)
        .collect();

    let total_collected: Cents = cycle_contributions.iter().map(|c| c.amount_paid).sum();

    // Objective not exceeded: everyone keeps their cost, reserve unchanged.
    if total_collected <= cycle.objective {
        let lines: Vec<RefundLine> = cycle_contributions
            .iter()
            .map(|c| RefundLine {
                contribution_id: c.id.clone(),
                amount_paid: c.amount_paid,
                refund: 0,
                final_cost: c.amount_paid,
                solidarity: 0,
            })
            .collect();
        let equity = equity_deltas(&lines, cycle.number);
        return Ok(Settlement {
            lines,
            equity,
            total_collected,
            total_surplus: 0,
            total_solidarity: 0,
            reserve_used: 0,
            reserve_balance_after: pot.reserve_balance,
        });
    }

    let surplus = total_collected - cycle.objective;

    // Reserve absorption comes before any redistribution.
    let (reserve_used, reserve_balance_after) = match &pot.reserve {
        Some(reserve) => {
            let needed = (reserve.target - pot.reserve_balance).max(0);
            let used = surplus.min(needed);
            (used, pot.reserve_balance + used)
        }
        None => (0, pot.reserve_balance),
    };
    let available = surplus - reserve_used;

    let splits: Vec<_> = cycle_contributions
        .iter()
        .map(|c| solidarity::split(c.amount_paid, pot.solidarity.as_ref()))
        .collect();

    let entries: Vec<RefundableEntry> = cycle_contributions
        .iter()
        .zip(&splits)
        .map(|(c, split)| RefundableEntry {
            id: c.id.clone(),
            refundable: split.refundable,
        })
        .collect();

    let refunds = allocate(available, &entries)?;

    let lines: Vec<RefundLine> = cycle_contributions
        .iter()
        .zip(&splits)
        .zip(&refunds)
        .map(|((c, split), &refund)| RefundLine {
            contribution_id: c.id.clone(),
            amount_paid: c.amount_paid,
            refund,
            final_cost: c.amount_paid - refund,
            solidarity: split.solidarity,
        })
        .collect();

    let total_solidarity = splits.iter().map(|s| s.solidarity).sum();
    let equity = equity_deltas(&lines, cycle.number);

    Ok(Settlement {
        lines,
        equity,
        total_collected,
        total_surplus: surplus,
        total_solidarity,
        reserve_used,
        reserve_balance_after,
    })
}

/// "If I contribute now, what would I get back?"
///
/// Appends a synthetic contribution and runs the settlement pipeline over
/// the projected set. Reserve effects are deliberately left out of the
/// projection — reserve state only finalizes at a real close, and the
/// estimate must not pretend otherwise.
pub fn estimate_refund(
    pot: &PotConfig,
    contributions: &[ContributionInput],
    hypothetical_amount: Cents,
    cycle_number: u32,
) -> Result<Cents> {
    let projected_pot = PotConfig {
        reserve: None,
        ..pot.clone()
    };

    let mut projected: Vec<ContributionInput> = contributions.to_vec();
    projected.push(ContributionInput {
        id: ESTIMATE_ID.to_string(),
        amount_paid: hypothetical_amount,
        cycle_number,
    });

    let cycle = CycleSnapshot {
        number: cycle_number,
        objective: pot.objective,
    };
    let settlement = settle_cycle(&projected_pot, &cycle, &projected)?;

    Ok(settlement
        .lines
        .iter()
        .find(|line| line.contribution_id == ESTIMATE_ID)
        .map(|line| line.refund)
        .unwrap_or(0))
}

/// Equal-split dashboard figure: what each contributor would get back if
/// the pot closed right now, ignoring solidarity and reserve.
pub fn current_refund_estimate(
    objective: Cents,
    total_collected: Cents,
    contributors: u32,
) -> Cents {
    if contributors == 0 || total_collected <= objective {
        return 0;
    }
    (total_collected - objective) / Cents::from(contributors)
}

/// Aggregate display figures for one cycle.
pub fn cycle_stats(objective: Cents, contributions: &[ContributionInput]) -> CycleStats {
    let total_collected: Cents = contributions.iter().map(|c| c.amount_paid).sum();
    let contributors = contributions.len() as u32;
    let average_contribution = if contributors == 0 {
        0
    } else {
        let n = Cents::from(contributors);
        // Round half up.
        (total_collected + n / 2) / n
    };
    let progress_pct = if objective <= 0 {
        100
    } else {
        ((total_collected.max(0) * 100 / objective).min(100)) as u8
    };
    CycleStats {
        total_collected,
        surplus: (total_collected - objective).max(0),
        contributors,
        average_contribution,
        progress_pct,
    }
}

fn equity_deltas(lines: &[RefundLine], cycle_number: u32) -> Vec<EquityDelta> {
    lines
        .iter()
        .map(|line| EquityDelta {
            contribution_id: line.contribution_id.clone(),
            cycle_number,
            balance: line.amount_paid - line.refund - line.solidarity,
        })
        .collect()
}
