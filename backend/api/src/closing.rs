//! The one close path — settle the active cycle through the engine, persist
//! the outcome, and either terminate the pot (one-time) or roll it over to
//! the next cycle (recurring).
//!
//! Both the owner's close endpoint and the background scheduler go through
//! [`close_active_cycle`]. The store's conditional ACTIVE→CLOSED transition
//! is what makes the close exactly-once when both race.

use tracing::info;

use cascade_core::{settle_cycle, ContributionInput, CycleSnapshot, Settlement};

use crate::errors::{ApiError, Result};
use crate::models::{new_token, CycleRecord, EquityRecord, PotRecord, RefundRecord};
use crate::store::Store;

/// What a close produced, for the response body and the logs.
pub struct CloseOutcome {
    pub settlement: Settlement,
    pub cycle_number: i64,
    /// `true` when the pot itself transitioned to CLOSED (one-time pots).
    pub pot_closed: bool,
    /// The newly opened cycle for recurring pots.
    pub next_cycle: Option<i64>,
}

pub async fn close_active_cycle(
    store: &dyn Store,
    pot: &PotRecord,
    now: i64,
) -> Result<CloseOutcome> {
    if !pot.is_open() {
        return Err(ApiError::PotClosed);
    }
    let cycle = store
        .active_cycle(&pot.id)
        .await?
        .ok_or(ApiError::CycleAlreadyClosed)?;

    let records = store.list_contributions(&pot.id, cycle.cycle_number).await?;
    let inputs: Vec<ContributionInput> = records.iter().map(|r| r.to_input()).collect();

    let config = pot.config()?;
    let snapshot = CycleSnapshot {
        number: cycle.cycle_number as u32,
        objective: cycle.objective_cents,
    };
    let settlement = settle_cycle(&config, &snapshot, &inputs)?;

    // Serialization point: whoever flips ACTIVE→CLOSED persists the result.
    if !store.close_cycle(&pot.id, cycle.cycle_number, now).await? {
        return Err(ApiError::CycleAlreadyClosed);
    }

    if settlement.total_surplus > 0 {
        let refunds: Vec<RefundRecord> = settlement
            .lines
            .iter()
            .filter(|line| line.refund > 0)
            .map(|line| RefundRecord::pending(&pot.id, cycle.cycle_number, line, now))
            .collect();
        store.insert_refunds(&refunds).await?;
    }

    if pot.is_recurring() {
        let entries: Vec<EquityRecord> = settlement
            .equity
            .iter()
            .map(|delta| EquityRecord {
                id: new_token(8),
                pot_id: pot.id.clone(),
                contribution_id: delta.contribution_id.clone(),
                cycle_number: cycle.cycle_number,
                balance_cents: delta.balance,
                created_at: now,
            })
            .collect();
        store.insert_equity_entries(&entries).await?;
    }

    if settlement.reserve_balance_after != pot.reserve_balance_cents {
        store
            .set_reserve_balance(&pot.id, settlement.reserve_balance_after)
            .await?;
    }

    let (pot_closed, next_cycle) = if pot.is_recurring() {
        let next = cycle.cycle_number + 1;
        let duration_days = pot.cycle_duration_days.unwrap_or(30);
        let next_cycle_record =
            CycleRecord::open(pot, next, now, now + duration_days * 86_400);
        store.open_cycle(&next_cycle_record).await?;
        store.advance_current_cycle(&pot.id, next).await?;
        (false, Some(next))
    } else {
        store.close_pot(&pot.id, now).await?;
        (true, None)
    };

    info!(
        "Settled pot {} cycle {}: collected {}, surplus {}, reserve used {}",
        pot.slug,
        cycle.cycle_number,
        settlement.total_collected,
        settlement.total_surplus,
        settlement.reserve_used
    );

    Ok(CloseOutcome {
        settlement,
        cycle_number: cycle.cycle_number,
        pot_closed,
        next_cycle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemStore;
    use crate::models::{
        ContributionRecord, FREQ_ONE_TIME, FREQ_RECURRING, MODE_FIXED, POT_OPEN,
    };
    use crate::store::Store;

    const NOW: i64 = 1_700_000_000;

    fn fixed_pot(frequency: &str) -> PotRecord {
        PotRecord {
            id: "p1".to_string(),
            slug: "test-pot".to_string(),
            name: "Test pot".to_string(),
            objective_cents: 20_000,
            amount_mode: MODE_FIXED.to_string(),
            fixed_amount_cents: Some(10_000),
            tiers: None,
            frequency: frequency.to_string(),
            cycle_duration_days: if frequency == FREQ_RECURRING {
                Some(30)
            } else {
                None
            },
            solidarity_threshold_cents: None,
            solidarity_rate_bps: None,
            reserve_target_cents: None,
            reserve_balance_cents: 0,
            current_cycle: 1,
            status: POT_OPEN.to_string(),
            ends_at: NOW + 30 * 86_400,
            closed_at: None,
            owner_token: "owner".to_string(),
            pin: None,
            created_at: NOW,
        }
    }

    fn contribution(id: &str, amount: i64) -> ContributionRecord {
        ContributionRecord {
            id: id.to_string(),
            pot_id: "p1".to_string(),
            cycle_number: 1,
            amount_suggested_cents: amount,
            amount_paid_cents: amount,
            email: None,
            display_name: None,
            is_anonymous: false,
            contrib_token: format!("{id}-token"),
            paid_at: NOW,
            created_at: NOW,
        }
    }

    async fn store_with(pot: &PotRecord, contributions: &[ContributionRecord]) -> MemStore {
        let store = MemStore::new();
        let cycle = CycleRecord::open(pot, 1, NOW, pot.ends_at);
        store.create_pot(pot, &cycle).await.unwrap();
        for c in contributions {
            store.insert_contribution(c).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn one_time_close_settles_and_terminates_the_pot() {
        let pot = fixed_pot(FREQ_ONE_TIME);
        let store = store_with(
            &pot,
            &[
                contribution("c1", 10_000),
                contribution("c2", 10_000),
                contribution("c3", 10_000),
            ],
        )
        .await;

        let outcome = close_active_cycle(&store, &pot, NOW + 10).await.unwrap();
        assert!(outcome.pot_closed);
        assert_eq!(outcome.next_cycle, None);
        assert_eq!(outcome.settlement.total_surplus, 10_000);

        let refunds = store.refund_rows();
        assert_eq!(refunds.len(), 3);
        assert_eq!(refunds.iter().map(|r| r.amount_cents).sum::<i64>(), 10_000);

        // One-time pots carry no equity ledger.
        assert!(store.equity_rows().is_empty());

        let reloaded = store.find_pot("test-pot").await.unwrap().unwrap();
        assert!(!reloaded.is_open());
        assert_eq!(reloaded.closed_at, Some(NOW + 10));
    }

    #[tokio::test]
    async fn second_close_is_rejected() {
        let pot = fixed_pot(FREQ_ONE_TIME);
        let store = store_with(&pot, &[contribution("c1", 10_000)]).await;

        close_active_cycle(&store, &pot, NOW).await.unwrap();
        let reloaded = store.find_pot("test-pot").await.unwrap().unwrap();
        assert!(matches!(
            close_active_cycle(&store, &reloaded, NOW).await,
            Err(ApiError::PotClosed)
        ));
        // Even with a stale OPEN snapshot, the cycle transition guards it.
        assert!(matches!(
            close_active_cycle(&store, &pot, NOW).await,
            Err(ApiError::CycleAlreadyClosed)
        ));
    }

    #[tokio::test]
    async fn deficit_close_writes_no_refund_rows() {
        let pot = fixed_pot(FREQ_ONE_TIME);
        let store = store_with(&pot, &[contribution("c1", 10_000)]).await;

        let outcome = close_active_cycle(&store, &pot, NOW).await.unwrap();
        assert_eq!(outcome.settlement.total_surplus, 0);
        assert!(store.refund_rows().is_empty());
    }

    #[tokio::test]
    async fn recurring_close_rolls_over_to_the_next_cycle() {
        let mut pot = fixed_pot(FREQ_RECURRING);
        pot.reserve_target_cents = Some(4_000);
        let store = store_with(
            &pot,
            &[
                contribution("c1", 10_000),
                contribution("c2", 10_000),
                contribution("c3", 10_000),
            ],
        )
        .await;

        let outcome = close_active_cycle(&store, &pot, NOW + 100).await.unwrap();
        assert!(!outcome.pot_closed);
        assert_eq!(outcome.next_cycle, Some(2));
        assert_eq!(outcome.settlement.reserve_used, 4_000);

        let reloaded = store.find_pot("test-pot").await.unwrap().unwrap();
        assert!(reloaded.is_open());
        assert_eq!(reloaded.current_cycle, 2);
        assert_eq!(reloaded.reserve_balance_cents, 4_000);

        let next = store.active_cycle(&pot.id).await.unwrap().unwrap();
        assert_eq!(next.cycle_number, 2);
        assert_eq!(next.started_at, NOW + 100);
        assert_eq!(next.ends_at, NOW + 100 + 30 * 86_400);

        // Equity rows: paid − refunded − solidarity, per contribution.
        let equity = store.equity_rows();
        assert_eq!(equity.len(), 3);
        let distributed: i64 = store.refund_rows().iter().map(|r| r.amount_cents).sum();
        assert_eq!(distributed, 6_000);
        assert_eq!(
            equity.iter().map(|e| e.balance_cents).sum::<i64>(),
            30_000 - 6_000
        );
    }
}
