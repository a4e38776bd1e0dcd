//! In-memory implementation of the storage port.
//!
//! Used as the test double and as the `DEMO_MODE` backend, seeded with a
//! demonstration pot. One instance per process, injected like any other
//! store — there is no ambient global state.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{
    ContributionRecord, CycleRecord, EquityRecord, PotRecord, RefundRecord, CYCLE_ACTIVE,
    CYCLE_CLOSED, MODE_TIERS, POT_CLOSED, POT_OPEN,
};
use crate::store::Store;

#[derive(Default)]
struct Inner {
    pots: Vec<PotRecord>,
    cycles: Vec<CycleRecord>,
    contributions: Vec<ContributionRecord>,
    refunds: Vec<RefundRecord>,
    equity: Vec<EquityRecord>,
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with the demonstration pot: tiered amounts,
    /// solidarity above 50 €, a 100 € reserve target, monthly cycles, and
    /// two contributions already in.
    pub fn seeded(now: i64) -> Self {
        let store = Self::new();
        let day = 86_400;

        let pot = PotRecord {
            id: "demo-pot".to_string(),
            slug: "demo123".to_string(),
            name: "Demonstration pot".to_string(),
            objective_cents: 20_000,
            amount_mode: MODE_TIERS.to_string(),
            fixed_amount_cents: None,
            tiers: Some(
                r#"[{"amount":500,"label":"5,00 €"},{"amount":1000,"label":"10,00 €"},{"amount":2000,"label":"20,00 €"},{"amount":5000,"label":"50,00 €"}]"#
                    .to_string(),
            ),
            frequency: crate::models::FREQ_RECURRING.to_string(),
            cycle_duration_days: Some(30),
            solidarity_threshold_cents: Some(5_000),
            solidarity_rate_bps: Some(1_000),
            reserve_target_cents: Some(10_000),
            reserve_balance_cents: 0,
            current_cycle: 1,
            status: POT_OPEN.to_string(),
            ends_at: now + 365 * day,
            closed_at: None,
            owner_token: "demo-owner-token".to_string(),
            pin: Some("1234".to_string()),
            created_at: now,
        };
        let cycle = CycleRecord::open(&pot, 1, now, now + 30 * day);

        let contributions = [
            ("demo-contrib-1", 2_000, Some("Alice"), false, now - 2 * 3_600),
            ("demo-contrib-2", 1_000, None, true, now - 3_600),
        ]
        .map(|(id, amount, name, is_anonymous, paid_at)| ContributionRecord {
            id: id.to_string(),
            pot_id: pot.id.clone(),
            cycle_number: 1,
            amount_suggested_cents: amount,
            amount_paid_cents: amount,
            email: None,
            display_name: name.map(str::to_string),
            is_anonymous,
            contrib_token: format!("{id}-token"),
            paid_at,
            created_at: paid_at,
        });

        {
            let mut inner = store.lock();
            inner.pots.push(pot);
            inner.cycles.push(cycle);
            inner.contributions.extend(contributions);
        }
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }

    /// Test inspection: refunds written so far.
    #[cfg(test)]
    pub fn refund_rows(&self) -> Vec<RefundRecord> {
        self.lock().refunds.clone()
    }

    /// Test inspection: equity ledger rows written so far.
    #[cfg(test)]
    pub fn equity_rows(&self) -> Vec<EquityRecord> {
        self.lock().equity.clone()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn create_pot(&self, pot: &PotRecord, first_cycle: &CycleRecord) -> Result<()> {
        let mut inner = self.lock();
        inner.pots.push(pot.clone());
        inner.cycles.push(first_cycle.clone());
        Ok(())
    }

    async fn find_pot(&self, slug: &str) -> Result<Option<PotRecord>> {
        Ok(self.lock().pots.iter().find(|p| p.slug == slug).cloned())
    }

    async fn close_pot(&self, pot_id: &str, closed_at: i64) -> Result<bool> {
        let mut inner = self.lock();
        match inner
            .pots
            .iter_mut()
            .find(|p| p.id == pot_id && p.status == POT_OPEN)
        {
            Some(pot) => {
                pot.status = POT_CLOSED.to_string();
                pot.closed_at = Some(closed_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_reserve_balance(&self, pot_id: &str, balance_cents: i64) -> Result<()> {
        if let Some(pot) = self.lock().pots.iter_mut().find(|p| p.id == pot_id) {
            pot.reserve_balance_cents = balance_cents;
        }
        Ok(())
    }

    async fn advance_current_cycle(&self, pot_id: &str, cycle_number: i64) -> Result<()> {
        if let Some(pot) = self.lock().pots.iter_mut().find(|p| p.id == pot_id) {
            pot.current_cycle = cycle_number;
        }
        Ok(())
    }

    async fn insert_contribution(&self, contribution: &ContributionRecord) -> Result<()> {
        self.lock().contributions.push(contribution.clone());
        Ok(())
    }

    async fn list_contributions(
        &self,
        pot_id: &str,
        cycle_number: i64,
    ) -> Result<Vec<ContributionRecord>> {
        let mut rows: Vec<ContributionRecord> = self
            .lock()
            .contributions
            .iter()
            .filter(|c| c.pot_id == pot_id && c.cycle_number == cycle_number)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.paid_at.cmp(&b.paid_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn open_cycle(&self, cycle: &CycleRecord) -> Result<()> {
        self.lock().cycles.push(cycle.clone());
        Ok(())
    }

    async fn active_cycle(&self, pot_id: &str) -> Result<Option<CycleRecord>> {
        Ok(self
            .lock()
            .cycles
            .iter()
            .find(|c| c.pot_id == pot_id && c.status == CYCLE_ACTIVE)
            .cloned())
    }

    async fn close_cycle(&self, pot_id: &str, cycle_number: i64, ended_at: i64) -> Result<bool> {
        let mut inner = self.lock();
        match inner.cycles.iter_mut().find(|c| {
            c.pot_id == pot_id && c.cycle_number == cycle_number && c.status == CYCLE_ACTIVE
        }) {
            Some(cycle) => {
                cycle.status = CYCLE_CLOSED.to_string();
                cycle.ended_at = Some(ended_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_refunds(&self, refunds: &[RefundRecord]) -> Result<()> {
        self.lock().refunds.extend_from_slice(refunds);
        Ok(())
    }

    async fn insert_equity_entries(&self, entries: &[EquityRecord]) -> Result<()> {
        self.lock().equity.extend_from_slice(entries);
        Ok(())
    }

    async fn pots_with_expired_cycles(&self, now: i64) -> Result<Vec<PotRecord>> {
        let inner = self.lock();
        let due = inner
            .pots
            .iter()
            .filter(|p| p.status == POT_OPEN && p.is_recurring())
            .filter(|p| {
                inner
                    .cycles
                    .iter()
                    .any(|c| c.pot_id == p.id && c.status == CYCLE_ACTIVE && c.ends_at <= now)
            })
            .cloned()
            .collect();
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_store_serves_the_demo_pot() {
        let store = MemStore::seeded(1_700_000_000);
        let pot = store.find_pot("demo123").await.unwrap().unwrap();
        assert!(pot.is_open());
        assert!(pot.is_recurring());
        assert!(pot.config().unwrap().validate().is_ok());

        let contributions = store.list_contributions(&pot.id, 1).await.unwrap();
        assert_eq!(contributions.len(), 2);
        // Ordered by payment time: Alice paid first.
        assert_eq!(contributions[0].id, "demo-contrib-1");
    }

    #[tokio::test]
    async fn cycle_close_is_exactly_once() {
        let store = MemStore::seeded(1_700_000_000);
        let pot = store.find_pot("demo123").await.unwrap().unwrap();

        assert!(store.close_cycle(&pot.id, 1, 1_700_000_100).await.unwrap());
        assert!(!store.close_cycle(&pot.id, 1, 1_700_000_200).await.unwrap());
        assert!(store.active_cycle(&pot.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_cycle_listing_respects_the_deadline() {
        let now = 1_700_000_000;
        let store = MemStore::seeded(now);
        assert!(store.pots_with_expired_cycles(now).await.unwrap().is_empty());

        let after_deadline = now + 31 * 86_400;
        let due = store.pots_with_expired_cycles(after_deadline).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].slug, "demo123");
    }
}
