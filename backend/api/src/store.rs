//! Storage port — the injected repository abstraction in front of the
//! persistence backend.
//!
//! Two implementations live behind this trait: [`crate::db::SqliteStore`]
//! for real deployments and [`crate::memory::MemStore`] as the test double
//! and demo-mode backend. Status transitions (`close_cycle`, `close_pot`)
//! are conditional and report whether this caller won the transition — that
//! is the serialization point that makes a close exactly-once.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{ContributionRecord, CycleRecord, EquityRecord, PotRecord, RefundRecord};

pub type SharedStore = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a new pot together with its first active cycle.
    async fn create_pot(&self, pot: &PotRecord, first_cycle: &CycleRecord) -> Result<()>;

    async fn find_pot(&self, slug: &str) -> Result<Option<PotRecord>>;

    /// OPEN → CLOSED, only if still open. Returns `false` if another caller
    /// already closed the pot.
    async fn close_pot(&self, pot_id: &str, closed_at: i64) -> Result<bool>;

    async fn set_reserve_balance(&self, pot_id: &str, balance_cents: i64) -> Result<()>;

    async fn advance_current_cycle(&self, pot_id: &str, cycle_number: i64) -> Result<()>;

    async fn insert_contribution(&self, contribution: &ContributionRecord) -> Result<()>;

    /// All contributions of one cycle, ordered by payment time.
    async fn list_contributions(
        &self,
        pot_id: &str,
        cycle_number: i64,
    ) -> Result<Vec<ContributionRecord>>;

    async fn open_cycle(&self, cycle: &CycleRecord) -> Result<()>;

    async fn active_cycle(&self, pot_id: &str) -> Result<Option<CycleRecord>>;

    /// ACTIVE → CLOSED, only if still active. Returns `false` if another
    /// caller already closed this cycle.
    async fn close_cycle(&self, pot_id: &str, cycle_number: i64, ended_at: i64) -> Result<bool>;

    async fn insert_refunds(&self, refunds: &[RefundRecord]) -> Result<()>;

    async fn insert_equity_entries(&self, entries: &[EquityRecord]) -> Result<()>;

    /// Open recurring pots whose active cycle has passed its end date.
    async fn pots_with_expired_cycles(&self, now: i64) -> Result<Vec<PotRecord>>;
}
