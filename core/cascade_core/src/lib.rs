//! # Cascade settlement engine
//!
//! The deterministic math behind Cascade group pots: who put in how much,
//! who is owed how much back. A pot collects toward an objective; once the
//! objective is exceeded, the surplus flows back to contributors as
//! penny-exact partial refunds, after an optional solidarity levy on large
//! contributions and optional reserve absorption across recurring cycles.
//!
//! | Concern            | Module                                    |
//! |--------------------|-------------------------------------------|
//! | Amount policy      | [`amount`] — suggest + validate per mode   |
//! | Solidarity levy    | [`solidarity`] — above-threshold split     |
//! | Surplus allocation | [`allocator`] — exact-remainder distribution |
//! | Cycle close        | [`settlement::settle_cycle`]               |
//! | Live projections   | [`settlement::estimate_refund`] and friends |
//!
//! ## Architecture
//!
//! Every function in this crate is pure and synchronous over integer cents:
//! no I/O, no clocks, no floating point, no shared state. Persistence,
//! payment confirmation, and the exactly-once semantics of a real close all
//! live with the caller (see the `api` backend crate). That makes the whole
//! engine safe to call concurrently for read-only estimation.

pub mod allocator;
pub mod amount;
pub mod error;
pub mod format;
pub mod settlement;
pub mod solidarity;
pub mod types;

#[cfg(test)]
mod invariants;

pub use allocator::{allocate, RefundableEntry};
pub use amount::{suggested_amount, validate_amount};
pub use error::{CoreError, Result};
pub use format::format_eur;
pub use settlement::{
    current_refund_estimate, cycle_stats, estimate_refund, settle_cycle, ESTIMATE_ID,
};
pub use types::{
    AmountMode, Cents, ContributionInput, CycleSnapshot, CycleStats, EquityDelta, Frequency,
    PotConfig, RefundLine, ReservePolicy, Settlement, SolidarityPolicy, SolidaritySplit, Tier,
    MIN_CONTRIBUTION,
};
