//! Database row types and their mapping into the settlement engine's
//! boundary shapes.
//!
//! Rows keep everything as SQLite-friendly primitives (`i64` cents and unix
//! timestamps, `TEXT` statuses); the engine's tagged enums are reconstructed
//! on demand via [`PotRecord::config`].

use rand::RngCore;
use serde::{Deserialize, Serialize};

use cascade_core::{
    AmountMode, Cents, ContributionInput, Frequency, PotConfig, RefundLine, ReservePolicy,
    SolidarityPolicy, Tier,
};

use crate::errors::{ApiError, Result};

pub const POT_OPEN: &str = "OPEN";
pub const POT_CLOSED: &str = "CLOSED";
pub const CYCLE_ACTIVE: &str = "ACTIVE";
pub const CYCLE_CLOSED: &str = "CLOSED";
pub const REFUND_PENDING: &str = "PENDING";

pub const MODE_FIXED: &str = "FIXED";
pub const MODE_TIERS: &str = "TIERS";
pub const MODE_FREE: &str = "FREE";
pub const FREQ_ONE_TIME: &str = "ONE_TIME";
pub const FREQ_RECURRING: &str = "RECURRING";

/// Mint a random lowercase-hex token of `bytes * 2` characters.
pub fn new_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// A pot row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PotRecord {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub objective_cents: i64,
    pub amount_mode: String,
    pub fixed_amount_cents: Option<i64>,
    /// JSON array of `{amount, label}` when `amount_mode` is TIERS.
    pub tiers: Option<String>,
    pub frequency: String,
    pub cycle_duration_days: Option<i64>,
    pub solidarity_threshold_cents: Option<i64>,
    pub solidarity_rate_bps: Option<i64>,
    pub reserve_target_cents: Option<i64>,
    pub reserve_balance_cents: i64,
    pub current_cycle: i64,
    pub status: String,
    pub ends_at: i64,
    pub closed_at: Option<i64>,
    pub owner_token: String,
    pub pin: Option<String>,
    pub created_at: i64,
}

impl PotRecord {
    pub fn is_open(&self) -> bool {
        self.status == POT_OPEN
    }

    pub fn is_recurring(&self) -> bool {
        self.frequency == FREQ_RECURRING
    }

    /// Parse the configured tiers, if any.
    pub fn tier_list(&self) -> Result<Option<Vec<Tier>>> {
        match &self.tiers {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    /// Rebuild the engine's immutable config snapshot from this row.
    pub fn config(&self) -> Result<PotConfig> {
        let mode = match self.amount_mode.as_str() {
            MODE_FIXED => AmountMode::Fixed {
                amount: self.fixed_amount_cents.ok_or_else(|| {
                    ApiError::Data(format!("pot {} has FIXED mode without an amount", self.slug))
                })?,
            },
            MODE_TIERS => AmountMode::Tiers {
                tiers: self.tier_list()?.ok_or_else(|| {
                    ApiError::Data(format!("pot {} has TIERS mode without tiers", self.slug))
                })?,
            },
            MODE_FREE => AmountMode::Free,
            other => {
                return Err(ApiError::Data(format!(
                    "pot {} has unknown amount mode {other:?}",
                    self.slug
                )))
            }
        };

        let frequency = match self.frequency.as_str() {
            FREQ_ONE_TIME => Frequency::OneTime,
            FREQ_RECURRING => Frequency::Recurring {
                cycle_duration_days: self.cycle_duration_days.unwrap_or(30) as u16,
            },
            other => {
                return Err(ApiError::Data(format!(
                    "pot {} has unknown frequency {other:?}",
                    self.slug
                )))
            }
        };

        let solidarity = match (self.solidarity_threshold_cents, self.solidarity_rate_bps) {
            (Some(threshold), Some(rate_bps)) => Some(SolidarityPolicy {
                threshold,
                rate_bps: rate_bps as u32,
            }),
            (None, None) => None,
            _ => {
                return Err(ApiError::Data(format!(
                    "pot {} has a partial solidarity policy",
                    self.slug
                )))
            }
        };

        Ok(PotConfig {
            objective: self.objective_cents,
            mode,
            frequency,
            solidarity,
            reserve: self
                .reserve_target_cents
                .map(|target| ReservePolicy { target }),
            reserve_balance: self.reserve_balance_cents,
        })
    }
}

/// A redistribution cycle row. One-time pots get a single implicit cycle 1.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CycleRecord {
    pub id: String,
    pub pot_id: String,
    pub cycle_number: i64,
    pub objective_cents: i64,
    pub status: String,
    pub started_at: i64,
    pub ends_at: i64,
    pub ended_at: Option<i64>,
    pub created_at: i64,
}

impl CycleRecord {
    pub fn open(pot: &PotRecord, cycle_number: i64, started_at: i64, ends_at: i64) -> Self {
        CycleRecord {
            id: new_token(8),
            pot_id: pot.id.clone(),
            cycle_number,
            objective_cents: pot.objective_cents,
            status: CYCLE_ACTIVE.to_string(),
            started_at,
            ends_at,
            ended_at: None,
            created_at: started_at,
        }
    }
}

/// A confirmed payment row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContributionRecord {
    pub id: String,
    pub pot_id: String,
    pub cycle_number: i64,
    pub amount_suggested_cents: i64,
    pub amount_paid_cents: i64,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub is_anonymous: bool,
    /// Proof-of-payment reference handed back to the contributor.
    pub contrib_token: String,
    pub paid_at: i64,
    pub created_at: i64,
}

impl ContributionRecord {
    /// Project this row into the engine's input shape.
    pub fn to_input(&self) -> ContributionInput {
        ContributionInput {
            id: self.id.clone(),
            amount_paid: self.amount_paid_cents,
            cycle_number: self.cycle_number as u32,
        }
    }

    /// Display name for public views; anonymous contributors are shown as
    /// a pseudonym derived from the row id.
    pub fn public_name(&self) -> String {
        if self.is_anonymous {
            let suffix = &self.id[self.id.len().saturating_sub(4)..];
            format!("Anonymous #{suffix}")
        } else {
            self.display_name
                .clone()
                .unwrap_or_else(|| "Anonymous".to_string())
        }
    }
}

/// A computed payout row, created only when a cycle closes with a surplus.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefundRecord {
    pub id: String,
    pub pot_id: String,
    pub contribution_id: String,
    pub cycle_number: i64,
    pub amount_cents: i64,
    pub status: String,
    pub processed_at: Option<i64>,
    pub created_at: i64,
}

impl RefundRecord {
    pub fn pending(pot_id: &str, cycle_number: i64, line: &RefundLine, now: i64) -> Self {
        RefundRecord {
            id: new_token(8),
            pot_id: pot_id.to_string(),
            contribution_id: line.contribution_id.clone(),
            cycle_number,
            amount_cents: line.refund,
            status: REFUND_PENDING.to_string(),
            processed_at: None,
            created_at: now,
        }
    }
}

/// Append-only equity ledger row (recurring pots).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EquityRecord {
    pub id: String,
    pub pot_id: String,
    pub contribution_id: String,
    pub cycle_number: i64,
    pub balance_cents: Cents,
    pub created_at: i64,
}
