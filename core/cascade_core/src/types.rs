//! # Types
//!
//! Shared data structures used across all modules of the settlement engine.
//!
//! ## Design decisions
//!
//! ### Integer cents everywhere
//!
//! Every monetary value crosses every boundary as an [`Cents`] (`i64` minor
//! units). The engine never touches floating point: the solidarity rate is
//! carried in basis points and the allocator works in whole cents, so two
//! runs over the same inputs produce byte-identical results.
//!
//! ### Modes as sum types
//!
//! Contribution mode and frequency are enums dispatched via exhaustive
//! `match` — adding a mode is a compile-time-checked exercise, not a string
//! comparison.
//!
//! ### Config snapshot per call
//!
//! [`PotConfig`] is an immutable snapshot of a pot's rules (objective, mode,
//! solidarity, reserve) plus the running reserve balance at the time of the
//! call. The engine never mutates it; the post-closing reserve balance comes
//! back in the [`Settlement`] output and it is the caller's job to persist it.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Monetary amount in integer minor units (euro cents).
pub type Cents = i64;

/// Smallest accepted contribution, in cents.
pub const MIN_CONTRIBUTION: Cents = 10;

/// Solidarity rates are expressed in basis points; 10_000 bps = 100%.
pub const BPS_SCALE: u32 = 10_000;

/// One predefined contribution tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub amount: Cents,
    pub label: String,
}

/// How contributors pick their amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmountMode {
    /// Everyone pays the same configured amount.
    Fixed { amount: Cents },
    /// Contributors pick one of the configured tiers.
    Tiers { tiers: Vec<Tier> },
    /// Contributors pick any amount at or above the floor.
    Free,
}

/// One-shot pot or recurring redistribution cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frequency", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    OneTime,
    Recurring { cycle_duration_days: u16 },
}

/// Levy configuration: the slice of a contribution above `threshold` that is
/// withheld from refund eligibility, at `rate_bps` basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidarityPolicy {
    pub threshold: Cents,
    pub rate_bps: u32,
}

/// Reserve configuration: surplus fills the reserve up to `target` before any
/// redistribution happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservePolicy {
    pub target: Cents,
}

/// Immutable snapshot of a pot's rules, supplied to every engine call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotConfig {
    /// Target amount to collect per cycle.
    pub objective: Cents,
    pub mode: AmountMode,
    pub frequency: Frequency,
    pub solidarity: Option<SolidarityPolicy>,
    pub reserve: Option<ReservePolicy>,
    /// Running reserve balance at the time of the call.
    pub reserve_balance: Cents,
}

impl PotConfig {
    /// Check the configuration invariants the engine relies on.
    ///
    /// Amount validation of individual contributions happens in
    /// [`crate::amount::validate_amount`]; this guards the pot-level rules:
    /// positive objective, tier floors, rate range, reserve target.
    pub fn validate(&self) -> Result<()> {
        if self.objective <= 0 {
            return Err(CoreError::InvalidObjective {
                objective: self.objective,
            });
        }
        match &self.mode {
            AmountMode::Fixed { amount } => {
                if *amount < MIN_CONTRIBUTION {
                    return Err(CoreError::AmountBelowMinimum { amount: *amount });
                }
            }
            AmountMode::Tiers { tiers } => {
                if tiers.is_empty() {
                    return Err(CoreError::NoTiersConfigured);
                }
                for tier in tiers {
                    if tier.amount < MIN_CONTRIBUTION {
                        return Err(CoreError::InvalidTier {
                            amount: tier.amount,
                        });
                    }
                }
            }
            AmountMode::Free => {}
        }
        if let Frequency::Recurring {
            cycle_duration_days,
        } = self.frequency
        {
            if !(1..=365).contains(&cycle_duration_days) {
                return Err(CoreError::InvalidCycleDuration {
                    days: cycle_duration_days,
                });
            }
        }
        if let Some(solidarity) = &self.solidarity {
            if solidarity.threshold < 0 {
                return Err(CoreError::NegativeAmount {
                    amount: solidarity.threshold,
                });
            }
            if solidarity.rate_bps > BPS_SCALE {
                return Err(CoreError::InvalidRate {
                    rate_bps: solidarity.rate_bps,
                });
            }
        }
        if let Some(reserve) = &self.reserve {
            if reserve.target <= 0 {
                return Err(CoreError::InvalidReserveTarget {
                    target: reserve.target,
                });
            }
        }
        if self.reserve_balance < 0 {
            return Err(CoreError::NegativeAmount {
                amount: self.reserve_balance,
            });
        }
        Ok(())
    }
}

/// One confirmed payment, as the engine sees it. Display metadata (email,
/// name, anonymity) never reaches the settlement math.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionInput {
    pub id: String,
    pub amount_paid: Cents,
    pub cycle_number: u32,
}

/// The cycle being settled. For one-time pots this is always cycle 1 with
/// the pot's own objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSnapshot {
    pub number: u32,
    pub objective: Cents,
}

/// Breakdown of one payment into its levy and refund-eligible parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidaritySplit {
    /// `max(0, paid − threshold)`.
    pub above_threshold: Cents,
    /// Levy withheld from refund eligibility (rounded down).
    pub solidarity: Cents,
    /// `paid − solidarity`: the cap on this contribution's refund.
    pub refundable: Cents,
}

/// Per-contribution outcome of a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundLine {
    pub contribution_id: String,
    pub amount_paid: Cents,
    pub refund: Cents,
    /// `amount_paid − refund`.
    pub final_cost: Cents,
    pub solidarity: Cents,
}

/// Append-only equity ledger row: one contribution's net position for one
/// cycle (`paid − refunded − solidarity`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityDelta {
    pub contribution_id: String,
    pub cycle_number: u32,
    pub balance: Cents,
}

/// Full result of closing one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub lines: Vec<RefundLine>,
    pub equity: Vec<EquityDelta>,
    pub total_collected: Cents,
    /// `max(0, collected − objective)` — the amount being redistributed
    /// before reserve absorption.
    pub total_surplus: Cents,
    pub total_solidarity: Cents,
    /// Portion of the surplus absorbed by the reserve this cycle.
    pub reserve_used: Cents,
    pub reserve_balance_after: Cents,
}

/// Aggregate figures for a cycle's dashboard display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    pub total_collected: Cents,
    pub surplus: Cents,
    pub contributors: u32,
    pub average_contribution: Cents,
    /// Collected-over-objective, capped at 100.
    pub progress_pct: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> PotConfig {
        PotConfig {
            objective: 20_000,
            mode: AmountMode::Fixed { amount: 10_000 },
            frequency: Frequency::OneTime,
            solidarity: None,
            reserve: None,
            reserve_balance: 0,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_objective() {
        let mut config = base_config();
        config.objective = 0;
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidObjective { .. })
        ));
    }

    #[test]
    fn rejects_tier_below_floor() {
        let mut config = base_config();
        config.mode = AmountMode::Tiers {
            tiers: vec![Tier {
                amount: 5,
                label: "0,05 €".into(),
            }],
        };
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidTier { amount: 5 })
        ));
    }

    #[test]
    fn rejects_empty_tier_list() {
        let mut config = base_config();
        config.mode = AmountMode::Tiers { tiers: vec![] };
        assert!(matches!(
            config.validate(),
            Err(CoreError::NoTiersConfigured)
        ));
    }

    #[test]
    fn rejects_rate_above_one() {
        let mut config = base_config();
        config.solidarity = Some(SolidarityPolicy {
            threshold: 5_000,
            rate_bps: 10_001,
        });
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidRate { rate_bps: 10_001 })
        ));
    }

    #[test]
    fn rejects_reserve_without_positive_target() {
        let mut config = base_config();
        config.reserve = Some(ReservePolicy { target: 0 });
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidReserveTarget { target: 0 })
        ));
    }

    #[test]
    fn rejects_cycle_duration_out_of_range() {
        let mut config = base_config();
        config.frequency = Frequency::Recurring {
            cycle_duration_days: 366,
        };
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidCycleDuration { days: 366 })
        ));
    }

    #[test]
    fn mode_serializes_with_screaming_tags() {
        let mode = AmountMode::Free;
        let json = serde_json::to_value(&mode).unwrap();
        assert_eq!(json["mode"], "FREE");

        let frequency = Frequency::Recurring {
            cycle_duration_days: 30,
        };
        let json = serde_json::to_value(frequency).unwrap();
        assert_eq!(json["frequency"], "RECURRING");
        assert_eq!(json["cycle_duration_days"], 30);
    }
}
