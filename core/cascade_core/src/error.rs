//! Engine-wide error types.
//!
//! Business-rule violations (bad amount, bad configuration) are ordinary
//! `Err` values surfaced to the caller with a human-readable reason.
//! [`CoreError::OverDistribution`] is different: it marks a broken caller
//! contract (asked to hand out more than the refundable total) and should be
//! treated as fatal upstream, never retried or clamped.

use thiserror::Error;

use crate::format::{format_eur, format_eur_list};
use crate::types::Cents;

fn eur(cents: &Cents) -> String {
    format_eur(*cents)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("minimum contribution is 0,10 €")]
    AmountBelowMinimum { amount: Cents },

    #[error("amount must be exactly {}", eur(.required))]
    FixedAmountMismatch { required: Cents },

    #[error("invalid amount, accepted values: {}", format_eur_list(.accepted))]
    AmountNotInTiers { accepted: Vec<Cents> },

    #[error("no tiers configured")]
    NoTiersConfigured,

    #[error("objective must be positive, got {objective}")]
    InvalidObjective { objective: Cents },

    #[error("tier amount {amount} is below the 10 cent floor")]
    InvalidTier { amount: Cents },

    #[error("solidarity rate must be between 0 and 10000 bps, got {rate_bps}")]
    InvalidRate { rate_bps: u32 },

    #[error("reserve target must be positive when the reserve is enabled, got {target}")]
    InvalidReserveTarget { target: Cents },

    #[error("cycle duration must be between 1 and 365 days, got {days}")]
    InvalidCycleDuration { days: u16 },

    #[error("negative amount in settlement input: {amount}")]
    NegativeAmount { amount: Cents },

    #[error(
        "asked to distribute {available} cents against only {total_refundable} refundable; \
         {leftover} cents could not be allocated"
    )]
    OverDistribution {
        available: Cents,
        total_refundable: Cents,
        leftover: Cents,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;
