//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use cascade_core::{
    current_refund_estimate, cycle_stats, estimate_refund, suggested_amount, validate_amount,
    AmountMode, ContributionInput, Frequency, PotConfig, ReservePolicy, SolidarityPolicy, Tier,
};

use crate::closing;
use crate::errors::{ApiError, Result};
use crate::models::{
    new_token, ContributionRecord, CycleRecord, PotRecord, FREQ_ONE_TIME, FREQ_RECURRING,
    MODE_FIXED, MODE_FREE, MODE_TIERS, POT_OPEN,
};
use crate::store::{SharedStore, Store};

pub struct ApiState {
    pub store: SharedStore,
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Deserialize)]
pub struct CreatePotRequest {
    pub name: String,
    pub objective_cents: i64,
    #[serde(flatten)]
    pub mode: AmountMode,
    #[serde(flatten)]
    pub frequency: Frequency,
    pub ends_at: i64,
    pub pin: Option<String>,
    pub solidarity_threshold_cents: Option<i64>,
    pub solidarity_rate_bps: Option<u32>,
    pub reserve_target_cents: Option<i64>,
}

#[derive(Serialize)]
pub struct CreatePotResponse {
    pub slug: String,
    /// Shown once; gates the close operation.
    pub owner_token: String,
}

#[derive(Serialize)]
pub struct PotView {
    pub slug: String,
    pub name: String,
    pub status: String,
    pub objective_cents: i64,
    pub amount_mode: String,
    pub fixed_amount_cents: Option<i64>,
    pub tiers: Option<Vec<Tier>>,
    pub frequency: String,
    pub current_cycle: i64,
    pub ends_at: i64,
    pub total_collected_cents: i64,
    pub contributors_count: u32,
    pub progress_pct: u8,
    pub surplus_cents: i64,
    /// Equal-split refund if the pot closed right now.
    pub current_refund_estimate_cents: i64,
    pub suggested_amount_cents: i64,
    pub estimated_refund_if_i_pay_now_cents: i64,
    pub reserve_target_cents: Option<i64>,
    pub reserve_balance_cents: i64,
}

#[derive(Serialize)]
pub struct ContributionView {
    pub display_name: String,
    pub amount_paid_cents: i64,
    pub paid_at: i64,
}

#[derive(Serialize)]
pub struct ContributionsResponse {
    pub count: usize,
    pub contributions: Vec<ContributionView>,
}

#[derive(Deserialize)]
pub struct ContributeRequest {
    /// Omitted → the pot's suggested amount.
    pub amount_cents: Option<i64>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Serialize)]
pub struct ContributeResponse {
    pub contribution_id: String,
    /// Proof-of-payment reference for the contributor.
    pub contrib_token: String,
    pub amount_paid_cents: i64,
    pub cycle_number: i64,
}

#[derive(Deserialize)]
pub struct EstimateQuery {
    pub amount: Option<i64>,
}

#[derive(Serialize)]
pub struct EstimateResponse {
    pub amount_cents: i64,
    pub estimated_refund_cents: i64,
}

#[derive(Deserialize)]
pub struct CloseRequest {
    pub owner_token: String,
    pub pin: Option<String>,
}

#[derive(Serialize)]
pub struct RefundLineView {
    pub contribution_id: String,
    pub refund_amount_cents: i64,
    pub final_cost_cents: i64,
    pub solidarity_contribution_cents: i64,
}

#[derive(Serialize)]
pub struct CloseResponse {
    pub cycle_number: i64,
    pub pot_closed: bool,
    pub next_cycle: Option<i64>,
    pub total_collected_cents: i64,
    pub total_surplus_cents: i64,
    pub total_solidarity_cents: i64,
    pub reserve_used_cents: i64,
    pub reserve_balance_after_cents: i64,
    pub refunds: Vec<RefundLineView>,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /pots`
///
/// Validate the configuration, mint slug and owner token, open cycle 1.
pub async fn create_pot(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CreatePotRequest>,
) -> Result<(StatusCode, Json<CreatePotResponse>)> {
    let solidarity = match (req.solidarity_threshold_cents, req.solidarity_rate_bps) {
        (Some(threshold), Some(rate_bps)) => Some(SolidarityPolicy { threshold, rate_bps }),
        (None, None) => None,
        _ => {
            return Err(ApiError::BadRequest(
                "solidarity threshold and rate must be configured together".to_string(),
            ))
        }
    };

    let config = PotConfig {
        objective: req.objective_cents,
        mode: req.mode.clone(),
        frequency: req.frequency,
        solidarity,
        reserve: req
            .reserve_target_cents
            .map(|target| ReservePolicy { target }),
        reserve_balance: 0,
    };
    config.validate()?;

    let now = Utc::now().timestamp();
    if req.ends_at <= now {
        return Err(ApiError::BadRequest(
            "ends_at must be in the future".to_string(),
        ));
    }

    let (amount_mode, fixed_amount_cents, tiers) = match &req.mode {
        AmountMode::Fixed { amount } => (MODE_FIXED, Some(*amount), None),
        AmountMode::Tiers { tiers } => (MODE_TIERS, None, Some(serde_json::to_string(tiers)?)),
        AmountMode::Free => (MODE_FREE, None, None),
    };
    let (frequency, cycle_duration_days) = match req.frequency {
        Frequency::OneTime => (FREQ_ONE_TIME, None),
        Frequency::Recurring {
            cycle_duration_days,
        } => (FREQ_RECURRING, Some(i64::from(cycle_duration_days))),
    };

    let pot = PotRecord {
        id: new_token(8),
        slug: new_token(4),
        name: req.name,
        objective_cents: req.objective_cents,
        amount_mode: amount_mode.to_string(),
        fixed_amount_cents,
        tiers,
        frequency: frequency.to_string(),
        cycle_duration_days,
        solidarity_threshold_cents: req.solidarity_threshold_cents,
        solidarity_rate_bps: req.solidarity_rate_bps.map(i64::from),
        reserve_target_cents: req.reserve_target_cents,
        reserve_balance_cents: 0,
        current_cycle: 1,
        status: POT_OPEN.to_string(),
        ends_at: req.ends_at,
        closed_at: None,
        owner_token: new_token(16),
        pin: req.pin,
        created_at: now,
    };

    let first_cycle_end = match cycle_duration_days {
        Some(days) => now + days * 86_400,
        None => req.ends_at,
    };
    let first_cycle = CycleRecord::open(&pot, 1, now, first_cycle_end);

    state.store.create_pot(&pot, &first_cycle).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePotResponse {
            slug: pot.slug,
            owner_token: pot.owner_token,
        }),
    ))
}

/// `GET /pots/:slug`
pub async fn get_pot(
    State(state): State<Arc<ApiState>>,
    Path(slug): Path<String>,
) -> Result<Json<PotView>> {
    let pot = state
        .store
        .find_pot(&slug)
        .await?
        .ok_or(ApiError::NotFound("pot"))?;
    let view = pot_view(state.store.as_ref(), &pot).await?;
    Ok(Json(view))
}

/// `GET /pots/:slug/contributions`
///
/// Public list for the current cycle; anonymous contributors are shown
/// under a pseudonym.
pub async fn list_contributions(
    State(state): State<Arc<ApiState>>,
    Path(slug): Path<String>,
) -> Result<Json<ContributionsResponse>> {
    let pot = state
        .store
        .find_pot(&slug)
        .await?
        .ok_or(ApiError::NotFound("pot"))?;
    let records = state
        .store
        .list_contributions(&pot.id, pot.current_cycle)
        .await?;

    let contributions: Vec<ContributionView> = records
        .iter()
        .map(|r| ContributionView {
            display_name: r.public_name(),
            amount_paid_cents: r.amount_paid_cents,
            paid_at: r.paid_at,
        })
        .collect();

    Ok(Json(ContributionsResponse {
        count: contributions.len(),
        contributions,
    }))
}

/// `POST /pots/:slug/contribute`
///
/// Record an already-confirmed payment against the current cycle. State
/// checks run before any amount validation.
pub async fn contribute(
    State(state): State<Arc<ApiState>>,
    Path(slug): Path<String>,
    Json(req): Json<ContributeRequest>,
) -> Result<(StatusCode, Json<ContributeResponse>)> {
    let pot = state
        .store
        .find_pot(&slug)
        .await?
        .ok_or(ApiError::NotFound("pot"))?;
    if !pot.is_open() {
        return Err(ApiError::PotClosed);
    }
    let now = Utc::now().timestamp();
    if now > pot.ends_at {
        return Err(ApiError::PotEnded);
    }

    let config = pot.config()?;
    let existing = state
        .store
        .list_contributions(&pot.id, pot.current_cycle)
        .await?;

    let suggested = suggested_amount(&config, existing.len() as u32);
    let amount = req.amount_cents.unwrap_or(suggested);
    validate_amount(&config, amount)?;

    let contribution = ContributionRecord {
        id: new_token(8),
        pot_id: pot.id.clone(),
        cycle_number: pot.current_cycle,
        amount_suggested_cents: suggested,
        amount_paid_cents: amount,
        email: req.email,
        display_name: req.display_name,
        is_anonymous: req.is_anonymous,
        contrib_token: new_token(16),
        paid_at: now,
        created_at: now,
    };
    state.store.insert_contribution(&contribution).await?;

    Ok((
        StatusCode::CREATED,
        Json(ContributeResponse {
            contribution_id: contribution.id,
            contrib_token: contribution.contrib_token,
            amount_paid_cents: contribution.amount_paid_cents,
            cycle_number: contribution.cycle_number,
        }),
    ))
}

/// `GET /pots/:slug/estimate?amount=N`
///
/// "If I contribute now, what would I get back?" — a pure projection, no
/// state is touched.
pub async fn estimate(
    State(state): State<Arc<ApiState>>,
    Path(slug): Path<String>,
    Query(query): Query<EstimateQuery>,
) -> Result<Json<EstimateResponse>> {
    let pot = state
        .store
        .find_pot(&slug)
        .await?
        .ok_or(ApiError::NotFound("pot"))?;
    let config = pot.config()?;
    let records = state
        .store
        .list_contributions(&pot.id, pot.current_cycle)
        .await?;
    let inputs: Vec<ContributionInput> = records.iter().map(|r| r.to_input()).collect();

    let amount = query
        .amount
        .unwrap_or_else(|| suggested_amount(&config, inputs.len() as u32));
    validate_amount(&config, amount)?;
    let estimated = estimate_refund(&config, &inputs, amount, pot.current_cycle as u32)?;

    Ok(Json(EstimateResponse {
        amount_cents: amount,
        estimated_refund_cents: estimated,
    }))
}

/// `POST /pots/:slug/close`
///
/// Owner-gated: settles the active cycle, persists the outcome, and either
/// terminates the pot or rolls it over.
pub async fn close_pot(
    State(state): State<Arc<ApiState>>,
    Path(slug): Path<String>,
    Json(req): Json<CloseRequest>,
) -> Result<Json<CloseResponse>> {
    let pot = state
        .store
        .find_pot(&slug)
        .await?
        .ok_or(ApiError::NotFound("pot"))?;
    if pot.owner_token != req.owner_token {
        return Err(ApiError::Unauthorized);
    }
    if pot.pin.is_some() && pot.pin != req.pin {
        return Err(ApiError::Unauthorized);
    }

    let now = Utc::now().timestamp();
    let outcome = closing::close_active_cycle(state.store.as_ref(), &pot, now).await?;

    let refunds = outcome
        .settlement
        .lines
        .iter()
        .map(|line| RefundLineView {
            contribution_id: line.contribution_id.clone(),
            refund_amount_cents: line.refund,
            final_cost_cents: line.final_cost,
            solidarity_contribution_cents: line.solidarity,
        })
        .collect();

    Ok(Json(CloseResponse {
        cycle_number: outcome.cycle_number,
        pot_closed: outcome.pot_closed,
        next_cycle: outcome.next_cycle,
        total_collected_cents: outcome.settlement.total_collected,
        total_surplus_cents: outcome.settlement.total_surplus,
        total_solidarity_cents: outcome.settlement.total_solidarity,
        reserve_used_cents: outcome.settlement.reserve_used,
        reserve_balance_after_cents: outcome.settlement.reserve_balance_after,
        refunds,
    }))
}

// ─────────────────────────────────────────────────────────
// View assembly
// ─────────────────────────────────────────────────────────

async fn pot_view(store: &dyn Store, pot: &PotRecord) -> Result<PotView> {
    let config = pot.config()?;
    let records = store.list_contributions(&pot.id, pot.current_cycle).await?;
    let inputs: Vec<ContributionInput> = records.iter().map(|r| r.to_input()).collect();

    let stats = cycle_stats(pot.objective_cents, &inputs);
    let suggested = suggested_amount(&config, stats.contributors);
    let estimated = estimate_refund(&config, &inputs, suggested, pot.current_cycle as u32)?;

    Ok(PotView {
        slug: pot.slug.clone(),
        name: pot.name.clone(),
        status: pot.status.clone(),
        objective_cents: pot.objective_cents,
        amount_mode: pot.amount_mode.clone(),
        fixed_amount_cents: pot.fixed_amount_cents,
        tiers: pot.tier_list()?,
        frequency: pot.frequency.clone(),
        current_cycle: pot.current_cycle,
        ends_at: pot.ends_at,
        total_collected_cents: stats.total_collected,
        contributors_count: stats.contributors,
        progress_pct: stats.progress_pct,
        surplus_cents: stats.surplus,
        current_refund_estimate_cents: current_refund_estimate(
            pot.objective_cents,
            stats.total_collected,
            stats.contributors,
        ),
        suggested_amount_cents: suggested,
        estimated_refund_if_i_pay_now_cents: estimated,
        reserve_target_cents: pot.reserve_target_cents,
        reserve_balance_cents: pot.reserve_balance_cents,
    })
}
