use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use super::models::*;
use crate::{
    auth::CredentialStore,
    dispatch::ExecutionDispatcher,
    error::{AppError, AppResult},
    ledger::ReservationLedger,
    liquidity::{Pool, SweepCoordinator},
    registry::{PaymentId, PaymentRegistry},
    scheduler::classify,
};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<PaymentRegistry>,
    pub ledger: Arc<ReservationLedger>,
    pub dispatcher: Arc<ExecutionDispatcher>,
    pub sweep: Arc<SweepCoordinator>,
    pub credentials: Arc<dyn CredentialStore>,
}

fn unix_now() -> u64 {
    Utc::now().timestamp() as u64
}

fn parse_amount(raw: &str) -> AppResult<u128> {
    raw.trim()
        .parse::<u128>()
        .map_err(|_| AppError::BadRequest(format!("Invalid amount: {}", raw)))
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "payroll-scheduler".to_string(),
        timestamp: unix_now(),
    })
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let user = state.credentials.authenticate(&request.email, &request.password)?;
    info!("Login: {} ({:?})", user.email, user.role);
    Ok(Json(LoginResponse { user }))
}

/// POST /api/v1/payments
pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> AppResult<Json<PaymentResponse>> {
    request
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let amount = parse_amount(&request.amount)?;
    let now = unix_now();
    let payment = state
        .registry
        .create(&request.recipient, amount, request.interval_secs, now)?;

    let status = classify(&payment, now, state.ledger.balance());
    Ok(Json(PaymentResponse::from_payment(&payment, status)))
}

/// GET /api/v1/payments
pub async fn list_payments(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PaymentResponse>>> {
    let now = unix_now();
    let balance = state.ledger.balance();
    let payments = state
        .registry
        .list_all()
        .iter()
        .map(|p| PaymentResponse::from_payment(p, classify(p, now, balance)))
        .collect();
    Ok(Json(payments))
}

/// GET /api/v1/payments/:id
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<PaymentId>,
) -> AppResult<Json<PaymentResponse>> {
    let now = unix_now();
    let payment = state.registry.get(id)?;
    let status = classify(&payment, now, state.ledger.balance());
    Ok(Json(PaymentResponse::from_payment(&payment, status)))
}

/// POST /api/v1/payments/:id/deactivate
pub async fn deactivate_payment(
    State(state): State<AppState>,
    Path(id): Path<PaymentId>,
) -> AppResult<Json<PaymentResponse>> {
    state.registry.deactivate(id)?;
    let payment = state.registry.get(id)?;
    let status = classify(&payment, unix_now(), state.ledger.balance());
    Ok(Json(PaymentResponse::from_payment(&payment, status)))
}

/// POST /api/v1/payments/:id/process
///
/// Manual trigger; goes through the same dispatcher as the poll loop,
/// so due-ness, funding and per-payment exclusion all still apply.
pub async fn process_payment(
    State(state): State<AppState>,
    Path(id): Path<PaymentId>,
) -> AppResult<Json<ExecutionResponse>> {
    let now = unix_now();
    let outcome = state.dispatcher.process(id, now).await?;
    let next_due = state.registry.get(id)?.next_due_at();
    Ok(Json(ExecutionResponse::from_outcome(&outcome, next_due)))
}

/// POST /api/v1/treasury/deposit
pub async fn treasury_deposit(
    State(state): State<AppState>,
    Json(request): Json<AmountRequest>,
) -> AppResult<Json<TransferResponse>> {
    let amount = parse_amount(&request.amount)?;
    if amount == 0 {
        return Err(AppError::BadRequest("Amount must be greater than zero".to_string()));
    }

    let tx_hash = state.sweep.deposit_funds(amount).await?;
    Ok(Json(TransferResponse {
        tx_hash,
        balance: state.ledger.balance().to_string(),
    }))
}

/// POST /api/v1/treasury/withdraw
///
/// Capped at the idle amount; reserved obligations cannot be drained.
pub async fn treasury_withdraw(
    State(state): State<AppState>,
    Json(request): Json<AmountRequest>,
) -> AppResult<Json<TransferResponse>> {
    let amount = parse_amount(&request.amount)?;
    let tx_hash = state.sweep.withdraw_idle(amount, unix_now()).await?;
    Ok(Json(TransferResponse {
        tx_hash,
        balance: state.ledger.balance().to_string(),
    }))
}

/// GET /api/v1/treasury/balance
pub async fn treasury_balance(
    State(state): State<AppState>,
) -> AppResult<Json<TreasuryResponse>> {
    let now = unix_now();
    let balance = state.ledger.balance();
    let idle = state.sweep.idle_amount(now);
    Ok(Json(TreasuryResponse {
        balance: balance.to_string(),
        reserved: (balance - idle).to_string(),
        idle: idle.to_string(),
        deployed: state.sweep.positions().total_deposited().to_string(),
    }))
}

/// GET /api/v1/liquidity/pools
pub async fn list_pools(State(state): State<AppState>) -> Json<Vec<Pool>> {
    Json(state.sweep.pools().to_vec())
}

/// GET /api/v1/liquidity/positions
pub async fn list_positions(
    State(state): State<AppState>,
) -> Json<Vec<PositionResponse>> {
    let now = unix_now();
    Json(
        state
            .sweep
            .positions()
            .list()
            .iter()
            .map(|p| PositionResponse::from_position(p, now))
            .collect(),
    )
}

/// GET /api/v1/admin/unreconciled
pub async fn list_unreconciled(
    State(state): State<AppState>,
) -> Json<Vec<UnreconciledResponse>> {
    Json(
        state
            .dispatcher
            .unreconciled()
            .list()
            .iter()
            .map(UnreconciledResponse::from)
            .collect(),
    )
}

/// POST /api/v1/admin/unreconciled/:payment_id/resolve
pub async fn resolve_unreconciled(
    State(state): State<AppState>,
    Path(payment_id): Path<PaymentId>,
    Json(request): Json<ResolveRequest>,
) -> AppResult<Json<ResolveResponse>> {
    state
        .dispatcher
        .resolve_unreconciled(payment_id, request.confirmed, unix_now())?;
    Ok(Json(ResolveResponse {
        payment_id,
        resolution: if request.confirmed {
            "confirmed".to_string()
        } else {
            "rolled_back".to_string()
        },
    }))
}
