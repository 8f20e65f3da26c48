use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Principal;
use crate::dispatch::{ExecutionOutcome, UnreconciledTransfer};
use crate::liquidity::{LockPeriod, Position};
use crate::registry::{Payment, PaymentId};
use crate::scheduler::PaymentStatus;

// ========== REQUEST MODELS ==========

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request to register a recurring payment
///
/// Amounts cross the wire as decimal strings; u128 does not survive
/// JSON numbers in every client.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    #[validate(length(equal = 42))]
    pub recipient: String,
    pub amount: String,
    #[validate(range(min = 60))]
    pub interval_secs: u64,
}

/// Treasury deposit / withdrawal request
#[derive(Debug, Deserialize, Validate)]
pub struct AmountRequest {
    pub amount: String,
}

/// Manual resolution verdict for a parked transfer
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// true if the operator confirmed the transfer landed on chain
    pub confirmed: bool,
}

// ========== RESPONSE MODELS ==========

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: Principal,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: PaymentId,
    pub recipient: String,
    pub amount: String,
    pub interval_secs: u64,
    pub last_payment: u64,
    pub next_due: u64,
    pub is_active: bool,
    pub created_at: u64,
    pub status: PaymentStatus,
}

impl PaymentResponse {
    pub fn from_payment(payment: &Payment, status: PaymentStatus) -> Self {
        Self {
            id: payment.id,
            recipient: payment.recipient.clone(),
            amount: payment.amount.to_string(),
            interval_secs: payment.interval_secs,
            last_payment: payment.last_payment,
            next_due: payment.next_due_at(),
            is_active: payment.is_active,
            created_at: payment.created_at,
            status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExecutionResponse {
    pub payment_id: PaymentId,
    pub amount: String,
    pub tx_hash: Option<String>,
    pub executed_at: u64,
    pub next_due: u64,
}

impl ExecutionResponse {
    pub fn from_outcome(outcome: &ExecutionOutcome, next_due: u64) -> Self {
        Self {
            payment_id: outcome.payment_id,
            amount: outcome.amount.to_string(),
            tx_hash: outcome.tx_hash.clone(),
            executed_at: outcome.executed_at,
            next_due,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TreasuryResponse {
    /// Liquid pooled balance
    pub balance: String,
    /// Earmarked for obligations within the sweep horizon
    pub reserved: String,
    /// Withdrawable without touching reservations
    pub idle: String,
    /// Principal currently deployed in yield pools
    pub deployed: String,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub tx_hash: String,
    pub balance: String,
}

#[derive(Debug, Serialize)]
pub struct PositionResponse {
    pub id: Uuid,
    pub pool_id: String,
    pub amount: String,
    pub apy_bps: u32,
    pub lock_period: LockPeriod,
    pub deposit_time: u64,
    pub unlock_at: u64,
    pub unlocked: bool,
    pub pending_rewards: String,
}

impl PositionResponse {
    pub fn from_position(position: &Position, now: u64) -> Self {
        Self {
            id: position.id,
            pool_id: position.pool_id.clone(),
            amount: position.amount.to_string(),
            apy_bps: position.apy_bps,
            lock_period: position.lock_period,
            deposit_time: position.deposit_time,
            unlock_at: position.unlock_at(),
            unlocked: position.is_unlocked(now),
            pending_rewards: position.pending_rewards(now).to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnreconciledResponse {
    pub payment_id: PaymentId,
    pub transfer_id: Uuid,
    pub tx_hash: Option<String>,
    pub amount: String,
    pub recipient: String,
    pub submitted_at: u64,
}

impl From<&UnreconciledTransfer> for UnreconciledResponse {
    fn from(entry: &UnreconciledTransfer) -> Self {
        Self {
            payment_id: entry.payment_id,
            transfer_id: entry.handle.id,
            tx_hash: entry.handle.tx_hash.clone(),
            amount: entry.amount.to_string(),
            recipient: entry.recipient.clone(),
            submitted_at: entry.submitted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub payment_id: PaymentId,
    pub resolution: String,
}
