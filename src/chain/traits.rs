use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;

/// Handle for a submitted transfer, used to query its eventual outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferHandle {
    pub id: Uuid,
    /// Gateway-assigned transaction hash, if already known at submit time
    pub tx_hash: Option<String>,
}

/// Eventual state of a submitted transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "reason")]
pub enum TransferState {
    Pending,
    Confirmed,
    Failed(String),
}

/// Chain ledger collaborator - the one genuinely fallible external step
///
/// All calls may incur latency and are eventually consistent with local
/// state; callers bound them with timeouts and reconcile ambiguity via
/// `confirm` before retrying.
#[async_trait]
pub trait ChainLedger: Send + Sync {
    /// Submit a transfer of pooled funds to a recipient. Returns a handle
    /// once the gateway has accepted the submission; transport failure
    /// means nothing was submitted.
    async fn submit_transfer(&self, recipient: &str, amount: u128) -> AppResult<TransferHandle>;

    /// Query the current state of a previously submitted transfer
    async fn confirm(&self, handle: &TransferHandle) -> AppResult<TransferState>;

    /// On-chain pooled balance
    async fn current_balance(&self) -> AppResult<u128>;

    /// Move funds into the pooled contract balance
    async fn deposit(&self, amount: u128) -> AppResult<String>;

    /// Move funds out of the pooled contract balance (or a yield pool)
    async fn withdraw(&self, amount: u128) -> AppResult<String>;
}
