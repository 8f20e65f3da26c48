use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

use super::traits::{ChainLedger, TransferHandle, TransferState};
use crate::error::{AppError, AppResult};

/// Scripted behavior for the next submitted transfer
#[derive(Debug, Clone)]
pub enum TransferScript {
    /// Confirm immediately on the first query
    Confirm,
    /// Reject at submission time
    RejectSubmit(String),
    /// Report `Pending` for the first N confirmation queries, then confirm
    PendingThenConfirm(u32),
    /// Report `Pending` for the first N confirmation queries, then fail
    PendingThenFail(u32, String),
    /// Stay pending forever (forces the reconciliation window to expire)
    PendingForever,
}

struct TransferRecord {
    script: TransferScript,
    amount: u128,
    confirm_queries: u32,
    refunded: bool,
}

struct MemoryState {
    balance: u128,
    transfers: HashMap<Uuid, TransferRecord>,
    scripts: VecDeque<TransferScript>,
    submitted: Vec<(String, u128)>,
    submit_delay: Option<Duration>,
}

/// In-memory chain ledger
///
/// Stands in for the gateway when `CHAIN_GATEWAY_URL` is not configured,
/// and drives the dispatcher tests: transfers follow a scripted outcome
/// queue so timeout and reconciliation paths are reachable on demand.
pub struct InMemoryChain {
    state: Mutex<MemoryState>,
}

impl InMemoryChain {
    pub fn new(initial_balance: u128) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                balance: initial_balance,
                transfers: HashMap::new(),
                scripts: VecDeque::new(),
                submitted: Vec::new(),
                submit_delay: None,
            }),
        }
    }

    /// Queue a scripted outcome for the next submitted transfer
    pub fn script_next(&self, script: TransferScript) {
        self.state.lock().scripts.push_back(script);
    }

    /// Delay every submission (drives the bounded-timeout path)
    pub fn set_submit_delay(&self, delay: Duration) {
        self.state.lock().submit_delay = Some(delay);
    }

    /// Transfers accepted by the chain so far, in submission order
    pub fn submitted_transfers(&self) -> Vec<(String, u128)> {
        self.state.lock().submitted.clone()
    }

    fn mock_tx_hash() -> String {
        format!("0x{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>())
    }
}

#[async_trait]
impl ChainLedger for InMemoryChain {
    async fn submit_transfer(&self, recipient: &str, amount: u128) -> AppResult<TransferHandle> {
        let delay = self.state.lock().submit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        let script = state.scripts.pop_front().unwrap_or(TransferScript::Confirm);

        if let TransferScript::RejectSubmit(reason) = &script {
            return Err(AppError::Chain(reason.clone()));
        }

        if amount > state.balance {
            return Err(AppError::Chain("insufficient contract balance".to_string()));
        }
        state.balance -= amount;
        state.submitted.push((recipient.to_string(), amount));

        let id = Uuid::new_v4();
        state.transfers.insert(
            id,
            TransferRecord {
                script,
                amount,
                confirm_queries: 0,
                refunded: false,
            },
        );

        Ok(TransferHandle {
            id,
            tx_hash: Some(Self::mock_tx_hash()),
        })
    }

    async fn confirm(&self, handle: &TransferHandle) -> AppResult<TransferState> {
        let mut state = self.state.lock();
        let record = state
            .transfers
            .get_mut(&handle.id)
            .ok_or_else(|| AppError::Chain(format!("Unknown transfer: {}", handle.id)))?;
        record.confirm_queries += 1;
        let queries = record.confirm_queries;

        let result = match &record.script {
            TransferScript::Confirm => TransferState::Confirmed,
            TransferScript::PendingThenConfirm(n) if queries > *n => TransferState::Confirmed,
            TransferScript::PendingThenConfirm(_) => TransferState::Pending,
            TransferScript::PendingThenFail(n, reason) if queries > *n => {
                TransferState::Failed(reason.clone())
            }
            TransferScript::PendingThenFail(..) => TransferState::Pending,
            TransferScript::PendingForever => TransferState::Pending,
            TransferScript::RejectSubmit(_) => unreachable!("rejected at submit"),
        };

        // A failed transfer returns its own funds to the contract
        // balance, exactly once
        let refund = match result {
            TransferState::Failed(_) if !record.refunded => {
                record.refunded = true;
                Some(record.amount)
            }
            _ => None,
        };
        if let Some(amount) = refund {
            state.balance += amount;
        }

        Ok(result)
    }

    async fn current_balance(&self) -> AppResult<u128> {
        Ok(self.state.lock().balance)
    }

    async fn deposit(&self, amount: u128) -> AppResult<String> {
        let mut state = self.state.lock();
        state.balance += amount;
        info!("In-memory chain deposit: +{}", amount);
        Ok(Self::mock_tx_hash())
    }

    async fn withdraw(&self, amount: u128) -> AppResult<String> {
        let mut state = self.state.lock();
        if amount > state.balance {
            return Err(AppError::Chain("insufficient contract balance".to_string()));
        }
        state.balance -= amount;
        info!("In-memory chain withdrawal: -{}", amount);
        Ok(Self::mock_tx_hash())
    }
}
