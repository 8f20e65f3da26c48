use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::chain::{ChainLedger, TransferHandle, TransferState};
use crate::registry::PaymentId;

/// Backoff policy for re-querying an ambiguous transfer after a timeout
#[derive(Debug, Clone)]
pub struct ReconcilePolicy {
    pub initial_backoff: Duration,
    /// Total reconciliation window; once exceeded the transfer is parked
    /// for manual review
    pub max_window: Duration,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(5),
            max_window: Duration::from_secs(300),
        }
    }
}

/// Outcome of a bounded reconciliation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Confirmed,
    Failed(String),
    /// Window exhausted without a definitive answer
    Unresolved,
}

/// Re-query the chain with exponential backoff until the transfer resolves
/// or the window closes. Transport errors count as still-pending.
pub async fn reconcile(
    chain: &dyn ChainLedger,
    handle: &TransferHandle,
    policy: &ReconcilePolicy,
) -> ReconcileOutcome {
    let mut backoff = policy.initial_backoff;
    let mut elapsed = Duration::ZERO;

    while elapsed < policy.max_window {
        let wait = backoff.min(policy.max_window - elapsed);
        tokio::time::sleep(wait).await;
        elapsed += wait;
        backoff = backoff.saturating_mul(2);

        match chain.confirm(handle).await {
            Ok(TransferState::Confirmed) => return ReconcileOutcome::Confirmed,
            Ok(TransferState::Failed(reason)) => return ReconcileOutcome::Failed(reason),
            Ok(TransferState::Pending) => continue,
            Err(e) => {
                warn!("Reconciliation query failed for {}: {}", handle.id, e);
                continue;
            }
        }
    }

    ReconcileOutcome::Unresolved
}

/// A transfer whose outcome could not be established within the
/// reconciliation window. Terminal pending human intervention; the debit
/// stays held and the payment id is blocked from dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct UnreconciledTransfer {
    pub payment_id: PaymentId,
    pub handle: TransferHandle,
    pub amount: u128,
    pub recipient: String,
    pub submitted_at: u64,
}

/// Store of transfers awaiting manual review - never silently dropped
#[derive(Default)]
pub struct UnreconciledStore {
    entries: RwLock<Vec<UnreconciledTransfer>>,
}

impl UnreconciledStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn park(&self, entry: UnreconciledTransfer) {
        warn!(
            "Transfer {} for payment {} parked as unreconciled ({} to {})",
            entry.handle.id, entry.payment_id, entry.amount, entry.recipient
        );
        self.entries.write().push(entry);
    }

    pub fn contains(&self, payment_id: PaymentId) -> bool {
        self.entries
            .read()
            .iter()
            .any(|e| e.payment_id == payment_id)
    }

    pub fn list(&self) -> Vec<UnreconciledTransfer> {
        self.entries.read().clone()
    }

    /// Remove and return the parked entry for a payment, if any
    pub fn take(&self, payment_id: PaymentId) -> Option<UnreconciledTransfer> {
        let mut entries = self.entries.write();
        let pos = entries.iter().position(|e| e.payment_id == payment_id)?;
        let entry = entries.remove(pos);
        info!(
            "Unreconciled transfer {} for payment {} taken for resolution",
            entry.handle.id, entry.payment_id
        );
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{InMemoryChain, TransferScript};

    fn fast_policy() -> ReconcilePolicy {
        ReconcilePolicy {
            initial_backoff: Duration::from_millis(1),
            max_window: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_reconcile_eventual_confirm() {
        let chain = InMemoryChain::new(1_000);
        chain.script_next(TransferScript::PendingThenConfirm(2));
        let handle = chain.submit_transfer("0xabc", 100).await.unwrap();

        let outcome = reconcile(&chain, &handle, &fast_policy()).await;
        assert_eq!(outcome, ReconcileOutcome::Confirmed);
    }

    #[tokio::test]
    async fn test_reconcile_window_exhaustion() {
        let chain = InMemoryChain::new(1_000);
        chain.script_next(TransferScript::PendingForever);
        let handle = chain.submit_transfer("0xabc", 100).await.unwrap();

        let outcome = reconcile(&chain, &handle, &fast_policy()).await;
        assert_eq!(outcome, ReconcileOutcome::Unresolved);
    }

    #[test]
    fn test_unreconciled_store_blocks_and_resolves() {
        let store = UnreconciledStore::new();
        store.park(UnreconciledTransfer {
            payment_id: 3,
            handle: TransferHandle {
                id: uuid::Uuid::new_v4(),
                tx_hash: None,
            },
            amount: 100,
            recipient: "0xabc".to_string(),
            submitted_at: 0,
        });

        assert!(store.contains(3));
        assert_eq!(store.list().len(), 1);
        assert!(store.take(3).is_some());
        assert!(!store.contains(3));
        assert!(store.take(3).is_none());
    }
}
