use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep, timeout, Instant};
use tracing::{info, warn};

use super::locks::InFlightSet;
use super::reconcile::{
    reconcile, ReconcileOutcome, ReconcilePolicy, UnreconciledStore, UnreconciledTransfer,
};
use crate::chain::{ChainLedger, TransferHandle, TransferState};
use crate::error::{AppError, AppResult, LedgerError, ProcessError};
use crate::ledger::ReservationLedger;
use crate::registry::{Payment, PaymentId, PaymentRegistry};

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Bound on the gateway submission call
    pub submit_timeout: Duration,
    /// Bound on the post-submit confirmation phase
    pub confirm_timeout: Duration,
    /// Spacing between confirmation queries
    pub confirm_poll: Duration,
    pub reconcile: ReconcilePolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            submit_timeout: Duration::from_secs(10),
            confirm_timeout: Duration::from_secs(30),
            confirm_poll: Duration::from_secs(2),
            reconcile: ReconcilePolicy::default(),
        }
    }
}

/// Successful execution record returned to callers
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    pub payment_id: PaymentId,
    pub tx_hash: Option<String>,
    pub amount: u128,
    /// New `last_payment` value
    pub executed_at: u64,
}

enum ConfirmResult {
    Confirmed,
    Failed(String),
    TimedOut,
}

/// Execution dispatcher - submits one execution per due payment
///
/// Serializes executions per payment id, debits before the external
/// transfer, rolls the debit back on confirmed failure, and routes
/// ambiguous timeouts through bounded reconciliation so the pool is never
/// double-debited for one obligation.
pub struct ExecutionDispatcher {
    registry: Arc<PaymentRegistry>,
    ledger: Arc<ReservationLedger>,
    chain: Arc<dyn ChainLedger>,
    in_flight: InFlightSet,
    unreconciled: Arc<UnreconciledStore>,
    config: DispatchConfig,
}

impl ExecutionDispatcher {
    pub fn new(
        registry: Arc<PaymentRegistry>,
        ledger: Arc<ReservationLedger>,
        chain: Arc<dyn ChainLedger>,
        unreconciled: Arc<UnreconciledStore>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            registry,
            ledger,
            chain,
            in_flight: InFlightSet::new(),
            unreconciled,
            config,
        }
    }

    /// Process one due payment at wall-clock time `now`
    pub async fn process(&self, id: PaymentId, now: u64) -> AppResult<ExecutionOutcome> {
        if self.unreconciled.contains(id) {
            return Err(ProcessError::Unreconciled(id).into());
        }

        // Cheap pre-checks on a snapshot; re-validated under the lock
        let payment = self.load_eligible(id, now)?;
        if payment.amount > self.ledger.balance() {
            return Err(ProcessError::InsufficientFunds {
                required: payment.amount,
                available: self.ledger.balance(),
            }
            .into());
        }

        let _guard = self
            .in_flight
            .try_acquire(id)
            .ok_or(ProcessError::AlreadyProcessing(id))?;

        // Check-then-act: a concurrent execution may have completed while
        // we waited, so re-read state now that the id is exclusively ours.
        let payment = self.load_eligible(id, now)?;

        self.ledger.debit(payment.amount).map_err(|e| match e {
            AppError::Ledger(LedgerError::InsufficientFunds {
                required,
                available,
            }) => ProcessError::InsufficientFunds {
                required,
                available,
            },
            other => ProcessError::ExternalExecutionFailed(other.to_string()),
        })?;

        let handle = match timeout(
            self.config.submit_timeout,
            self.chain.submit_transfer(&payment.recipient, payment.amount),
        )
        .await
        {
            // Submission never reached the gateway: nothing to reconcile
            Err(_) => {
                self.ledger.credit(payment.amount);
                return Err(ProcessError::ExternalTimeout.into());
            }
            Ok(Err(e)) => {
                self.ledger.credit(payment.amount);
                return Err(ProcessError::ExternalExecutionFailed(e.to_string()).into());
            }
            Ok(Ok(handle)) => handle,
        };

        match self.await_confirmation(&handle).await {
            ConfirmResult::Confirmed => self.finalize(&payment, &handle, now),
            ConfirmResult::Failed(reason) => {
                self.ledger.credit(payment.amount);
                warn!("Payment {} execution failed on chain: {}", id, reason);
                Err(ProcessError::ExternalExecutionFailed(reason).into())
            }
            ConfirmResult::TimedOut => {
                info!(
                    "Payment {} transfer {} unconfirmed after timeout, reconciling",
                    id, handle.id
                );
                match reconcile(self.chain.as_ref(), &handle, &self.config.reconcile).await {
                    ReconcileOutcome::Confirmed => self.finalize(&payment, &handle, now),
                    ReconcileOutcome::Failed(reason) => {
                        self.ledger.credit(payment.amount);
                        Err(ProcessError::ExternalExecutionFailed(reason).into())
                    }
                    ReconcileOutcome::Unresolved => {
                        // Funds may have moved: keep the debit held and
                        // park the transfer for manual review
                        self.unreconciled.park(UnreconciledTransfer {
                            payment_id: id,
                            handle,
                            amount: payment.amount,
                            recipient: payment.recipient.clone(),
                            submitted_at: now,
                        });
                        Err(ProcessError::Unreconciled(id).into())
                    }
                }
            }
        }
    }

    /// Resolve a parked transfer after manual review
    ///
    /// `confirmed = true` finalizes the execution (the debit stands,
    /// `last_payment` updates exactly once); `false` rolls the debit back
    /// and leaves the payment due for the next poll.
    pub fn resolve_unreconciled(
        &self,
        payment_id: PaymentId,
        confirmed: bool,
        now: u64,
    ) -> AppResult<()> {
        let entry = self
            .unreconciled
            .take(payment_id)
            .ok_or_else(|| AppError::NotFound(format!("No unreconciled transfer for payment {}", payment_id)))?;

        if confirmed {
            self.registry.mark_executed(payment_id, now)?;
            info!(
                "Unreconciled transfer {} resolved as confirmed for payment {}",
                entry.handle.id, payment_id
            );
        } else {
            self.ledger.credit(entry.amount);
            info!(
                "Unreconciled transfer {} resolved as failed for payment {}, debit rolled back",
                entry.handle.id, payment_id
            );
        }
        Ok(())
    }

    pub fn unreconciled(&self) -> &UnreconciledStore {
        &self.unreconciled
    }

    fn load_eligible(&self, id: PaymentId, now: u64) -> Result<Payment, ProcessError> {
        let payment = self.registry.get(id).map_err(|_| ProcessError::NotFound(id))?;
        if !payment.is_active {
            return Err(ProcessError::NotActive(id));
        }
        if now < payment.next_due_at() {
            return Err(ProcessError::NotDue {
                id,
                next_due: payment.next_due_at(),
            });
        }
        Ok(payment)
    }

    fn finalize(
        &self,
        payment: &Payment,
        handle: &TransferHandle,
        now: u64,
    ) -> AppResult<ExecutionOutcome> {
        let updated = self.registry.mark_executed(payment.id, now)?;
        info!(
            "✓ Payment {} executed: {} -> {} (next due {})",
            payment.id,
            payment.amount,
            payment.recipient,
            updated.next_due_at()
        );
        Ok(ExecutionOutcome {
            payment_id: payment.id,
            tx_hash: handle.tx_hash.clone(),
            amount: payment.amount,
            executed_at: now,
        })
    }

    async fn await_confirmation(&self, handle: &TransferHandle) -> ConfirmResult {
        let deadline = Instant::now() + self.config.confirm_timeout;
        loop {
            match self.chain.confirm(handle).await {
                Ok(TransferState::Confirmed) => return ConfirmResult::Confirmed,
                Ok(TransferState::Failed(reason)) => return ConfirmResult::Failed(reason),
                Ok(TransferState::Pending) => {}
                Err(e) => warn!("Confirmation query failed for {}: {}", handle.id, e),
            }

            if Instant::now() + self.config.confirm_poll > deadline {
                return ConfirmResult::TimedOut;
            }
            sleep(self.config.confirm_poll).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{InMemoryChain, TransferScript};
    use crate::error::RegistryError;

    const RECIPIENT: &str = "0x000000000000000000000000000000000000dEaD";

    fn fast_config() -> DispatchConfig {
        DispatchConfig {
            submit_timeout: Duration::from_millis(50),
            confirm_timeout: Duration::from_millis(60),
            confirm_poll: Duration::from_millis(10),
            reconcile: ReconcilePolicy {
                initial_backoff: Duration::from_millis(2),
                max_window: Duration::from_millis(1_000),
            },
        }
    }

    struct Harness {
        registry: Arc<PaymentRegistry>,
        ledger: Arc<ReservationLedger>,
        chain: Arc<InMemoryChain>,
        dispatcher: ExecutionDispatcher,
    }

    fn harness(balance: u128) -> Harness {
        let registry = Arc::new(PaymentRegistry::new());
        let ledger = Arc::new(ReservationLedger::with_balance(balance));
        let chain = Arc::new(InMemoryChain::new(balance));
        let dispatcher = ExecutionDispatcher::new(
            registry.clone(),
            ledger.clone(),
            chain.clone(),
            Arc::new(UnreconciledStore::new()),
            fast_config(),
        );
        Harness {
            registry,
            ledger,
            chain,
            dispatcher,
        }
    }

    #[tokio::test]
    async fn test_successful_execution_updates_last_payment() {
        let h = harness(1_000);
        let p = h.registry.create(RECIPIENT, 100, 3_600, 0).unwrap();

        let outcome = h.dispatcher.process(p.id, 3_600).await.unwrap();
        assert_eq!(outcome.executed_at, 3_600);
        assert_eq!(h.ledger.balance(), 900);
        assert_eq!(h.registry.get(p.id).unwrap().last_payment, 3_600);
        assert_eq!(h.chain.submitted_transfers().len(), 1);
    }

    #[tokio::test]
    async fn test_not_due_never_executes() {
        let h = harness(1_000);
        let p = h.registry.create(RECIPIENT, 100, 3_600, 0).unwrap();

        let err = h.dispatcher.process(p.id, 3_599).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Process(ProcessError::NotDue { id, next_due: 3_600 }) if id == p.id
        ));
        assert_eq!(h.ledger.balance(), 1_000);
        assert!(h.chain.submitted_transfers().is_empty());
    }

    #[tokio::test]
    async fn test_not_found_and_not_active() {
        let h = harness(1_000);
        assert!(matches!(
            h.dispatcher.process(99, 0).await.unwrap_err(),
            AppError::Process(ProcessError::NotFound(99))
        ));

        let p = h.registry.create(RECIPIENT, 100, 3_600, 0).unwrap();
        h.registry.deactivate(p.id).unwrap();
        assert!(matches!(
            h.dispatcher.process(p.id, 10_000).await.unwrap_err(),
            AppError::Process(ProcessError::NotActive(_))
        ));
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balance_and_due_state() {
        let h = harness(50);
        let p = h.registry.create(RECIPIENT, 100, 3_600, 0).unwrap();

        let err = h.dispatcher.process(p.id, 3_600).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Process(ProcessError::InsufficientFunds {
                required: 100,
                available: 50
            })
        ));
        assert_eq!(h.ledger.balance(), 50);
        // Payment remains due for the next poll
        assert!(h.registry.get(p.id).unwrap().is_due(3_600));
    }

    #[tokio::test]
    async fn test_confirmed_failure_rolls_back_debit() {
        let h = harness(1_000);
        let p = h.registry.create(RECIPIENT, 100, 3_600, 0).unwrap();
        h.chain
            .script_next(TransferScript::PendingThenFail(0, "reverted".to_string()));

        let err = h.dispatcher.process(p.id, 3_600).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Process(ProcessError::ExternalExecutionFailed(_))
        ));
        assert_eq!(h.ledger.balance(), 1_000);
        assert_eq!(h.registry.get(p.id).unwrap().last_payment, 0);
    }

    #[tokio::test]
    async fn test_submit_rejection_rolls_back_debit() {
        let h = harness(1_000);
        let p = h.registry.create(RECIPIENT, 100, 3_600, 0).unwrap();
        h.chain
            .script_next(TransferScript::RejectSubmit("gas spike".to_string()));

        let err = h.dispatcher.process(p.id, 3_600).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Process(ProcessError::ExternalExecutionFailed(_))
        ));
        assert_eq!(h.ledger.balance(), 1_000);
    }

    #[tokio::test]
    async fn test_submit_timeout_rolls_back_debit() {
        let h = harness(1_000);
        let p = h.registry.create(RECIPIENT, 100, 3_600, 0).unwrap();
        h.chain.set_submit_delay(Duration::from_millis(200));

        let err = h.dispatcher.process(p.id, 3_600).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Process(ProcessError::ExternalTimeout)
        ));
        assert_eq!(h.ledger.balance(), 1_000);
    }

    #[tokio::test]
    async fn test_concurrent_process_single_submission() {
        let h = harness(1_000);
        let p = h.registry.create(RECIPIENT, 100, 3_600, 0).unwrap();
        // Keep the first execution in the confirmation phase long enough
        // for the second call to collide with it
        h.chain.script_next(TransferScript::PendingThenConfirm(3));

        let (a, b) = tokio::join!(
            h.dispatcher.process(p.id, 3_600),
            h.dispatcher.process(p.id, 3_600),
        );

        let (ok, err) = match (a, b) {
            (Ok(o), Err(e)) => (o, e),
            (Err(e), Ok(o)) => (o, e),
            other => panic!("expected exactly one success, got {:?}", other),
        };
        assert_eq!(ok.payment_id, p.id);
        assert!(matches!(
            err,
            AppError::Process(ProcessError::AlreadyProcessing(_))
        ));
        assert_eq!(h.chain.submitted_transfers().len(), 1);
        assert_eq!(h.ledger.balance(), 900);
    }

    #[tokio::test]
    async fn test_timeout_then_reconciled_success_no_double_debit() {
        let h = harness(1_000);
        let p = h.registry.create(RECIPIENT, 100, 3_600, 0).unwrap();
        // More pending answers than the 60ms confirmation window can
        // consume, so the transfer resolves during reconciliation
        h.chain.script_next(TransferScript::PendingThenConfirm(8));

        let outcome = h.dispatcher.process(p.id, 3_600).await.unwrap();
        assert_eq!(outcome.executed_at, 3_600);
        assert_eq!(h.ledger.balance(), 900);
        assert_eq!(h.registry.get(p.id).unwrap().last_payment, 3_600);
        assert_eq!(h.chain.submitted_transfers().len(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_transfer_parks_and_blocks() {
        let h = harness(1_000);
        let p = h.registry.create(RECIPIENT, 100, 3_600, 0).unwrap();
        h.chain.script_next(TransferScript::PendingForever);

        let err = h.dispatcher.process(p.id, 3_600).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Process(ProcessError::Unreconciled(_))
        ));
        // Debit held: the funds may have moved
        assert_eq!(h.ledger.balance(), 900);
        assert!(h.dispatcher.unreconciled().contains(p.id));

        // Blocked from dispatch until an operator resolves it
        let err = h.dispatcher.process(p.id, 7_200).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Process(ProcessError::Unreconciled(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_unreconciled_confirmed_updates_once() {
        let h = harness(1_000);
        let p = h.registry.create(RECIPIENT, 100, 3_600, 0).unwrap();
        h.chain.script_next(TransferScript::PendingForever);
        let _ = h.dispatcher.process(p.id, 3_600).await;

        h.dispatcher.resolve_unreconciled(p.id, true, 3_700).unwrap();
        assert_eq!(h.registry.get(p.id).unwrap().last_payment, 3_700);
        assert_eq!(h.ledger.balance(), 900);
        assert!(!h.dispatcher.unreconciled().contains(p.id));

        // Second resolution attempt is rejected
        assert!(h
            .dispatcher
            .resolve_unreconciled(p.id, true, 3_800)
            .is_err());
    }

    #[tokio::test]
    async fn test_resolve_unreconciled_failed_rolls_back() {
        let h = harness(1_000);
        let p = h.registry.create(RECIPIENT, 100, 3_600, 0).unwrap();
        h.chain.script_next(TransferScript::PendingForever);
        let _ = h.dispatcher.process(p.id, 3_600).await;

        h.dispatcher
            .resolve_unreconciled(p.id, false, 3_700)
            .unwrap();
        assert_eq!(h.ledger.balance(), 1_000);
        assert_eq!(h.registry.get(p.id).unwrap().last_payment, 0);
        // Payment is due again immediately
        assert!(h.registry.get(p.id).unwrap().is_due(3_700));
    }

    #[tokio::test]
    async fn test_registry_errors_do_not_leak_as_registry_variant() {
        let h = harness(1_000);
        let err = h.registry.create(RECIPIENT, 100, 10, 0).unwrap_err();
        assert!(matches!(
            err,
            AppError::Registry(RegistryError::InvalidInterval(10))
        ));
    }
}
