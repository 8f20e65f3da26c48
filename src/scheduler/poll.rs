// Payment Poller - periodic due-set evaluation and dispatch
//
// Each cycle:
// - Snapshot the registry and evaluate the due set
// - Dispatch due payments one at a time, in ascending id order
// - Run one liquidity rebalance pass (cover shortfalls, sweep idle)
//
// One failing payment never aborts the cycle; its error is logged and
// the remaining due payments still execute.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use super::due::due_at;
use crate::dispatch::ExecutionDispatcher;
use crate::error::{AppError, ProcessError};
use crate::liquidity::{SweepCoordinator, SweepReport};
use crate::registry::PaymentRegistry;

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub poll_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
        }
    }
}

/// Summary of one poll cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub due: usize,
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub sweep: SweepReport,
}

/// Payment poller - drives the dispatcher and sweep coordinator
pub struct PaymentPoller {
    registry: Arc<PaymentRegistry>,
    dispatcher: Arc<ExecutionDispatcher>,
    sweep: Arc<SweepCoordinator>,
    config: PollConfig,
}

impl PaymentPoller {
    pub fn new(
        registry: Arc<PaymentRegistry>,
        dispatcher: Arc<ExecutionDispatcher>,
        sweep: Arc<SweepCoordinator>,
        config: PollConfig,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            sweep,
            config,
        }
    }

    /// Start the poll loop (runs in background)
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let poll_interval = self.config.poll_interval;

        tokio::spawn(async move {
            let mut ticker = interval(poll_interval);

            loop {
                ticker.tick().await;

                let now = Utc::now().timestamp() as u64;
                let report = self.run_cycle(now).await;

                if report.due > 0 || report.sweep.deposited > 0 || report.sweep.withdrawn > 0 {
                    info!(
                        "✓ Poll cycle: {} due, {} executed, {} skipped, {} failed",
                        report.due, report.executed, report.skipped, report.failed
                    );
                }
            }
        })
    }

    /// Execute one poll cycle at wall-clock time `now`
    pub async fn run_cycle(&self, now: u64) -> CycleReport {
        let mut report = CycleReport::default();

        let payments = self.registry.list_active();
        let due = due_at(&payments, now);
        report.due = due.len();

        if !due.is_empty() {
            info!("🔄 {} payment(s) due at {}", due.len(), now);
        }

        for id in due {
            match self.dispatcher.process(id, now).await {
                Ok(outcome) => {
                    report.executed += 1;
                    info!(
                        "✅ Executed payment {}: {} to recipient (tx: {:?})",
                        outcome.payment_id, outcome.amount, outcome.tx_hash
                    );
                }
                // Expected races: another caller beat the poller to it
                Err(AppError::Process(
                    e @ (ProcessError::AlreadyProcessing(_)
                    | ProcessError::NotDue { .. }
                    | ProcessError::NotActive(_)),
                )) => {
                    report.skipped += 1;
                    debug!("Skipped payment {}: {}", id, e);
                }
                // Underfunded: the rebalance pass below plans a withdrawal
                Err(AppError::Process(e @ ProcessError::InsufficientFunds { .. })) => {
                    report.failed += 1;
                    warn!("⚠️ Payment {} underfunded: {}", id, e);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("❌ Payment {} failed: {}", id, e);
                }
            }
        }

        match self.sweep.rebalance(now).await {
            Ok(sweep) => report.sweep = sweep,
            Err(e) => error!("❌ Liquidity rebalance failed: {}", e),
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::chain::{InMemoryChain, TransferScript};
    use crate::dispatch::{DispatchConfig, ReconcilePolicy, UnreconciledStore};
    use crate::ledger::ReservationLedger;
    use crate::liquidity::{default_pools, LockPeriod, PositionBook, SweepConfig};

    const RECIPIENT: &str = "0x000000000000000000000000000000000000dEaD";

    struct Harness {
        registry: Arc<PaymentRegistry>,
        ledger: Arc<ReservationLedger>,
        positions: Arc<PositionBook>,
        chain: Arc<InMemoryChain>,
        poller: PaymentPoller,
    }

    fn harness(balance: u128) -> Harness {
        let registry = Arc::new(PaymentRegistry::new());
        let ledger = Arc::new(ReservationLedger::with_balance(balance));
        let positions = Arc::new(PositionBook::new());
        let chain = Arc::new(InMemoryChain::new(balance));
        let unreconciled = Arc::new(UnreconciledStore::new());

        let dispatch_config = DispatchConfig {
            submit_timeout: Duration::from_millis(50),
            confirm_timeout: Duration::from_millis(60),
            confirm_poll: Duration::from_millis(10),
            reconcile: ReconcilePolicy {
                initial_backoff: Duration::from_millis(2),
                max_window: Duration::from_millis(1000),
            },
        };
        let dispatcher = Arc::new(ExecutionDispatcher::new(
            registry.clone(),
            ledger.clone(),
            chain.clone(),
            unreconciled,
            dispatch_config,
        ));
        let sweep = Arc::new(SweepCoordinator::new(
            registry.clone(),
            ledger.clone(),
            positions.clone(),
            chain.clone(),
            default_pools(),
            SweepConfig {
                min_sweep_amount: u128::MAX, // keep deposits out of dispatch tests
                ..SweepConfig::default()
            },
        ));
        let poller = PaymentPoller::new(
            registry.clone(),
            dispatcher,
            sweep,
            PollConfig::default(),
        );
        Harness {
            registry,
            ledger,
            positions,
            chain,
            poller,
        }
    }

    #[tokio::test]
    async fn test_cycle_executes_due_payments() {
        let h = harness(1_000);
        h.registry.create(RECIPIENT, 300, 3_600, 0).unwrap();
        h.registry.create(RECIPIENT, 200, 3_600, 0).unwrap();

        let report = h.poller.run_cycle(3_600).await;
        assert_eq!(report.due, 2);
        assert_eq!(report.executed, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(h.ledger.balance(), 500);

        // Both advanced to the next interval
        for p in h.registry.list_all() {
            assert_eq!(p.last_payment, 3_600);
        }
    }

    #[tokio::test]
    async fn test_cycle_noop_when_nothing_due() {
        let h = harness(1_000);
        h.registry.create(RECIPIENT, 300, 3_600, 0).unwrap();

        let report = h.poller.run_cycle(3_599).await;
        assert_eq!(report.due, 0);
        assert_eq!(h.ledger.balance(), 1_000);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_cycle() {
        let h = harness(1_000);
        h.registry.create(RECIPIENT, 300, 3_600, 0).unwrap();
        h.registry.create(RECIPIENT, 200, 3_600, 0).unwrap();

        // First dispatch rejected at submission, second confirms
        h.chain
            .script_next(TransferScript::RejectSubmit("nonce too low".to_string()));

        let report = h.poller.run_cycle(3_600).await;
        assert_eq!(report.executed, 1);
        assert_eq!(report.failed, 1);
        // Rejected payment's debit was rolled back
        assert_eq!(h.ledger.balance(), 800);
    }

    #[tokio::test]
    async fn test_shortfall_triggers_withdrawal_for_next_cycle() {
        let h = harness(100);
        h.registry.create(RECIPIENT, 500, 3_600, 0).unwrap();
        h.positions
            .open("btc-eth", 600, 780, LockPeriod::None, 0);

        // Underfunded this cycle; the rebalance pass pulls the position back
        let report = h.poller.run_cycle(3_600).await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.sweep.withdrawn, 600);
        assert_eq!(h.ledger.balance(), 700);

        // Next cycle the payment goes through
        let report = h.poller.run_cycle(3_660).await;
        assert_eq!(report.executed, 1);
        assert_eq!(h.ledger.balance(), 200);
    }
}
