use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::pools::{LockPeriod, Pool};
use super::positions::PositionBook;
use crate::chain::ChainLedger;
use crate::error::{AppResult, SweepError};
use crate::ledger::{reserved_obligation, upcoming_due_amount, ReservationLedger};
use crate::registry::{Payment, PaymentRegistry};

#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Cap on the look-ahead horizon derived from active intervals
    pub horizon_ceiling_secs: u64,
    /// Idle amounts below this are not worth the sweep gas
    pub min_sweep_amount: u128,
    /// Highest pool risk level the treasury may enter
    pub max_risk_level: u8,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            horizon_ceiling_secs: 2_592_000,
            min_sweep_amount: 1,
            max_risk_level: 2,
        }
    }
}

/// A proposed deposit of idle funds into a yield pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositPlan {
    pub pool_id: String,
    pub amount: u128,
    pub lock_period: LockPeriod,
}

/// A proposed withdrawal of one unlocked position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawalPlan {
    pub position_id: Uuid,
    pub amount: u128,
}

/// Outcome of one rebalance pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub deposited: u128,
    pub withdrawn: u128,
    /// Due obligations that unlocked positions could not cover; these will
    /// surface as InsufficientFunds at execution time
    pub uncovered_shortfall: u128,
}

/// First occurrence of a recurring payment strictly after `cutoff`
fn first_due_after(payment: &Payment, cutoff: u64) -> u64 {
    let next = payment.next_due_at();
    if next > cutoff {
        return next;
    }
    let elapsed_intervals = (cutoff - next) / payment.interval_secs + 1;
    next + elapsed_intervals * payment.interval_secs
}

/// Liquidity sweep coordinator
///
/// Moves idle balance (balance minus reserved obligations) into yield
/// pools and pulls it back when reserved funds fall short of imminent
/// obligations. Funds are never locked past an obligation that might
/// need them before the lock expires.
pub struct SweepCoordinator {
    registry: Arc<PaymentRegistry>,
    ledger: Arc<ReservationLedger>,
    positions: Arc<PositionBook>,
    chain: Arc<dyn ChainLedger>,
    pools: Vec<Pool>,
    config: SweepConfig,
}

impl SweepCoordinator {
    pub fn new(
        registry: Arc<PaymentRegistry>,
        ledger: Arc<ReservationLedger>,
        positions: Arc<PositionBook>,
        chain: Arc<dyn ChainLedger>,
        pools: Vec<Pool>,
        config: SweepConfig,
    ) -> Self {
        Self {
            registry,
            ledger,
            positions,
            chain,
            pools,
            config,
        }
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn positions(&self) -> &PositionBook {
        &self.positions
    }

    /// Look-ahead horizon: the longest active interval, capped
    fn sweep_horizon(&self, payments: &[Payment]) -> u64 {
        payments
            .iter()
            .filter(|p| p.is_active)
            .map(|p| p.interval_secs)
            .max()
            .unwrap_or(0)
            .min(self.config.horizon_ceiling_secs)
    }

    /// Balance not earmarked for obligations within the sweep horizon
    pub fn idle_amount(&self, now: u64) -> u128 {
        let payments = self.registry.list_active();
        let horizon = self.sweep_horizon(&payments);
        self.ledger
            .balance()
            .saturating_sub(reserved_obligation(&payments, now, horizon))
    }

    /// Propose a deposit of idle funds, or none
    pub fn plan_deposit(&self, now: u64) -> Option<DepositPlan> {
        let payments = self.registry.list_active();
        let horizon = self.sweep_horizon(&payments);
        let idle = self
            .ledger
            .balance()
            .saturating_sub(reserved_obligation(&payments, now, horizon));

        if idle < self.config.min_sweep_amount {
            return None;
        }

        let pool = self
            .pools
            .iter()
            .filter(|p| p.risk_level <= self.config.max_risk_level)
            .max_by_key(|p| p.apy_bps)?;

        // The first obligation not covered by the reservation horizon is
        // the earliest moment the swept funds could be needed again.
        // Payments recur, so project each one's first occurrence past the
        // horizon rather than just its next due time.
        let cutoff = now.saturating_add(horizon);
        let earliest_uncovered = payments
            .iter()
            .filter(|p| p.is_active)
            .map(|p| first_due_after(p, cutoff))
            .min();

        let lock_period = LockPeriod::descending()
            .into_iter()
            .find(|lock| match earliest_uncovered {
                Some(due) => now.saturating_add(lock.secs()) <= due,
                None => true,
            })
            .unwrap_or(LockPeriod::None);

        Some(DepositPlan {
            pool_id: pool.id.clone(),
            amount: idle,
            lock_period,
        })
    }

    /// Propose withdrawals when the balance cannot cover due obligations
    ///
    /// Unlocked positions only, largest-amount-first, until the shortfall
    /// is covered or unlocked positions run out.
    pub fn plan_withdrawal(&self, now: u64) -> (Vec<WithdrawalPlan>, u128) {
        let payments = self.registry.list_active();
        let due_now = upcoming_due_amount(&payments, now);
        let balance = self.ledger.balance();
        if balance >= due_now {
            return (Vec::new(), 0);
        }

        let mut shortfall = due_now - balance;
        let mut plans = Vec::new();
        for position in self.positions.unlocked(now) {
            plans.push(WithdrawalPlan {
                position_id: position.id,
                amount: position.amount,
            });
            shortfall = shortfall.saturating_sub(position.amount);
            if shortfall == 0 {
                break;
            }
        }

        if shortfall > 0 {
            warn!(
                "Liquidity shortfall of {} not coverable by unlocked positions",
                shortfall
            );
        }
        (plans, shortfall)
    }

    /// One rebalance pass: cover shortfalls first, then sweep idle funds
    pub async fn rebalance(&self, now: u64) -> AppResult<SweepReport> {
        let mut report = SweepReport::default();

        let (withdrawals, uncovered) = self.plan_withdrawal(now);
        report.uncovered_shortfall = uncovered;

        if !withdrawals.is_empty() {
            for plan in withdrawals {
                report.withdrawn += self.execute_withdrawal(plan, now).await?;
            }
            return Ok(report);
        }

        if let Some(plan) = self.plan_deposit(now) {
            report.deposited = plan.amount;
            self.execute_deposit(plan, now).await?;
        }
        Ok(report)
    }

    async fn execute_deposit(&self, plan: DepositPlan, now: u64) -> AppResult<()> {
        let pool = self
            .pools
            .iter()
            .find(|p| p.id == plan.pool_id)
            .ok_or_else(|| SweepError::UnknownPool(plan.pool_id.clone()))?;

        // Reserve the funds locally before they leave the pooled balance
        self.ledger.debit(plan.amount)?;

        // Idle funds leave the payroll contract for the yield pool
        match self.chain.withdraw(plan.amount).await {
            Ok(tx_hash) => {
                let apy_bps = pool.apy_bps + plan.lock_period.bonus_bps();
                let position = self.positions.open(
                    &plan.pool_id,
                    plan.amount,
                    apy_bps,
                    plan.lock_period,
                    now,
                );
                info!(
                    "🔄 Swept {} into pool {} at {}bps, lock {:?} (tx: {}, position {})",
                    plan.amount, pool.id, apy_bps, plan.lock_period, tx_hash, position.id
                );
                Ok(())
            }
            Err(e) => {
                self.ledger.credit(plan.amount);
                Err(e)
            }
        }
    }

    async fn execute_withdrawal(&self, plan: WithdrawalPlan, now: u64) -> AppResult<u128> {
        let position = self
            .positions
            .close(plan.position_id)
            .ok_or(SweepError::PositionNotFound(plan.position_id))?;

        let payout = position.amount + position.pending_rewards(now);

        // Principal plus accrued rewards return to the pooled balance
        match self.chain.deposit(payout).await {
            Ok(tx_hash) => {
                self.ledger.credit(payout);
                info!(
                    "🔄 Withdrew position {} from pool {}: {} principal + {} rewards (tx: {})",
                    position.id,
                    position.pool_id,
                    position.amount,
                    payout - position.amount,
                    tx_hash
                );
                Ok(payout)
            }
            Err(e) => {
                // Position stays closed locally only on success; reopen it
                self.positions.open(
                    &position.pool_id,
                    position.amount,
                    position.apy_bps,
                    position.lock_period,
                    position.deposit_time,
                );
                Err(e)
            }
        }
    }

    /// Fund the pooled balance from outside the system
    pub async fn deposit_funds(&self, amount: u128) -> AppResult<String> {
        let tx_hash = self.chain.deposit(amount).await?;
        self.ledger.deposit(amount);
        Ok(tx_hash)
    }

    /// Withdraw idle funds out of the system (organization payout)
    ///
    /// Capped at the idle amount so reserved obligations stay funded.
    pub async fn withdraw_idle(&self, amount: u128, now: u64) -> AppResult<String> {
        let idle = self.idle_amount(now);
        if amount > idle {
            return Err(crate::error::LedgerError::InsufficientFunds {
                required: amount,
                available: idle,
            }
            .into());
        }
        self.ledger.debit(amount)?;
        match self.chain.withdraw(amount).await {
            Ok(tx_hash) => Ok(tx_hash),
            Err(e) => {
                self.ledger.credit(amount);
                Err(e)
            }
        }
    }
}
