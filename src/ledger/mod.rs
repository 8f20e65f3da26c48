pub mod reservation;

pub use reservation::{reserved_obligation, upcoming_due_amount};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{AppResult, LedgerError};

/// Balance reservation ledger - tracks the single pooled balance
///
/// All mutations go through one exclusive lock; `debit` is an atomic
/// check-then-act so callers racing a stale `balance()` snapshot cannot
/// over-commit the pool.
pub struct ReservationLedger {
    balance: Mutex<u128>,
}

impl ReservationLedger {
    pub fn new() -> Self {
        Self {
            balance: Mutex::new(0),
        }
    }

    pub fn with_balance(initial: u128) -> Self {
        Self {
            balance: Mutex::new(initial),
        }
    }

    /// Lock-free snapshot for display and planning; may be stale by the
    /// time the caller acts on it
    pub fn balance(&self) -> u128 {
        *self.balance.lock()
    }

    pub fn deposit(&self, amount: u128) {
        let mut balance = self.balance.lock();
        *balance += amount;
        debug!("Ledger deposit: +{} -> {}", amount, *balance);
    }

    /// Restore funds after a rolled-back or reversed execution
    pub fn credit(&self, amount: u128) {
        let mut balance = self.balance.lock();
        *balance += amount;
        debug!("Ledger credit: +{} -> {}", amount, *balance);
    }

    /// Atomically remove funds; fails without mutating if underfunded
    pub fn debit(&self, amount: u128) -> AppResult<()> {
        let mut balance = self.balance.lock();
        if amount > *balance {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: *balance,
            }
            .into());
        }
        *balance -= amount;
        debug!("Ledger debit: -{} -> {}", amount, *balance);
        Ok(())
    }
}

impl Default for ReservationLedger {
    fn default() -> Self {
        Self::new()
    }
}
