use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::info;

use super::models::{is_valid_recipient, Payment, PaymentId, MIN_INTERVAL_SECS};
use crate::error::{AppResult, RegistryError};

/// Payment registry - the source of truth for payment definitions
///
/// Mutations on a given id are serialized by the dispatcher's per-id lock;
/// the RwLock here only protects map structure.
pub struct PaymentRegistry {
    payments: RwLock<BTreeMap<PaymentId, Payment>>,
    next_id: RwLock<PaymentId>,
}

impl PaymentRegistry {
    pub fn new() -> Self {
        Self {
            payments: RwLock::new(BTreeMap::new()),
            next_id: RwLock::new(1),
        }
    }

    /// Register a new recurring payment
    ///
    /// `last_payment` is set to `now`, so the first execution occurs one
    /// full interval after creation.
    pub fn create(
        &self,
        recipient: &str,
        amount: u128,
        interval_secs: u64,
        now: u64,
    ) -> AppResult<Payment> {
        if interval_secs < MIN_INTERVAL_SECS {
            return Err(RegistryError::InvalidInterval(interval_secs).into());
        }
        if amount == 0 {
            return Err(RegistryError::InvalidAmount.into());
        }
        if !is_valid_recipient(recipient) {
            return Err(RegistryError::InvalidRecipient(recipient.to_string()).into());
        }

        let mut next_id = self.next_id.write();
        let id = *next_id;
        *next_id += 1;

        let payment = Payment {
            id,
            recipient: recipient.to_string(),
            amount,
            interval_secs,
            last_payment: now,
            is_active: true,
            created_at: now,
        };

        self.payments.write().insert(id, payment.clone());
        info!(
            "Payment {} registered: {} -> {} every {}s",
            id, amount, recipient, interval_secs
        );

        Ok(payment)
    }

    pub fn get(&self, id: PaymentId) -> AppResult<Payment> {
        self.payments
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id).into())
    }

    /// Active payments, ascending by id
    pub fn list_active(&self) -> Vec<Payment> {
        self.payments
            .read()
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect()
    }

    /// All payments (inactive included), ascending by id
    pub fn list_all(&self) -> Vec<Payment> {
        self.payments.read().values().cloned().collect()
    }

    /// Idempotent deactivation; records are never deleted
    pub fn deactivate(&self, id: PaymentId) -> AppResult<()> {
        let mut payments = self.payments.write();
        let payment = payments
            .get_mut(&id)
            .ok_or(RegistryError::NotFound(id))?;

        if payment.is_active {
            payment.is_active = false;
            info!("Payment {} deactivated", id);
        }
        Ok(())
    }

    /// Record a successful execution. Dispatcher-only mutation.
    pub fn mark_executed(&self, id: PaymentId, executed_at: u64) -> AppResult<Payment> {
        let mut payments = self.payments.write();
        let payment = payments
            .get_mut(&id)
            .ok_or(RegistryError::NotFound(id))?;
        payment.last_payment = executed_at;
        Ok(payment.clone())
    }
}

impl Default for PaymentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
