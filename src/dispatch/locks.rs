use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::registry::PaymentId;

/// Per-payment-id mutual exclusion
///
/// At most one execution holds a given id at a time; a second attempt is
/// rejected immediately (the caller surfaces AlreadyProcessing). The guard
/// releases on Drop, so cancellation of an in-flight execution can never
/// leave the id locked.
#[derive(Clone, Default)]
pub struct InFlightSet {
    inner: Arc<Mutex<HashSet<PaymentId>>>,
}

pub struct InFlightGuard {
    id: PaymentId,
    inner: Arc<Mutex<HashSet<PaymentId>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, id: PaymentId) -> Option<InFlightGuard> {
        let mut held = self.inner.lock();
        if held.insert(id) {
            Some(InFlightGuard {
                id,
                inner: self.inner.clone(),
            })
        } else {
            None
        }
    }

    pub fn is_held(&self, id: PaymentId) -> bool {
        self.inner.lock().contains(&id)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.lock().remove(&self.id);
    }
}
