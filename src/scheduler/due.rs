//! Due-set evaluation over registry snapshots.
//!
//! Pure functions of snapshot + clock; nothing here mutates state.

use serde::{Deserialize, Serialize};

use crate::registry::{Payment, PaymentId};

/// Processability classification shown to callers
///
/// When several reasons apply at once they are evaluated in the fixed
/// priority order Inactive > NotDue > InsufficientBalance > Ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Inactive,
    NotDue,
    InsufficientBalance,
    Ready,
}

/// Classify one payment against the clock and the pooled balance
pub fn classify(payment: &Payment, now: u64, balance: u128) -> PaymentStatus {
    if !payment.is_active {
        PaymentStatus::Inactive
    } else if now < payment.next_due_at() {
        PaymentStatus::NotDue
    } else if payment.amount > balance {
        PaymentStatus::InsufficientBalance
    } else {
        PaymentStatus::Ready
    }
}

/// Ids of payments eligible to execute at `now`, ascending
///
/// Eligibility is purely temporal (active + interval elapsed); balance is
/// checked at dispatch time so a shortfall is reported per payment rather
/// than hiding it from the due set.
pub fn due_at(payments: &[Payment], now: u64) -> Vec<PaymentId> {
    let mut due: Vec<PaymentId> = payments
        .iter()
        .filter(|p| p.is_due(now))
        .map(|p| p.id)
        .collect();
    due.sort_unstable();
    due
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(id: u64, amount: u128, last_payment: u64, interval_secs: u64) -> Payment {
        Payment {
            id,
            recipient: "0x000000000000000000000000000000000000dEaD".to_string(),
            amount,
            interval_secs,
            last_payment,
            is_active: true,
            created_at: last_payment,
        }
    }

    #[test]
    fn test_due_set_boundary() {
        // Created at t=0 with a one hour interval
        let payments = vec![payment(1, 100, 0, 3_600)];
        assert!(due_at(&payments, 3_599).is_empty());
        assert_eq!(due_at(&payments, 3_600), vec![1]);
    }

    #[test]
    fn test_due_set_after_execution() {
        let mut p = payment(1, 100, 0, 3_600);
        p.last_payment = 3_600;
        assert!(due_at(&[p.clone()], 7_199).is_empty());
        assert_eq!(due_at(&[p], 7_200), vec![1]);
    }

    #[test]
    fn test_due_set_ascending_ids() {
        let payments = vec![
            payment(5, 100, 0, 60),
            payment(2, 100, 0, 60),
            payment(9, 100, 0, 60),
        ];
        assert_eq!(due_at(&payments, 60), vec![2, 5, 9]);
    }

    #[test]
    fn test_classify_priority_order() {
        let mut p = payment(1, 100, 0, 3_600);
        p.is_active = false;

        // Inactive wins over every other reason
        assert_eq!(classify(&p, 0, 0), PaymentStatus::Inactive);

        // NotDue wins over InsufficientBalance
        p.is_active = true;
        assert_eq!(classify(&p, 100, 0), PaymentStatus::NotDue);

        // Due but underfunded
        assert_eq!(classify(&p, 3_600, 50), PaymentStatus::InsufficientBalance);

        assert_eq!(classify(&p, 3_600, 100), PaymentStatus::Ready);
    }
}
