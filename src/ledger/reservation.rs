//! Reserved-obligation math over registry snapshots.
//!
//! Pure functions: the ledger owns the balance, the registry owns the
//! payments, and reservation is computed from a snapshot of both at a
//! given clock reading.

use crate::registry::Payment;

/// Sum of amounts for active payments whose next-due time falls at or
/// before `now + horizon_secs`. Overdue obligations count - they still
/// need funding.
///
/// Funds covered by this sum must not be swept into a lock that outlives
/// the obligations behind it.
pub fn reserved_obligation(payments: &[Payment], now: u64, horizon_secs: u64) -> u128 {
    payments
        .iter()
        .filter(|p| p.is_active)
        .filter(|p| p.next_due_at() <= now.saturating_add(horizon_secs))
        .map(|p| p.amount)
        .sum()
}

/// Amount needed for obligations that are due right now
pub fn upcoming_due_amount(payments: &[Payment], now: u64) -> u128 {
    reserved_obligation(payments, now, 0)
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
    fn test_reservation_window() {
        let payments = vec![
            payment(1, 100, 0, 3_600),  // due at 3600
            payment(2, 200, 0, 7_200),  // due at 7200
            payment(3, 400, 0, 86_400), // due at 86400
        ];

        assert_eq!(reserved_obligation(&payments, 0, 0), 0);
        assert_eq!(reserved_obligation(&payments, 0, 3_600), 100);
        assert_eq!(reserved_obligation(&payments, 0, 7_200), 300);
        assert_eq!(reserved_obligation(&payments, 0, 100_000), 700);
    }

    #[test]
    fn test_overdue_counts_at_zero_horizon() {
        let payments = vec![payment(1, 100, 0, 3_600)];
        assert_eq!(upcoming_due_amount(&payments, 3_599), 0);
        assert_eq!(upcoming_due_amount(&payments, 3_600), 100);
        assert_eq!(upcoming_due_amount(&payments, 50_000), 100);
    }

    #[test]
    fn test_inactive_excluded() {
        let mut p = payment(1, 100, 0, 3_600);
        p.is_active = false;
        assert_eq!(reserved_obligation(&[p], 10_000, 0), 0);
    }
}
