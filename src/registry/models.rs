use serde::{Deserialize, Serialize};

/// Opaque numeric payment id, assigned monotonically at creation
pub type PaymentId = u64;

/// Minimum allowed payment interval, matching the contract-side floor
pub const MIN_INTERVAL_SECS: u64 = 60;

/// A recurring payment definition
///
/// INVARIANTS:
/// - `interval_secs >= 60`, `amount > 0` (enforced at creation)
/// - `last_payment` is the creation time until the first execution, so a
///   freshly created payment only becomes due one interval later
/// - records are never deleted, only deactivated (audit trail)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    /// Recipient account identifier (EVM-style address)
    pub recipient: String,
    /// Amount in smallest units (wei-scale integer, no float error)
    pub amount: u128,
    pub interval_secs: u64,
    /// Unix timestamp of the last successful execution
    pub last_payment: u64,
    pub is_active: bool,
    pub created_at: u64,
}

impl Payment {
    /// Next eligible execution time
    pub fn next_due_at(&self) -> u64 {
        self.last_payment + self.interval_secs
    }

    /// Whether the interval has elapsed at `now`
    pub fn is_due(&self, now: u64) -> bool {
        self.is_active && now >= self.next_due_at()
    }
}

/// Validate an EVM-style recipient address: 0x prefix plus 40 hex chars
pub fn is_valid_recipient(address: &str) -> bool {
    let Some(hex) = address.strip_prefix("0x") else {
        return false;
    };
    hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(last_payment: u64, interval_secs: u64) -> Payment {
        Payment {
            id: 1,
            recipient: "0x000000000000000000000000000000000000dEaD".to_string(),
            amount: 100,
            interval_secs,
            last_payment,
            is_active: true,
            created_at: last_payment,
        }
    }

    #[test]
    fn test_next_due_at() {
        let p = payment(1_000, 3_600);
        assert_eq!(p.next_due_at(), 4_600);
        assert!(!p.is_due(4_599));
        assert!(p.is_due(4_600));
    }

    #[test]
    fn test_inactive_never_due() {
        let mut p = payment(0, 60);
        p.is_active = false;
        assert!(!p.is_due(u64::MAX));
    }

    #[test]
    fn test_recipient_validation() {
        assert!(is_valid_recipient(
            "0x000000000000000000000000000000000000dEaD"
        ));
        assert!(!is_valid_recipient("0x1234"));
        assert!(!is_valid_recipient(
            "000000000000000000000000000000000000dEaD00"
        ));
        assert!(!is_valid_recipient(
            "0xZZ0000000000000000000000000000000000dEaD"
        ));
        assert!(!is_valid_recipient(""));
    }
}
