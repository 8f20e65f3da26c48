use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use super::pools::LockPeriod;

const SECS_PER_YEAR: u128 = 31_536_000;
const BPS_DENOMINATOR: u128 = 10_000;

/// An open deposit in a yield pool
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub id: Uuid,
    pub pool_id: String,
    pub amount: u128,
    /// Effective APY in basis points, lock bonus included
    pub apy_bps: u32,
    pub deposit_time: u64,
    pub lock_period: LockPeriod,
}

impl Position {
    pub fn unlock_at(&self) -> u64 {
        self.deposit_time + self.lock_period.secs()
    }

    /// Hard lock: not withdrawable before `unlock_at`
    pub fn is_unlocked(&self, now: u64) -> bool {
        now >= self.unlock_at()
    }

    /// Linear reward accrual in smallest units since deposit
    ///
    /// Saturating: an absurdly large position caps the accrual instead of
    /// overflowing.
    pub fn pending_rewards(&self, now: u64) -> u128 {
        let elapsed = now.saturating_sub(self.deposit_time) as u128;
        self.amount
            .saturating_mul(self.apy_bps as u128)
            .saturating_mul(elapsed)
            / (BPS_DENOMINATOR * SECS_PER_YEAR)
    }
}

/// Book of open liquidity positions owned by the sweep coordinator
#[derive(Default)]
pub struct PositionBook {
    positions: RwLock<Vec<Position>>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(
        &self,
        pool_id: &str,
        amount: u128,
        apy_bps: u32,
        lock_period: LockPeriod,
        now: u64,
    ) -> Position {
        let position = Position {
            id: Uuid::new_v4(),
            pool_id: pool_id.to_string(),
            amount,
            apy_bps,
            deposit_time: now,
            lock_period,
        };
        self.positions.write().push(position.clone());
        position
    }

    pub fn list(&self) -> Vec<Position> {
        self.positions.read().clone()
    }

    /// Unlocked positions, largest amount first (withdrawal order)
    pub fn unlocked(&self, now: u64) -> Vec<Position> {
        let mut unlocked: Vec<Position> = self
            .positions
            .read()
            .iter()
            .filter(|p| p.is_unlocked(now))
            .cloned()
            .collect();
        unlocked.sort_by(|a, b| b.amount.cmp(&a.amount));
        unlocked
    }

    pub fn total_deposited(&self) -> u128 {
        self.positions.read().iter().map(|p| p.amount).sum()
    }

    /// Close a position, returning it if present
    pub fn close(&self, id: Uuid) -> Option<Position> {
        let mut positions = self.positions.write();
        let pos = positions.iter().position(|p| p.id == id)?;
        Some(positions.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_expiry() {
        let book = PositionBook::new();
        let p = book.open("stable-btc", 1_000, 420, LockPeriod::Week, 0);
        assert!(!p.is_unlocked(604_799));
        assert!(p.is_unlocked(604_800));
    }

    #[test]
    fn test_pending_rewards_linear() {
        let book = PositionBook::new();
        // 10% APY on 1_000_000 for half a year
        let p = book.open("btc-eth", 1_000_000, 1_000, LockPeriod::None, 0);
        assert_eq!(p.pending_rewards(0), 0);
        assert_eq!(p.pending_rewards(31_536_000 / 2), 50_000);
        assert_eq!(p.pending_rewards(31_536_000), 100_000);
    }

    #[test]
    fn test_pending_rewards_saturates_instead_of_overflowing() {
        let book = PositionBook::new();
        let p = book.open("btc-eth", u128::MAX, 10_000, LockPeriod::None, 0);
        // Must not panic; the accrual caps at the saturated product
        let rewards = p.pending_rewards(u64::MAX);
        assert_eq!(rewards, u128::MAX / (10_000 * 31_536_000));
    }

    #[test]
    fn test_unlocked_sorted_largest_first() {
        let book = PositionBook::new();
        book.open("a", 100, 420, LockPeriod::None, 0);
        book.open("b", 900, 420, LockPeriod::None, 0);
        book.open("c", 500, 420, LockPeriod::None, 0);
        book.open("d", 9_999, 420, LockPeriod::Quarter, 0); // still locked

        let amounts: Vec<u128> = book.unlocked(100).iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![900, 500, 100]);
    }

    #[test]
    fn test_close_removes_position() {
        let book = PositionBook::new();
        let p = book.open("a", 100, 420, LockPeriod::None, 0);
        assert_eq!(book.total_deposited(), 100);
        assert!(book.close(p.id).is_some());
        assert!(book.close(p.id).is_none());
        assert_eq!(book.total_deposited(), 0);
    }
}
