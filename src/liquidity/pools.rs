use serde::{Deserialize, Serialize};

/// Lock period for a liquidity deposit
///
/// Hard locks: funds are not withdrawable before expiry, with no early
/// exit. Longer locks earn an APY bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPeriod {
    None,
    Week,
    Month,
    Quarter,
}

impl LockPeriod {
    pub fn secs(&self) -> u64 {
        match self {
            LockPeriod::None => 0,
            LockPeriod::Week => 604_800,
            LockPeriod::Month => 2_592_000,
            LockPeriod::Quarter => 7_776_000,
        }
    }

    /// APY bonus in basis points for committing to the lock
    pub fn bonus_bps(&self) -> u32 {
        match self {
            LockPeriod::None => 0,
            LockPeriod::Week => 50,
            LockPeriod::Month => 200,
            LockPeriod::Quarter => 500,
        }
    }

    /// Longest-first, for picking the best lock that still fits
    pub fn descending() -> [LockPeriod; 4] {
        [
            LockPeriod::Quarter,
            LockPeriod::Month,
            LockPeriod::Week,
            LockPeriod::None,
        ]
    }
}

/// A yield pool offered by the external liquidity contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: String,
    pub name: String,
    /// Base APY in basis points (e.g. 520 = 5.20%)
    pub apy_bps: u32,
    /// 1 = low, 2 = medium, 3 = high
    pub risk_level: u8,
}

/// Static pool catalog mirroring the external contract's active pools
pub fn default_pools() -> Vec<Pool> {
    vec![
        Pool {
            id: "stable-btc".to_string(),
            name: "Stable BTC Vault".to_string(),
            apy_bps: 420,
            risk_level: 1,
        },
        Pool {
            id: "btc-eth".to_string(),
            name: "BTC/ETH LP".to_string(),
            apy_bps: 780,
            risk_level: 2,
        },
        Pool {
            id: "btc-degen".to_string(),
            name: "High Yield BTC".to_string(),
            apy_bps: 1_450,
            risk_level: 3,
        },
    ]
}
