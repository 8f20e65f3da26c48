pub mod pools;
pub mod positions;
pub mod sweep;

pub use pools::{default_pools, LockPeriod, Pool};
pub use positions::{Position, PositionBook};
pub use sweep::{SweepConfig, SweepCoordinator, SweepReport};
