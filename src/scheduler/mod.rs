pub mod due;
pub mod poll;

pub use due::{classify, due_at, PaymentStatus};
pub use poll::{CycleReport, PaymentPoller, PollConfig};
