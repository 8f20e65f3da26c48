pub mod models;
pub mod store;

pub use models::{Payment, PaymentId, MIN_INTERVAL_SECS};
pub use store::PaymentRegistry;
