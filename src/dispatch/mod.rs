pub mod dispatcher;
pub mod locks;
pub mod reconcile;

pub use dispatcher::{DispatchConfig, ExecutionDispatcher, ExecutionOutcome};
pub use reconcile::{ReconcilePolicy, UnreconciledStore, UnreconciledTransfer};
