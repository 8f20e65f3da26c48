pub mod gateway;
pub mod memory;
pub mod traits;

pub use gateway::HttpChainGateway;
pub use memory::{InMemoryChain, TransferScript};
pub use traits::{ChainLedger, TransferHandle, TransferState};
