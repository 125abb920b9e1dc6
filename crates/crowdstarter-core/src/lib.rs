//! Crowdstarter core: an escrow ledger for crowdfunding.
//!
//! Backers pledge tokens to a project; closing the project either pays
//! its creator (goal met) or returns every pledge (goal missed). Storage
//! is reached only through the [`registry`] port.

pub mod audit;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod registry;
pub mod store;
pub mod tx;
pub mod types;

#[cfg(test)]
mod test_util;

pub use error::CoreError;
pub use ledger::{CloseOutcome, Ledger, LedgerEvent, Receipt};
pub use registry::{ChangeSet, Registry, Repository};
pub use store::{MemoryRepository, Snapshot};
pub use tx::{CloseTx, PledgeTx, RefundTx, Transaction};
