//! Registry implementations for Crowdstarter.
//!
//! Provides [`MemoryRepository`], an in-memory [`Repository`](crate::registry::Repository)
//! that can optionally mirror its state to a JSON [`Snapshot`] file on
//! every change.

mod memory;
mod snapshot;

pub use memory::MemoryRepository;
pub use snapshot::Snapshot;
