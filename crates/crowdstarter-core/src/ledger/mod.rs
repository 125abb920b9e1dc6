//! The escrow ledger: pledge, close and refund transactions.
//!
//! Each handler follows load, validate, stage, commit. Entities are loaded
//! from the [`Repository`] under the lock table, mutated as local copies,
//! and handed back as one [`ChangeSet`]. Nothing is visible to other
//! transactions until `commit` succeeds, and a rejected or failed
//! transaction leaves every registry as it was.

mod close;
mod events;
mod locks;
mod pledge;
mod refund;

pub use events::{BalanceChange, CloseOutcome, LedgerEvent, Receipt};

use std::sync::Arc;

use crate::error::CoreError;
use crate::registry::{ChangeSet, Entity, Registry, Repository};
use crate::tx::Transaction;
use crate::types::ProjectId;

use locks::{LockKey, LockTable};

pub struct Ledger<R> {
    repo: Arc<R>,
    locks: LockTable,
}

impl<R: Repository> Ledger<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            locks: LockTable::new(),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// Dispatch a transaction of any kind to its handler.
    pub async fn apply(&self, tx: &Transaction) -> Result<Receipt, CoreError> {
        match tx {
            Transaction::Pledge(tx) => self.pledge(tx).await,
            Transaction::Close(tx) => self.close(tx).await,
            Transaction::Refund(tx) => self.refund(tx).await,
        }
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    async fn load<E: Entity>(&self, id: &E::Id) -> Result<E, CoreError>
    where
        R: Registry<E>,
    {
        Registry::<E>::get(self.repo.as_ref(), id).await
    }

    async fn lock_project(&self, id: &ProjectId) -> tokio::sync::OwnedMutexGuard<()> {
        self.locks.acquire(LockKey::Project(id.clone())).await
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), CoreError> {
        let project = changes.project.id.clone();
        self.repo.commit(changes).await.map_err(|e| {
            tracing::error!(%project, error = %e, "commit failed; transaction rolled back");
            e
        })
    }

    /// Log the outcome of a handler at the boundary.
    fn finish(
        kind: &'static str,
        project: Option<&ProjectId>,
        result: Result<Receipt, CoreError>,
    ) -> Result<Receipt, CoreError> {
        let project = project.map(ProjectId::as_str).unwrap_or("-");
        match &result {
            Ok(receipt) => receipt.emit(),
            Err(e) if e.is_rejection() => {
                tracing::warn!(tx = kind, project, error = %e, "transaction rejected")
            }
            Err(e) => {
                tracing::error!(tx = kind, project, error = %e, "transaction failed")
            }
        }
        result
    }
}
