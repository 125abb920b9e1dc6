use crate::error::CoreError;
use crate::registry::Repository;
use crate::tx::RefundTx;
use crate::types::{Project, ProjectState};

use super::events::{CloseOutcome, Receipt};
use super::Ledger;

impl<R: Repository> Ledger<R> {
    /// Return every pledge to its backer and close the project, whatever
    /// its balance against the goal.
    pub async fn refund(&self, tx: &RefundTx) -> Result<Receipt, CoreError> {
        let result = self.refund_inner(tx).await;
        Self::finish("refund", tx.backed_project.as_ref(), result)
    }

    async fn refund_inner(&self, tx: &RefundTx) -> Result<Receipt, CoreError> {
        let project_id = tx
            .backed_project
            .as_ref()
            .ok_or_else(|| CoreError::invalid("refund"))?;

        let _project_guard = self.lock_project(project_id).await;
        let project = self.load::<Project>(project_id).await?;

        if project.state == ProjectState::Closed {
            return Err(CoreError::AlreadyClosed(project.id));
        }

        self.return_pledges(project, CloseOutcome::Refunded).await
    }
}
