use crate::error::CoreError;
use crate::registry::{ChangeSet, Repository};
use crate::tx::PledgeTx;
use crate::types::{Backer, Pledge, PledgeId, Project};

use super::events::{BalanceChange, LedgerEvent, Receipt};
use super::locks::LockKey;
use super::Ledger;

impl<R: Repository> Ledger<R> {
    /// Move `value` tokens from the backer into the project's escrow and
    /// record the pledge on both sides.
    ///
    /// Rejected with `InvalidOperation` when a reference or the value is
    /// missing or the value is zero, `ProjectNotActive` when the project is
    /// closed, and `InsufficientFunds` when the backer cannot cover it.
    pub async fn pledge(&self, tx: &PledgeTx) -> Result<Receipt, CoreError> {
        let result = self.pledge_inner(tx).await;
        Self::finish("pledge", tx.backed_project.as_ref(), result)
    }

    async fn pledge_inner(&self, tx: &PledgeTx) -> Result<Receipt, CoreError> {
        let (project_id, backer_id, value) = tx.resolve()?;

        let _project_guard = self.lock_project(project_id).await;
        let _backer_guard = self.locks.acquire(LockKey::Backer(backer_id.clone())).await;

        let mut project = self.load::<Project>(project_id).await?;
        let mut backer = self.load::<Backer>(backer_id).await?;

        if !project.is_active() {
            return Err(CoreError::ProjectNotActive(project.id));
        }
        if backer.balance < value {
            return Err(CoreError::InsufficientFunds {
                backer: backer.id,
                balance: backer.balance,
                requested: value,
            });
        }

        let pledge_id = match &tx.id {
            Some(id) if project.pledges.iter().any(|p| &p.id == id) => {
                return Err(CoreError::InvalidOperation(format!(
                    "pledge {id} already recorded on project {}",
                    project.id
                )));
            }
            Some(id) => id.clone(),
            None => next_pledge_id(&project),
        };

        let backer_before = backer.balance;
        let project_before = project.balance;
        backer.balance = backer.balance.checked_sub(value)?;
        project.balance = project.balance.checked_add(value)?;

        let pledge = Pledge {
            id: pledge_id,
            value,
            backer: backer.id.clone(),
            backed_project: project.id.clone(),
        };
        backer.pledges.push(pledge.clone());
        project.pledges.push(pledge.clone());

        let mut receipt = Receipt::new(project.id.clone());
        receipt.push(LedgerEvent::Pledged {
            pledge: pledge.id,
            project: project.id.clone(),
            backer: backer.id.clone(),
            value,
            backer_balance: BalanceChange {
                before: backer_before,
                after: backer.balance,
            },
            project_balance: BalanceChange {
                before: project_before,
                after: project.balance,
            },
        });

        self.commit(ChangeSet::project(project).with_backers(vec![backer]))
            .await?;
        Ok(receipt)
    }
}

/// First free `<project>#<n>` id, starting after the current pledge count.
fn next_pledge_id(project: &Project) -> PledgeId {
    (project.pledges.len() + 1..)
        .map(|seq| PledgeId::for_project(&project.id, seq))
        .find(|id| project.pledges.iter().all(|p| &p.id != id))
        .unwrap_or_else(|| PledgeId::for_project(&project.id, 0))
}
