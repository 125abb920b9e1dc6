use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::registry::{ChangeSet, Repository};
use crate::tx::CloseTx;
use crate::types::{Backer, BackerId, Creator, Project, ProjectState, Tokens};

use super::events::{BalanceChange, CloseOutcome, LedgerEvent, Receipt};
use super::locks::LockKey;
use super::Ledger;

impl<R: Repository> Ledger<R> {
    /// Finalize a project's fundraising.
    ///
    /// Below goal, every pledge is returned to its backer and the pledge
    /// lists are cleared. At or above goal, the whole balance goes to the
    /// creator and the pledges stay on record.
    pub async fn close(&self, tx: &CloseTx) -> Result<Receipt, CoreError> {
        let result = self.close_inner(tx).await;
        Self::finish("close", tx.backed_project.as_ref(), result)
    }

    async fn close_inner(&self, tx: &CloseTx) -> Result<Receipt, CoreError> {
        let project_id = tx
            .backed_project
            .as_ref()
            .ok_or_else(|| CoreError::invalid("close"))?;

        let _project_guard = self.lock_project(project_id).await;
        let project = self.load::<Project>(project_id).await?;

        if project.state == ProjectState::Closed {
            return Err(CoreError::AlreadyClosed(project.id));
        }

        if project.goal_met() {
            self.pay_out(project).await
        } else {
            self.return_pledges(project, CloseOutcome::GoalMissed).await
        }
    }

    async fn pay_out(&self, mut project: Project) -> Result<Receipt, CoreError> {
        let _creator_guard = self
            .locks
            .acquire(LockKey::Creator(project.creator.clone()))
            .await;
        let mut creator = self.load::<Creator>(&project.creator).await?;

        let value = project.balance;
        let creator_before = creator.balance;
        creator.balance = creator.balance.checked_add(value)?;
        project.balance = Tokens::ZERO;
        project.state = ProjectState::Closed;

        let mut receipt = Receipt::new(project.id.clone());
        receipt.push(LedgerEvent::PaidOut {
            project: project.id.clone(),
            creator: creator.id.clone(),
            value,
            creator_balance: BalanceChange {
                before: creator_before,
                after: creator.balance,
            },
            project_balance: BalanceChange {
                before: value,
                after: Tokens::ZERO,
            },
        });
        receipt.push(LedgerEvent::Closed {
            project: project.id.clone(),
            outcome: CloseOutcome::Funded,
        });

        self.commit(ChangeSet::project(project).with_creator(creator))
            .await?;
        Ok(receipt)
    }

    /// Return every pledge on `project` to its backer, in list order, then
    /// clear the pledge list and close the project. Shared by the failing
    /// close and the refund transaction.
    ///
    /// The caller holds the project lock and has checked the project is
    /// still active.
    pub(super) async fn return_pledges(
        &self,
        mut project: Project,
        outcome: CloseOutcome,
    ) -> Result<Receipt, CoreError> {
        let backer_ids = project.backer_ids();
        let _backer_guards = self
            .locks
            .acquire_all(backer_ids.iter().cloned().map(LockKey::Backer).collect())
            .await;

        let mut backers: BTreeMap<BackerId, Backer> = BTreeMap::new();
        for id in backer_ids {
            let backer = self.load::<Backer>(&id).await?;
            backers.insert(id, backer);
        }

        let mut receipt = Receipt::new(project.id.clone());
        for pledge in std::mem::take(&mut project.pledges) {
            let backer = backers.get_mut(&pledge.backer).ok_or_else(|| {
                CoreError::InvalidOperation(format!(
                    "pledge {} references unloaded backer {}",
                    pledge.id, pledge.backer
                ))
            })?;

            let backer_before = backer.balance;
            let project_before = project.balance;
            backer.balance = backer.balance.checked_add(pledge.value)?;
            project.balance = project.balance.checked_sub(pledge.value)?;
            if backer.remove_pledge(&project.id, &pledge.id).is_none() {
                tracing::warn!(
                    pledge = %pledge.id,
                    backer = %backer.id,
                    "pledge missing from backer's list during refund"
                );
            }

            receipt.push(LedgerEvent::Returned {
                pledge: pledge.id,
                project: project.id.clone(),
                backer: backer.id.clone(),
                value: pledge.value,
                backer_balance: BalanceChange {
                    before: backer_before,
                    after: backer.balance,
                },
                project_balance: BalanceChange {
                    before: project_before,
                    after: project.balance,
                },
            });
        }

        if !project.balance.is_zero() {
            return Err(CoreError::InvalidOperation(format!(
                "project {} holds {} tokens not covered by its pledges",
                project.id, project.balance
            )));
        }

        project.state = ProjectState::Closed;
        receipt.push(LedgerEvent::Closed {
            project: project.id.clone(),
            outcome,
        });

        let backers = backers.into_values().collect();
        self.commit(ChangeSet::project(project).with_backers(backers))
            .await?;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_util::*;
    use crate::tx::PledgeTx;

    #[tokio::test]
    async fn goal_met_pays_creator_and_keeps_pledges() {
        let ledger = odin_sphere_ledger();
        ledger
            .pledge(&PledgeTx::new(ALICE, ODIN_SPHERE, 5_000))
            .await
            .expect("alice pledges");
        ledger
            .pledge(&PledgeTx::new(BOB, ODIN_SPHERE, 8_000))
            .await
            .expect("bob pledges");

        let receipt = ledger.close(&CloseTx::new(ODIN_SPHERE)).await.expect("close");
        assert_eq!(receipt.outcome(), Some(CloseOutcome::Funded));

        let project = project(&ledger, ODIN_SPHERE).await;
        assert_eq!(project.state, ProjectState::Closed);
        assert_eq!(project.balance, Tokens::ZERO);
        assert_eq!(project.pledges.len(), 2);
        assert_eq!(creator(&ledger, VANILLA).await.balance, Tokens(14_000));
        assert_eq!(backer(&ledger, BOB).await.pledges.len(), 1);
    }

    #[tokio::test]
    async fn goal_missed_returns_every_pledge() {
        let ledger = odin_sphere_ledger();
        ledger
            .pledge(&PledgeTx::new(ALICE, ODIN_SPHERE, 5_000))
            .await
            .expect("alice pledges");
        ledger
            .pledge(&PledgeTx::new(BOB, ODIN_SPHERE, 4_000))
            .await
            .expect("bob pledges");

        let receipt = ledger.close(&CloseTx::new(ODIN_SPHERE)).await.expect("close");
        assert_eq!(receipt.outcome(), Some(CloseOutcome::GoalMissed));
        assert_eq!(receipt.events.len(), 3);

        let alice = backer(&ledger, ALICE).await;
        let bob = backer(&ledger, BOB).await;
        assert_eq!(alice.balance, Tokens(10_000));
        assert_eq!(bob.balance, Tokens(30_000));
        assert!(alice.pledges.is_empty());
        assert!(bob.pledges.is_empty());

        let project = project(&ledger, ODIN_SPHERE).await;
        assert_eq!(project.state, ProjectState::Closed);
        assert_eq!(project.balance, Tokens::ZERO);
        assert!(project.pledges.is_empty());
        assert_eq!(creator(&ledger, VANILLA).await.balance, Tokens(1_000));
    }

    #[tokio::test]
    async fn balance_equal_to_goal_is_funded() {
        let ledger = odin_sphere_ledger();
        ledger
            .pledge(&PledgeTx::new(BOB, ODIN_SPHERE, 10_000))
            .await
            .expect("pledge");

        let receipt = ledger.close(&CloseTx::new(ODIN_SPHERE)).await.expect("close");
        assert_eq!(receipt.outcome(), Some(CloseOutcome::Funded));
        assert_eq!(creator(&ledger, VANILLA).await.balance, Tokens(11_000));
    }

    #[tokio::test]
    async fn close_without_pledges_closes_empty_project() {
        let ledger = odin_sphere_ledger();
        let receipt = ledger.close(&CloseTx::new(ODIN_SPHERE)).await.expect("close");
        assert_eq!(receipt.outcome(), Some(CloseOutcome::GoalMissed));
        assert_eq!(project(&ledger, ODIN_SPHERE).await.state, ProjectState::Closed);
    }

    #[tokio::test]
    async fn second_close_is_rejected_without_mutation() {
        let ledger = odin_sphere_ledger();
        ledger.close(&CloseTx::new(ODIN_SPHERE)).await.expect("close");
        let before = ledger.repository().snapshot().await;

        assert!(matches!(
            ledger.close(&CloseTx::new(ODIN_SPHERE)).await,
            Err(CoreError::AlreadyClosed(_))
        ));
        assert_eq!(ledger.repository().snapshot().await, before);
    }

    #[tokio::test]
    async fn missing_project_reference_is_invalid() {
        let ledger = odin_sphere_ledger();
        assert!(matches!(
            ledger.close(&CloseTx::default()).await,
            Err(CoreError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn drifted_project_balance_blocks_refund() {
        let mut drifted = odin_sphere_project();
        drifted.balance = Tokens(50);
        let ledger = Ledger::new(Arc::new(odin_sphere_repo().with_project(drifted)));
        let before = ledger.repository().snapshot().await;

        assert!(matches!(
            ledger.close(&CloseTx::new(ODIN_SPHERE)).await,
            Err(CoreError::InvalidOperation(_))
        ));
        assert_eq!(ledger.repository().snapshot().await, before);
    }
}
