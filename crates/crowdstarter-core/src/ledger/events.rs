//! Structured events describing what a committed transaction did.

use serde::Serialize;

use crate::types::{BackerId, CreatorId, PledgeId, ProjectId, Tokens};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceChange {
    pub before: Tokens,
    pub after: Tokens,
}

/// How a project reached `CLOSED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseOutcome {
    /// Goal met; the balance went to the creator.
    Funded,
    /// Closed below goal; every pledge went back to its backer.
    GoalMissed,
    /// Closed by an explicit refund transaction.
    Refunded,
}

impl std::fmt::Display for CloseOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Funded => write!(f, "funded"),
            Self::GoalMissed => write!(f, "goal_missed"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    Pledged {
        pledge: PledgeId,
        project: ProjectId,
        backer: BackerId,
        value: Tokens,
        backer_balance: BalanceChange,
        project_balance: BalanceChange,
    },
    Returned {
        pledge: PledgeId,
        project: ProjectId,
        backer: BackerId,
        value: Tokens,
        backer_balance: BalanceChange,
        project_balance: BalanceChange,
    },
    PaidOut {
        project: ProjectId,
        creator: CreatorId,
        value: Tokens,
        creator_balance: BalanceChange,
        project_balance: BalanceChange,
    },
    Closed {
        project: ProjectId,
        outcome: CloseOutcome,
    },
}

impl LedgerEvent {
    fn emit(&self) {
        match self {
            Self::Pledged {
                pledge,
                project,
                backer,
                value,
                backer_balance,
                project_balance,
            } => tracing::info!(
                %pledge,
                %project,
                %backer,
                value = value.0,
                backer_balance_before = backer_balance.before.0,
                backer_balance_after = backer_balance.after.0,
                project_balance_before = project_balance.before.0,
                project_balance_after = project_balance.after.0,
                "pledge recorded"
            ),
            Self::Returned {
                pledge,
                project,
                backer,
                value,
                backer_balance,
                project_balance,
            } => tracing::info!(
                %pledge,
                %project,
                %backer,
                value = value.0,
                backer_balance_before = backer_balance.before.0,
                backer_balance_after = backer_balance.after.0,
                project_balance_before = project_balance.before.0,
                project_balance_after = project_balance.after.0,
                "pledge returned to backer"
            ),
            Self::PaidOut {
                project,
                creator,
                value,
                creator_balance,
                project_balance,
            } => tracing::info!(
                %project,
                %creator,
                value = value.0,
                creator_balance_before = creator_balance.before.0,
                creator_balance_after = creator_balance.after.0,
                project_balance_before = project_balance.before.0,
                project_balance_after = project_balance.after.0,
                "project balance paid to creator"
            ),
            Self::Closed { project, outcome } => {
                tracing::info!(%project, %outcome, "project closed")
            }
        }
    }
}

/// The committed result of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub project: ProjectId,
    pub events: Vec<LedgerEvent>,
}

impl Receipt {
    pub(crate) fn new(project: ProjectId) -> Self {
        Self {
            project,
            events: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    pub(crate) fn emit(&self) {
        self.events.iter().for_each(LedgerEvent::emit);
    }

    /// The close outcome, if this transaction closed the project.
    pub fn outcome(&self) -> Option<CloseOutcome> {
        self.events.iter().find_map(|event| match event {
            LedgerEvent::Closed { outcome, .. } => Some(*outcome),
            _ => None,
        })
    }
}
