//! Ledger-wide invariant checks over a [`Snapshot`].
//!
//! The ledger never commits a state that breaks these, so a violation
//! points at a snapshot edited or produced outside the ledger.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::store::Snapshot;
use crate::types::{BackerId, CreatorId, Pledge, PledgeId, ProjectId, ProjectState, Tokens};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    ZeroPledge {
        pledge: PledgeId,
    },
    EscrowMismatch {
        project: ProjectId,
        balance: Tokens,
        pledged: Tokens,
    },
    ClosedWithBalance {
        project: ProjectId,
        balance: Tokens,
    },
    UnknownCreator {
        project: ProjectId,
        creator: CreatorId,
    },
    UnknownBacker {
        pledge: PledgeId,
        backer: BackerId,
    },
    /// A pledge listed on one side (project or backer) but not the other,
    /// or listed with different contents.
    UnmatchedPledge {
        pledge: PledgeId,
        project: ProjectId,
        backer: BackerId,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroPledge { pledge } => write!(f, "pledge {pledge} has zero value"),
            Self::EscrowMismatch {
                project,
                balance,
                pledged,
            } => write!(
                f,
                "project {project} holds {balance} but its pledges total {pledged}"
            ),
            Self::ClosedWithBalance { project, balance } => {
                write!(f, "closed project {project} still holds {balance}")
            }
            Self::UnknownCreator { project, creator } => {
                write!(f, "project {project} references unknown creator {creator}")
            }
            Self::UnknownBacker { pledge, backer } => {
                write!(f, "pledge {pledge} references unknown backer {backer}")
            }
            Self::UnmatchedPledge {
                pledge,
                project,
                backer,
            } => write!(
                f,
                "pledge {pledge} is not recorded consistently on project {project} and backer {backer}"
            ),
        }
    }
}

/// Check every invariant, returning violations in a stable order.
pub fn audit(snapshot: &Snapshot) -> Vec<Violation> {
    let mut violations = Vec::new();

    let creators: HashSet<&CreatorId> = snapshot.creators.iter().map(|c| &c.id).collect();
    let backer_pledges: HashMap<&BackerId, &[Pledge]> = snapshot
        .backers
        .iter()
        .map(|b| (&b.id, b.pledges.as_slice()))
        .collect();
    let project_pledges: HashMap<&ProjectId, &[Pledge]> = snapshot
        .projects
        .iter()
        .map(|p| (&p.id, p.pledges.as_slice()))
        .collect();

    for project in &snapshot.projects {
        if !creators.contains(&project.creator) {
            violations.push(Violation::UnknownCreator {
                project: project.id.clone(),
                creator: project.creator.clone(),
            });
        }

        match project.state {
            ProjectState::Active if project.balance != project.pledged_total() => {
                violations.push(Violation::EscrowMismatch {
                    project: project.id.clone(),
                    balance: project.balance,
                    pledged: project.pledged_total(),
                });
            }
            ProjectState::Closed if !project.balance.is_zero() => {
                violations.push(Violation::ClosedWithBalance {
                    project: project.id.clone(),
                    balance: project.balance,
                });
            }
            _ => {}
        }

        for pledge in &project.pledges {
            if pledge.value.is_zero() {
                violations.push(Violation::ZeroPledge {
                    pledge: pledge.id.clone(),
                });
            }
            let Some(listed) = backer_pledges.get(&pledge.backer) else {
                violations.push(Violation::UnknownBacker {
                    pledge: pledge.id.clone(),
                    backer: pledge.backer.clone(),
                });
                continue;
            };
            if pledge.backed_project != project.id || !listed.contains(pledge) {
                violations.push(Violation::UnmatchedPledge {
                    pledge: pledge.id.clone(),
                    project: project.id.clone(),
                    backer: pledge.backer.clone(),
                });
            }
        }
    }

    for backer in &snapshot.backers {
        for pledge in &backer.pledges {
            let on_project = project_pledges
                .get(&pledge.backed_project)
                .is_some_and(|listed| listed.contains(pledge));
            if pledge.backer != backer.id || !on_project {
                violations.push(Violation::UnmatchedPledge {
                    pledge: pledge.id.clone(),
                    project: pledge.backed_project.clone(),
                    backer: backer.id.clone(),
                });
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Backer, Creator, Project};

    fn pledge(id: &str, value: u64, backer: &str, project: &str) -> Pledge {
        Pledge {
            id: id.into(),
            value: Tokens(value),
            backer: backer.into(),
            backed_project: project.into(),
        }
    }

    fn consistent() -> Snapshot {
        let p = pledge("p1#1", 5_000, "alice", "p1");
        let mut alice = Backer::new("alice", 5_000);
        alice.pledges.push(p.clone());
        let mut project = Project::new("p1", "Odin Sphere", 10_000, "vanilla");
        project.balance = Tokens(5_000);
        project.pledges.push(p);
        Snapshot {
            backers: vec![alice],
            creators: vec![Creator::new("vanilla", 0)],
            projects: vec![project],
        }
    }

    #[test]
    fn consistent_snapshot_has_no_violations() {
        assert!(audit(&consistent()).is_empty());
    }

    #[test]
    fn detects_escrow_mismatch() {
        let mut snapshot = consistent();
        snapshot.projects[0].balance = Tokens(4_000);
        assert!(matches!(
            audit(&snapshot).as_slice(),
            [Violation::EscrowMismatch { .. }]
        ));
    }

    #[test]
    fn detects_pledge_missing_from_backer() {
        let mut snapshot = consistent();
        snapshot.backers[0].pledges.clear();
        assert!(matches!(
            audit(&snapshot).as_slice(),
            [Violation::UnmatchedPledge { .. }]
        ));
    }

    #[test]
    fn detects_pledge_missing_from_project() {
        let mut snapshot = consistent();
        snapshot.projects[0].pledges.clear();
        snapshot.projects[0].balance = Tokens::ZERO;
        assert!(matches!(
            audit(&snapshot).as_slice(),
            [Violation::UnmatchedPledge { .. }]
        ));
    }

    #[test]
    fn detects_closed_project_holding_tokens() {
        let mut snapshot = consistent();
        snapshot.projects[0].state = ProjectState::Closed;
        assert!(matches!(
            audit(&snapshot).as_slice(),
            [Violation::ClosedWithBalance { .. }]
        ));
    }

    #[test]
    fn detects_unknown_references() {
        let mut snapshot = consistent();
        snapshot.creators.clear();
        snapshot.backers.clear();
        let violations = audit(&snapshot);
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::UnknownCreator { .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::UnknownBacker { .. })));
    }

    #[test]
    fn detects_zero_value_pledge() {
        let mut snapshot = consistent();
        let zero = pledge("p1#2", 0, "alice", "p1");
        snapshot.projects[0].pledges.push(zero.clone());
        snapshot.backers[0].pledges.push(zero);
        assert!(matches!(
            audit(&snapshot).as_slice(),
            [Violation::ZeroPledge { .. }]
        ));
    }
}
