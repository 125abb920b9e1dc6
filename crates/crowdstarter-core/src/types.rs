//! Domain types for the Crowdstarter escrow ledger.
//!
//! Contains the identity newtypes, the `Tokens` amount type, and the three
//! persisted entities (`Backer`, `Creator`, `Project`) along with the
//! embedded `Pledge` record.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ==============================================================================
// Identities
// ==============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// A backer's identity, usually an e-mail address.
    BackerId
);
string_id!(
    /// A creator's identity, usually an e-mail address.
    CreatorId
);
string_id!(
    /// A project's asset identifier, e.g. `Proj0001`.
    ProjectId
);
string_id!(
    /// A pledge identifier, unique within its project.
    PledgeId
);

impl PledgeId {
    /// The id the ledger assigns to the `seq`-th pledge on a project.
    pub fn for_project(project: &ProjectId, seq: usize) -> Self {
        Self(format!("{project}#{seq}"))
    }
}

// ==============================================================================
// Tokens
// ==============================================================================

/// A non-negative token amount.
///
/// `#[serde(transparent)]` keeps the JSON representation a bare integer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tokens(pub u64);

impl Tokens {
    pub const ZERO: Tokens = Tokens(0);

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Tokens) -> Result<Tokens, CoreError> {
        self.0
            .checked_add(rhs.0)
            .map(Tokens)
            .ok_or(CoreError::BalanceOverflow)
    }

    /// Subtraction that refuses to go below zero. Callers check funds first,
    /// so an underflow here means a corrupted record.
    pub fn checked_sub(self, rhs: Tokens) -> Result<Tokens, CoreError> {
        self.0.checked_sub(rhs.0).map(Tokens).ok_or_else(|| {
            CoreError::InvalidOperation(format!("balance {self} cannot cover {rhs}"))
        })
    }
}

impl From<u64> for Tokens {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl std::fmt::Display for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::iter::Sum for Tokens {
    fn sum<I: Iterator<Item = Tokens>>(iter: I) -> Self {
        Tokens(iter.map(|t| t.0).sum())
    }
}

// ==============================================================================
// Participants
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backer {
    pub id: BackerId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub balance: Tokens,
    /// Outstanding pledges in contribution order.
    #[serde(default)]
    pub pledges: Vec<Pledge>,
}

impl Backer {
    pub fn new(id: impl Into<BackerId>, balance: u64) -> Self {
        Self {
            id: id.into(),
            first_name: String::new(),
            last_name: String::new(),
            balance: Tokens(balance),
            pledges: Vec::new(),
        }
    }

    /// Drop the pledge `id` on `project` from this backer's list, returning it.
    ///
    /// Pledge ids are only unique within a project, so both must match.
    pub fn remove_pledge(&mut self, project: &ProjectId, id: &PledgeId) -> Option<Pledge> {
        let idx = self
            .pledges
            .iter()
            .position(|p| &p.id == id && &p.backed_project == project)?;
        Some(self.pledges.remove(idx))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub id: CreatorId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub balance: Tokens,
}

impl Creator {
    pub fn new(id: impl Into<CreatorId>, balance: u64) -> Self {
        Self {
            id: id.into(),
            first_name: String::new(),
            last_name: String::new(),
            balance: Tokens(balance),
        }
    }
}

// ==============================================================================
// Project
// ==============================================================================

/// Lifecycle state of a project. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectState {
    Active,
    Closed,
}

impl std::fmt::Display for ProjectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub goal: Tokens,
    pub balance: Tokens,
    pub state: ProjectState,
    pub creator: CreatorId,
    /// Pledges in contribution order.
    #[serde(default)]
    pub pledges: Vec<Pledge>,
}

impl Project {
    pub fn new(
        id: impl Into<ProjectId>,
        title: impl Into<String>,
        goal: u64,
        creator: impl Into<CreatorId>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            goal: Tokens(goal),
            balance: Tokens::ZERO,
            state: ProjectState::Active,
            creator: creator.into(),
            pledges: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ProjectState::Active
    }

    /// A balance equal to the goal counts as met.
    pub fn goal_met(&self) -> bool {
        self.balance >= self.goal
    }

    pub fn pledged_total(&self) -> Tokens {
        self.pledges.iter().map(|p| p.value).sum()
    }

    /// Distinct backers with a pledge on this project, sorted.
    pub fn backer_ids(&self) -> Vec<BackerId> {
        let mut ids: Vec<BackerId> = self.pledges.iter().map(|p| p.backer.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

// ==============================================================================
// Pledge
// ==============================================================================

/// A recorded contribution. Embedded in both the backer's and the project's
/// pledge lists; never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pledge {
    pub id: PledgeId,
    pub value: Tokens,
    pub backer: BackerId,
    pub backed_project: ProjectId,
}
