use crate::registry::EntityKind;
use crate::types::{BackerId, ProjectId, Tokens};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("project is not active: {0}")]
    ProjectNotActive(ProjectId),

    #[error("backer {backer} does not have enough tokens: balance {balance}, requested {requested}")]
    InsufficientFunds {
        backer: BackerId,
        balance: Tokens,
        requested: Tokens,
    },

    #[error("project is already closed: {0}")]
    AlreadyClosed(ProjectId),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("token balance overflow")]
    BalanceOverflow,

    #[error("registry persistence failure: {0}")]
    Persistence(String),

    #[error("snapshot parse error: {0}")]
    SnapshotParse(String),

    #[error("journal parse error at line {line}: {message}")]
    JournalParse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether this error is a rejected transaction (bad input or a failed
    /// precondition) rather than a collaborator failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidOperation(_)
                | Self::ProjectNotActive(_)
                | Self::InsufficientFunds { .. }
                | Self::AlreadyClosed(_)
                | Self::NotFound { .. }
                | Self::BalanceOverflow
        )
    }

    pub(crate) fn invalid(op: &str) -> Self {
        Self::InvalidOperation(format!("invalid {op} operation"))
    }
}
