//! Transaction shapes accepted by the ledger.
//!
//! Every reference is optional on the wire so that a missing or `null`
//! field survives deserialization and is rejected by the ledger with
//! `InvalidOperation` instead of failing to parse.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{BackerId, PledgeId, ProjectId, Tokens};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PledgeTx {
    /// Caller-supplied pledge id. When absent the ledger assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PledgeId>,
    #[serde(default)]
    pub value: Option<Tokens>,
    #[serde(default)]
    pub backed_project: Option<ProjectId>,
    #[serde(default)]
    pub backer: Option<BackerId>,
}

impl PledgeTx {
    pub fn new(
        backer: impl Into<BackerId>,
        backed_project: impl Into<ProjectId>,
        value: u64,
    ) -> Self {
        Self {
            id: None,
            value: Some(Tokens(value)),
            backed_project: Some(backed_project.into()),
            backer: Some(backer.into()),
        }
    }

    /// Resolve the required fields in the order project, backer, value.
    pub(crate) fn resolve(&self) -> Result<(&ProjectId, &BackerId, Tokens), CoreError> {
        let project = self
            .backed_project
            .as_ref()
            .ok_or_else(|| CoreError::invalid("pledge"))?;
        let backer = self.backer.as_ref().ok_or_else(|| CoreError::invalid("pledge"))?;
        let value = match self.value {
            Some(v) if !v.is_zero() => v,
            _ => return Err(CoreError::invalid("pledge")),
        };
        Ok((project, backer, value))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseTx {
    #[serde(default)]
    pub backed_project: Option<ProjectId>,
}

impl CloseTx {
    pub fn new(backed_project: impl Into<ProjectId>) -> Self {
        Self {
            backed_project: Some(backed_project.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundTx {
    #[serde(default)]
    pub backed_project: Option<ProjectId>,
}

impl RefundTx {
    pub fn new(backed_project: impl Into<ProjectId>) -> Self {
        Self {
            backed_project: Some(backed_project.into()),
        }
    }
}

/// A transaction of any kind, tagged by `"type"` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transaction {
    Pledge(PledgeTx),
    Close(CloseTx),
    Refund(RefundTx),
}

impl Transaction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pledge(_) => "pledge",
            Self::Close(_) => "close",
            Self::Refund(_) => "refund",
        }
    }

    pub fn backed_project(&self) -> Option<&ProjectId> {
        match self {
            Self::Pledge(tx) => tx.backed_project.as_ref(),
            Self::Close(tx) => tx.backed_project.as_ref(),
            Self::Refund(tx) => tx.backed_project.as_ref(),
        }
    }
}

impl From<PledgeTx> for Transaction {
    fn from(tx: PledgeTx) -> Self {
        Self::Pledge(tx)
    }
}

impl From<CloseTx> for Transaction {
    fn from(tx: CloseTx) -> Self {
        Self::Close(tx)
    }
}

impl From<RefundTx> for Transaction {
    fn from(tx: RefundTx) -> Self {
        Self::Refund(tx)
    }
}
