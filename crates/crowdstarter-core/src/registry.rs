//! Registry port: the collaborator interface through which the ledger loads
//! and persists participants and projects.
//!
//! Defines the per-entity [`Registry`] trait and the [`Repository`] trait
//! that bundles all three registries with an atomic [`Repository::commit`].
//! The in-memory implementation lives in [`crate::store`].

use std::fmt::Display;
use std::hash::Hash;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Backer, BackerId, Creator, CreatorId, Project, ProjectId};

// ==============================================================================
// Entities
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Backer,
    Creator,
    Project,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backer => write!(f, "backer"),
            Self::Creator => write!(f, "creator"),
            Self::Project => write!(f, "project"),
        }
    }
}

/// A record the registries persist.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Ord + Hash + Display + Send + Sync;

    const KIND: EntityKind;

    fn id(&self) -> &Self::Id;

    fn not_found(id: &Self::Id) -> CoreError {
        CoreError::NotFound {
            kind: Self::KIND,
            id: id.to_string(),
        }
    }
}

impl Entity for Backer {
    type Id = BackerId;
    const KIND: EntityKind = EntityKind::Backer;

    fn id(&self) -> &BackerId {
        &self.id
    }
}

impl Entity for Creator {
    type Id = CreatorId;
    const KIND: EntityKind = EntityKind::Creator;

    fn id(&self) -> &CreatorId {
        &self.id
    }
}

impl Entity for Project {
    type Id = ProjectId;
    const KIND: EntityKind = EntityKind::Project;

    fn id(&self) -> &ProjectId {
        &self.id
    }
}

// ==============================================================================
// Ports
// ==============================================================================

/// Lookup and update for one entity type.
///
/// `update` replaces an existing record; updating an id the registry has
/// never seen is a `NotFound` error, since entities are created outside
/// the ledger.
#[async_trait]
pub trait Registry<E: Entity>: Send + Sync {
    async fn get(&self, id: &E::Id) -> Result<E, CoreError>;

    async fn update(&self, entity: &E) -> Result<(), CoreError>;

    /// Update many records. Implementations should apply all or none; the
    /// default simply updates one at a time.
    async fn update_all(&self, entities: &[E]) -> Result<(), CoreError> {
        for entity in entities {
            self.update(entity).await?;
        }
        Ok(())
    }
}

/// Every entity mutated by one transaction, persisted as a unit.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    pub project: Project,
    pub backers: Vec<Backer>,
    pub creator: Option<Creator>,
}

impl ChangeSet {
    pub fn project(project: Project) -> Self {
        Self {
            project,
            backers: Vec::new(),
            creator: None,
        }
    }

    pub fn with_backers(mut self, backers: Vec<Backer>) -> Self {
        self.backers = backers;
        self
    }

    pub fn with_creator(mut self, creator: Creator) -> Self {
        self.creator = Some(creator);
        self
    }
}

/// All three registries plus an atomic multi-entity commit.
///
/// `commit` must make either every record in the change set visible or
/// none of them; the ledger relies on this to keep tokens conserved when
/// persistence fails halfway.
#[async_trait]
pub trait Repository: Registry<Backer> + Registry<Creator> + Registry<Project> {
    async fn commit(&self, changes: ChangeSet) -> Result<(), CoreError>;
}
