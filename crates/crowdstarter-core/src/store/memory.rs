//! `MemoryRepository`: the in-memory registry set.
//!
//! Every mutation is staged on a copy of the current state, flushed to the
//! snapshot file when persistence is enabled, and only then swapped in.
//! A failed flush therefore leaves the visible state untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::registry::{ChangeSet, Entity, Registry, Repository};
use crate::types::{Backer, BackerId, Creator, CreatorId, Project, ProjectId};

use super::snapshot::Snapshot;

#[derive(Debug, Clone, Default)]
struct State {
    backers: BTreeMap<BackerId, Backer>,
    creators: BTreeMap<CreatorId, Creator>,
    projects: BTreeMap<ProjectId, Project>,
}

impl State {
    fn from_snapshot(snapshot: Snapshot) -> Result<Self, CoreError> {
        let mut state = State::default();
        for backer in snapshot.backers {
            insert_unique(&mut state.backers, backer)?;
        }
        for creator in snapshot.creators {
            insert_unique(&mut state.creators, creator)?;
        }
        for project in snapshot.projects {
            insert_unique(&mut state.projects, project)?;
        }
        Ok(state)
    }

    fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            backers: self.backers.values().cloned().collect(),
            creators: self.creators.values().cloned().collect(),
            projects: self.projects.values().cloned().collect(),
        }
    }
}

fn insert_unique<E: Entity>(map: &mut BTreeMap<E::Id, E>, entity: E) -> Result<(), CoreError> {
    let id = entity.id().clone();
    if map.contains_key(&id) {
        return Err(CoreError::SnapshotParse(format!(
            "duplicate {} id: {id}",
            E::KIND
        )));
    }
    map.insert(id, entity);
    Ok(())
}

fn replace<E: Entity>(map: &mut BTreeMap<E::Id, E>, entity: &E) -> Result<(), CoreError> {
    let slot = map
        .get_mut(entity.id())
        .ok_or_else(|| E::not_found(entity.id()))?;
    *slot = entity.clone();
    Ok(())
}

pub struct MemoryRepository {
    state: RwLock<State>,
    persist_path: Option<PathBuf>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            persist_path: None,
        }
    }

    /// Build a repository holding `snapshot`. Duplicate ids are rejected.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, CoreError> {
        Ok(Self {
            state: RwLock::new(State::from_snapshot(snapshot)?),
            persist_path: None,
        })
    }

    /// Load the snapshot at `path` (or start empty when the file does not
    /// exist yet) and rewrite it after every change.
    pub async fn with_persistence(path: &Path) -> Result<Self, CoreError> {
        let snapshot = if tokio::fs::try_exists(path).await? {
            Snapshot::load(path).await?
        } else {
            tracing::warn!(path = %path.display(), "snapshot not found; starting empty");
            Snapshot::default()
        };
        let mut repo = Self::from_snapshot(snapshot)?;
        repo.persist_path = Some(path.to_path_buf());
        Ok(repo)
    }

    pub fn persist_path(&self) -> Option<&Path> {
        self.persist_path.as_deref()
    }

    // ========================================================================
    // Seeding
    // ========================================================================

    pub fn with_backer(mut self, backer: Backer) -> Self {
        self.state.get_mut().backers.insert(backer.id.clone(), backer);
        self
    }

    pub fn with_creator(mut self, creator: Creator) -> Self {
        self.state.get_mut().creators.insert(creator.id.clone(), creator);
        self
    }

    pub fn with_project(mut self, project: Project) -> Self {
        self.state.get_mut().projects.insert(project.id.clone(), project);
        self
    }

    // ========================================================================
    // Query
    // ========================================================================

    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.to_snapshot()
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Stage `mutate` on a copy of the state, flush it, then publish it.
    async fn apply<F>(&self, mutate: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut State) -> Result<(), CoreError>,
    {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        mutate(&mut next)?;

        if let Some(path) = &self.persist_path {
            next.to_snapshot().save(path).await.map_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "snapshot flush failed");
                CoreError::Persistence(e.to_string())
            })?;
        }

        *state = next;
        Ok(())
    }
}

// ==============================================================================
// Registry implementations
// ==============================================================================

#[async_trait]
impl Registry<Backer> for MemoryRepository {
    async fn get(&self, id: &BackerId) -> Result<Backer, CoreError> {
        self.state
            .read()
            .await
            .backers
            .get(id)
            .cloned()
            .ok_or_else(|| Backer::not_found(id))
    }

    async fn update(&self, entity: &Backer) -> Result<(), CoreError> {
        self.apply(|state| replace(&mut state.backers, entity)).await
    }

    async fn update_all(&self, entities: &[Backer]) -> Result<(), CoreError> {
        self.apply(|state| {
            entities
                .iter()
                .try_for_each(|backer| replace(&mut state.backers, backer))
        })
        .await
    }
}

#[async_trait]
impl Registry<Creator> for MemoryRepository {
    async fn get(&self, id: &CreatorId) -> Result<Creator, CoreError> {
        self.state
            .read()
            .await
            .creators
            .get(id)
            .cloned()
            .ok_or_else(|| Creator::not_found(id))
    }

    async fn update(&self, entity: &Creator) -> Result<(), CoreError> {
        self.apply(|state| replace(&mut state.creators, entity)).await
    }

    async fn update_all(&self, entities: &[Creator]) -> Result<(), CoreError> {
        self.apply(|state| {
            entities
                .iter()
                .try_for_each(|creator| replace(&mut state.creators, creator))
        })
        .await
    }
}

#[async_trait]
impl Registry<Project> for MemoryRepository {
    async fn get(&self, id: &ProjectId) -> Result<Project, CoreError> {
        self.state
            .read()
            .await
            .projects
            .get(id)
            .cloned()
            .ok_or_else(|| Project::not_found(id))
    }

    async fn update(&self, entity: &Project) -> Result<(), CoreError> {
        self.apply(|state| replace(&mut state.projects, entity)).await
    }

    async fn update_all(&self, entities: &[Project]) -> Result<(), CoreError> {
        self.apply(|state| {
            entities
                .iter()
                .try_for_each(|project| replace(&mut state.projects, project))
        })
        .await
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn commit(&self, changes: ChangeSet) -> Result<(), CoreError> {
        self.apply(|state| {
            replace(&mut state.projects, &changes.project)?;
            for backer in &changes.backers {
                replace(&mut state.backers, backer)?;
            }
            if let Some(creator) = &changes.creator {
                replace(&mut state.creators, creator)?;
            }
            Ok(())
        })
        .await
    }
}
