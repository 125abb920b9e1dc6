//! Shared test helpers for `crowdstarter-core` unit tests.
//!
//! Seeds the two-backer "Odin Sphere" fixture used across the ledger
//! tests and wraps registry lookups so assertions stay short.

use std::sync::Arc;

use crate::ledger::Ledger;
use crate::registry::Registry;
use crate::store::MemoryRepository;
use crate::types::{Backer, BackerId, Creator, CreatorId, Project, ProjectId};

pub const ALICE: &str = "alice@gmail.com";
pub const BOB: &str = "bob@hotmail.com";
pub const VANILLA: &str = "vanilla@va.jp";
pub const ODIN_SPHERE: &str = "Proj0001";

// ==============================================================================
// Fixtures
// ==============================================================================

/// Active project with a goal of 10 000 owned by `VANILLA`.
pub fn odin_sphere_project() -> Project {
    let mut project = Project::new(ODIN_SPHERE, "Odin Sphere", 10_000, VANILLA);
    project.description = "2D".into();
    project
}

/// Alice (10 000), Bob (30 000), creator Vanilla (1 000), and Odin Sphere.
pub fn odin_sphere_repo() -> MemoryRepository {
    MemoryRepository::new()
        .with_backer(Backer::new(ALICE, 10_000))
        .with_backer(Backer::new(BOB, 30_000))
        .with_creator(Creator::new(VANILLA, 1_000))
        .with_project(odin_sphere_project())
}

pub fn odin_sphere_ledger() -> Ledger<MemoryRepository> {
    Ledger::new(Arc::new(odin_sphere_repo()))
}

// ==============================================================================
// Lookups
// ==============================================================================

pub async fn backer(ledger: &Ledger<MemoryRepository>, id: &str) -> Backer {
    Registry::<Backer>::get(ledger.repository().as_ref(), &BackerId::from(id))
        .await
        .expect("backer exists")
}

pub async fn creator(ledger: &Ledger<MemoryRepository>, id: &str) -> Creator {
    Registry::<Creator>::get(ledger.repository().as_ref(), &CreatorId::from(id))
        .await
        .expect("creator exists")
}

pub async fn project(ledger: &Ledger<MemoryRepository>, id: &str) -> Project {
    Registry::<Project>::get(ledger.repository().as_ref(), &ProjectId::from(id))
        .await
        .expect("project exists")
}
