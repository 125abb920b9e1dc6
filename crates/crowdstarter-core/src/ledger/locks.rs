use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::{BackerId, CreatorId, ProjectId};

// ==============================================================================
// Lock Keys
// ==============================================================================

/// An entity a transaction may mutate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum LockKey {
    Project(ProjectId),
    Backer(BackerId),
    Creator(CreatorId),
}

// ==============================================================================
// Lock Table
// ==============================================================================

/// One async mutex per entity, created on first use.
///
/// Handlers take their project lock first and then the participant locks
/// in sorted order via [`LockTable::acquire_all`]. No handler locks a
/// project while holding a participant lock, so the ordering is acyclic.
#[derive(Default)]
pub(crate) struct LockTable {
    entries: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn acquire(&self, key: LockKey) -> OwnedMutexGuard<()> {
        let slot = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(key).or_default())
        };
        slot.lock_owned().await
    }

    /// Lock every key once, in sorted order.
    pub(crate) async fn acquire_all(
        &self,
        mut keys: Vec<LockKey>,
    ) -> Vec<OwnedMutexGuard<()>> {
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.acquire(key).await);
        }
        guards
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let table = Arc::new(LockTable::new());
        let guard = table.acquire(LockKey::Project("p1".into())).await;

        let contender = {
            let table = Arc::clone(&table);
            tokio::spawn(async move {
                let _g = table.acquire(LockKey::Project("p1".into())).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.expect("contender completes after release");
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block() {
        let table = LockTable::new();
        let _a = table.acquire(LockKey::Project("p1".into())).await;
        let _b = table.acquire(LockKey::Project("p2".into())).await;
        let _c = table.acquire(LockKey::Backer("p1".into())).await;
    }

    #[tokio::test]
    async fn acquire_all_dedups_keys() {
        let table = LockTable::new();
        let guards = table
            .acquire_all(vec![
                LockKey::Backer("bob".into()),
                LockKey::Backer("alice".into()),
                LockKey::Backer("bob".into()),
            ])
            .await;
        assert_eq!(guards.len(), 2);
    }
}
