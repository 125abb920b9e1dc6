//! JSON snapshot of every backer, creator and project.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Backer, Creator, Project, Tokens};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub backers: Vec<Backer>,
    #[serde(default)]
    pub creators: Vec<Creator>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl Snapshot {
    pub fn from_json(content: &str) -> Result<Self, CoreError> {
        serde_json::from_str(content).map_err(|e| CoreError::SnapshotParse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::Persistence(e.to_string()))
    }

    pub async fn load(path: &Path) -> Result<Self, CoreError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    /// Write to a sibling temp file and rename it over `path`, so readers
    /// never see a half-written snapshot.
    pub async fn save(&self, path: &Path) -> Result<(), CoreError> {
        let content = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, content).await?;
        if let Err(err) = tokio::fs::rename(&tmp, path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                tracing::warn!(error = %cleanup, "failed to remove partial snapshot");
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Tokens held across every backer, creator and project.
    pub fn total_supply(&self) -> u128 {
        let backers = self.backers.iter().map(|b| b.balance);
        let creators = self.creators.iter().map(|c| c.balance);
        let projects = self.projects.iter().map(|p| p.balance);
        backers
            .chain(creators)
            .chain(projects)
            .map(|Tokens(v)| u128::from(v))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_supply_sums_every_holder() {
        let mut project = Project::new("p1", "Odin Sphere", 10_000, "vanilla@va.jp");
        project.balance = Tokens(5_000);
        let snapshot = Snapshot {
            backers: vec![Backer::new("alice", 10_000), Backer::new("bob", 30_000)],
            creators: vec![Creator::new("vanilla@va.jp", 1_000)],
            projects: vec![project],
        };
        assert_eq!(snapshot.total_supply(), 46_000);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let snapshot = Snapshot::from_json(r#"{"backers":[]}"#).expect("parse");
        assert!(snapshot.creators.is_empty());
        assert!(snapshot.projects.is_empty());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            Snapshot::from_json("{"),
            Err(CoreError::SnapshotParse(_))
        ));
    }

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.json");
        std::fs::create_dir(&path).expect("occupy target with a directory");
        std::fs::write(path.join("keep"), "x").expect("populate directory");

        assert!(matches!(
            Snapshot::default().save(&path).await,
            Err(CoreError::Io(_))
        ));
        assert!(!dir.path().join("ledger.json.tmp").exists());
    }

    #[tokio::test]
    async fn save_then_load_preserves_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("ledger.json");
        let snapshot = Snapshot {
            backers: vec![Backer::new("alice", 10)],
            creators: vec![Creator::new("vanilla", 1)],
            projects: vec![Project::new("p1", "t", 5, "vanilla")],
        };
        snapshot.save(&path).await.expect("save");
        assert_eq!(Snapshot::load(&path).await.expect("load"), snapshot);
    }
}
