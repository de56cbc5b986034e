//! Run-scoped snapshot store: the unit of rollback.
//!
//! Pre-write file contents are kept in an arena indexed by cycle number, so
//! rolling a cycle back is a lookup and a write-back rather than a scan for
//! backup files scattered alongside the source tree. Backups are recoverable
//! until the run ends.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::errors::RefineResult;

/// Arena of immutable pre-cycle file snapshots, indexed by cycle number.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    cycles: BTreeMap<u32, BTreeMap<PathBuf, String>>,
}

impl SnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file's pre-write content for a cycle. First write wins: a
    /// file backed up twice in one cycle keeps its original content.
    pub fn record(&mut self, cycle: u32, path: PathBuf, content: String) {
        self.cycles
            .entry(cycle)
            .or_default()
            .entry(path)
            .or_insert(content);
    }

    /// The pre-cycle content of a file, if it was backed up in that cycle.
    pub fn original(&self, cycle: u32, path: &Path) -> Option<&str> {
        self.cycles.get(&cycle)?.get(path).map(String::as_str)
    }

    /// All files backed up in a cycle.
    pub fn cycle_files(&self, cycle: u32) -> Vec<PathBuf> {
        self.cycles
            .get(&cycle)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Restore every file backed up in a cycle to its pre-cycle content,
    /// resolving paths against `root`. Returns the restored paths.
    pub async fn restore_cycle(&self, cycle: u32, root: &Path) -> RefineResult<Vec<PathBuf>> {
        let Some(files) = self.cycles.get(&cycle) else {
            return Ok(Vec::new());
        };

        let mut restored = Vec::with_capacity(files.len());
        for (path, content) in files {
            let absolute = root.join(path);
            tokio::fs::write(&absolute, content).await?;
            restored.push(path.clone());
        }

        tracing::info!(cycle, files = restored.len(), "restored pre-cycle snapshot");
        Ok(restored)
    }

    /// Number of cycles with at least one backup.
    pub fn cycles_recorded(&self) -> usize {
        self.cycles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_backup_wins_within_a_cycle() {
        let mut store = SnapshotStore::new();
        store.record(1, PathBuf::from("a.css"), "original".into());
        store.record(1, PathBuf::from("a.css"), "already modified".into());
        assert_eq!(store.original(1, Path::new("a.css")), Some("original"));
    }

    #[test]
    fn cycles_are_independent() {
        let mut store = SnapshotStore::new();
        store.record(1, PathBuf::from("a.css"), "cycle one".into());
        store.record(2, PathBuf::from("a.css"), "cycle two".into());
        assert_eq!(store.original(1, Path::new("a.css")), Some("cycle one"));
        assert_eq!(store.original(2, Path::new("a.css")), Some("cycle two"));
    }

    #[tokio::test]
    async fn restore_writes_originals_back() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("style.css");
        tokio::fs::write(&file, "body { color: #333; }").await.unwrap();

        let mut store = SnapshotStore::new();
        store.record(1, PathBuf::from("style.css"), "body { color: #333; }".into());

        tokio::fs::write(&file, "body { color: red; }").await.unwrap();
        let restored = store.restore_cycle(1, dir.path()).await.unwrap();
        assert_eq!(restored, vec![PathBuf::from("style.css")]);

        let content = tokio::fs::read_to_string(&file).await.unwrap();
        assert_eq!(content, "body { color: #333; }");
    }

    #[tokio::test]
    async fn restore_of_unknown_cycle_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new();
        let restored = store.restore_cycle(7, dir.path()).await.unwrap();
        assert!(restored.is_empty());
    }
}
