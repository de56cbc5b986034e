//! Implementer port and the point-in-time file snapshot it plans against.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::RefineResult;
use crate::domain::models::{ChangePlan, Recommendation};

/// Immutable view of the candidate files at planning time.
///
/// Paths are relative to the project root. The snapshot is owned by the
/// controller and refreshed once per cycle, so planning within one cycle is
/// always against a consistent view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FileSnapshot {
    files: BTreeMap<PathBuf, String>,
    taken_at: DateTime<Utc>,
}

impl FileSnapshot {
    /// Build a snapshot from already-read file contents.
    pub fn from_files(files: BTreeMap<PathBuf, String>) -> Self {
        Self {
            files,
            taken_at: Utc::now(),
        }
    }

    /// Content of one file, if it is in the snapshot.
    pub fn content(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Content of one line (1-indexed), if file and line exist.
    pub fn line(&self, path: &Path, line: usize) -> Option<&str> {
        if line == 0 {
            return None;
        }
        self.content(path)?.lines().nth(line - 1)
    }

    /// Whether the snapshot contains the given file.
    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Iterate over all snapshot entries.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &String)> {
        self.files.iter()
    }

    /// Number of files in the snapshot.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// When the snapshot was taken.
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}

/// External code-generation capability: turns one approved recommendation
/// into a concrete, line-exact change plan.
///
/// Returning an empty plan means "no safe edit found" and is a skip, not an
/// error. The implementation owns its own per-call timeout.
#[async_trait]
pub trait Implementer: Send + Sync {
    /// Produce a change plan for one recommendation against the snapshot.
    async fn plan(
        &self,
        recommendation: &Recommendation,
        snapshot: &FileSnapshot,
    ) -> RefineResult<ChangePlan>;
}
