//! Run persistence: JSON artifacts under the run directory.
//!
//! Each run gets its own directory, `<run_dir>/<run-id>/`, holding one
//! `cycle-NNN.json` per completed cycle, the live `memory.json`, and the
//! final `report.json`. Memory is written after every cycle so a crashed run
//! can be resumed with its avoided targets and attempt history intact.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::domain::errors::{RefineError, RefineResult};
use crate::domain::models::{CycleRecord, RunMemory, RunReport};

/// File-backed store for one run's artifacts.
#[derive(Debug, Clone)]
pub struct RunStore {
    run_id: Uuid,
    run_path: PathBuf,
}

impl RunStore {
    /// Create a store for a fresh run, creating its directory.
    pub async fn create(base: impl AsRef<Path>) -> RefineResult<Self> {
        let run_id = Uuid::new_v4();
        let run_path = base.as_ref().join(run_id.to_string());
        tokio::fs::create_dir_all(&run_path)
            .await
            .map_err(|e| persistence_error(&run_path, &e))?;
        tracing::debug!(run_id = %run_id, path = %run_path.display(), "run directory created");
        Ok(Self { run_id, run_path })
    }

    /// Open the store for an existing run directory.
    pub fn open(base: impl AsRef<Path>, run_id: Uuid) -> RefineResult<Self> {
        let run_path = base.as_ref().join(run_id.to_string());
        if !run_path.is_dir() {
            return Err(RefineError::Persistence(format!(
                "no run directory at {}",
                run_path.display()
            )));
        }
        Ok(Self { run_id, run_path })
    }

    /// Find the most recently modified run directory under `base`.
    pub async fn latest_run(base: impl AsRef<Path>) -> RefineResult<Option<Self>> {
        let base = base.as_ref();
        if !base.is_dir() {
            return Ok(None);
        }

        let mut newest: Option<(std::time::SystemTime, Uuid)> = None;
        let mut entries = tokio::fs::read_dir(base)
            .await
            .map_err(|e| persistence_error(base, &e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| persistence_error(base, &e))?
        {
            let Ok(run_id) = Uuid::parse_str(&entry.file_name().to_string_lossy()) else {
                continue;
            };
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_dir() {
                continue;
            }
            let modified = metadata
                .modified()
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            if newest.map_or(true, |(t, _)| modified > t) {
                newest = Some((modified, run_id));
            }
        }

        match newest {
            Some((_, run_id)) => Ok(Some(Self::open(base, run_id)?)),
            None => Ok(None),
        }
    }

    /// The run's identifier.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The run's directory.
    pub fn path(&self) -> &Path {
        &self.run_path
    }

    /// Persist one cycle's record as `cycle-NNN.json`.
    pub async fn save_cycle(&self, record: &CycleRecord) -> RefineResult<()> {
        let path = self.run_path.join(format!("cycle-{:03}.json", record.cycle));
        self.write_json(&path, record).await
    }

    /// Persist the run memory, replacing any previous snapshot.
    pub async fn save_memory(&self, memory: &RunMemory) -> RefineResult<()> {
        self.write_json(&self.run_path.join("memory.json"), memory)
            .await
    }

    /// Load previously persisted memory, if any.
    pub async fn load_memory(&self) -> RefineResult<Option<RunMemory>> {
        self.read_json(&self.run_path.join("memory.json")).await
    }

    /// Persist the final run report.
    pub async fn save_report(&self, report: &RunReport) -> RefineResult<()> {
        self.write_json(&self.run_path.join("report.json"), report)
            .await
    }

    /// Load the run's report, if the run finished.
    pub async fn load_report(&self) -> RefineResult<Option<RunReport>> {
        self.read_json(&self.run_path.join("report.json")).await
    }

    // Write-then-rename so readers never observe a half-written artifact.
    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> RefineResult<()> {
        let json = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| persistence_error(&tmp, &e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| persistence_error(path, &e))?;
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &Path,
    ) -> RefineResult<Option<T>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(persistence_error(path, &e)),
        }
    }
}

fn persistence_error(path: &Path, err: &std::io::Error) -> RefineError {
    RefineError::Persistence(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ScoreEntry;
    use chrono::Utc;

    fn sample_memory() -> RunMemory {
        let mut memory = RunMemory::default();
        memory.promote_to_avoided("header".into());
        memory.record_score(1, 6.0, 6.8, 0.2);
        memory
    }

    #[tokio::test]
    async fn memory_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::create(dir.path()).await.unwrap();

        assert!(store.load_memory().await.unwrap().is_none());

        let memory = sample_memory();
        store.save_memory(&memory).await.unwrap();
        let back = store.load_memory().await.unwrap().unwrap();
        assert!(back.avoided_targets.contains("header"));
        assert_eq!(back.completed_cycles(), 1);
    }

    #[tokio::test]
    async fn save_memory_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::create(dir.path()).await.unwrap();

        store.save_memory(&sample_memory()).await.unwrap();
        let mut updated = sample_memory();
        updated.record_score(2, 6.8, 7.5, 0.2);
        store.save_memory(&updated).await.unwrap();

        let back = store.load_memory().await.unwrap().unwrap();
        assert_eq!(back.completed_cycles(), 2);
        // no stray tmp file should remain after the rename
        assert!(!store.path().join("memory.json.tmp").exists());
    }

    #[tokio::test]
    async fn report_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStore::create(dir.path()).await.unwrap();

        let report = RunReport {
            run_id: store.run_id(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            stop_reason: crate::domain::models::StopReason::TargetReached,
            final_score: 8.6,
            cycles_completed: 2,
            score_history: vec![ScoreEntry {
                cycle: 1,
                before: 6.5,
                after: 7.2,
                delta: 0.7,
            }],
            cycles: Vec::new(),
        };
        store.save_report(&report).await.unwrap();
        let back = store.load_report().await.unwrap().unwrap();
        assert_eq!(back.run_id, report.run_id);
        assert_eq!(back.cycles_completed, 2);
    }

    #[tokio::test]
    async fn latest_run_finds_the_run_just_created() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RunStore::latest_run(dir.path()).await.unwrap().is_none());

        let store = RunStore::create(dir.path()).await.unwrap();
        let latest = RunStore::latest_run(dir.path()).await.unwrap().unwrap();
        assert_eq!(latest.run_id(), store.run_id());
    }

    #[tokio::test]
    async fn open_rejects_missing_run() {
        let dir = tempfile::tempdir().unwrap();
        let result = RunStore::open(dir.path(), Uuid::new_v4());
        assert!(result.is_err());
    }
}
