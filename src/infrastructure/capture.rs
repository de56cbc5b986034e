//! Content-digest capture.
//!
//! The default capture walks the project's watched files and emits a stable
//! text digest, one `path:hash` line per file. It stands in wherever a real
//! rendering capture (screenshot, DOM dump) is not wired up; the loop only
//! compares digests, so any capture that changes when the artifact changes
//! is sufficient for the content-delta heuristic.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::domain::errors::RefineResult;
use crate::domain::ports::{ArtifactSnapshot, Capture};

/// Digest-based capture over the project's watched files.
#[derive(Debug, Clone)]
pub struct ContentDigestCapture {
    extensions: Vec<String>,
    max_file_bytes: u64,
}

impl ContentDigestCapture {
    /// Capture files with the given extensions, skipping anything larger
    /// than `max_file_bytes`.
    pub fn new(extensions: Vec<String>, max_file_bytes: u64) -> Self {
        Self {
            extensions,
            max_file_bytes,
        }
    }

    fn wants(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| {
                let ext = e.to_string_lossy().to_lowercase();
                self.extensions.iter().any(|w| *w == ext)
            })
            .unwrap_or(false)
    }
}

/// Directory skip rule shared by every project walk: dot-directories and
/// vendored build output are never edit or capture candidates.
pub(crate) fn hidden_or_vendored(entry: &walkdir::DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir()
        && (name.starts_with('.') || name == "node_modules" || name == "target")
}

#[async_trait]
impl Capture for ContentDigestCapture {
    async fn snapshot(&self, target: &Path) -> RefineResult<ArtifactSnapshot> {
        let mut lines = Vec::new();

        // Sorted traversal keeps the digest stable across filesystems.
        for entry in WalkDir::new(target)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !hidden_or_vendored(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.wants(entry.path()) {
                continue;
            }
            if entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX) > self.max_file_bytes {
                continue;
            }

            let content = tokio::fs::read(entry.path()).await?;
            let mut hasher = DefaultHasher::new();
            content.hash(&mut hasher);
            let relative = entry
                .path()
                .strip_prefix(target)
                .unwrap_or_else(|_| entry.path());
            lines.push(format!("{}:{:016x}", relative.display(), hasher.finish()));
        }

        tracing::debug!(files = lines.len(), "capture complete");
        Ok(ArtifactSnapshot::new(
            "text/x-digest",
            lines.join("\n").into_bytes(),
        ))
    }
}
