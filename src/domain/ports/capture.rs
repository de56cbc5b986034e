//! Capture and live-session ports.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::RefineResult;

/// Opaque representation of the artifact at a point in time (an image, a DOM
/// dump, or a content digest). The loop never inspects the payload; it only
/// hands it to the analyzer and compares digests for the content-delta
/// heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ArtifactSnapshot {
    /// Media/content type label, e.g. `image/png`, `text/html`,
    /// `text/x-digest`.
    pub content_type: String,
    /// Raw payload.
    pub payload: Vec<u8>,
    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
}

impl ArtifactSnapshot {
    /// Construct a snapshot taken now.
    pub fn new(content_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            payload,
            captured_at: Utc::now(),
        }
    }
}

/// External snapshot-capture capability.
#[async_trait]
pub trait Capture: Send + Sync {
    /// Capture the artifact rooted at `target`.
    async fn snapshot(&self, target: &Path) -> RefineResult<ArtifactSnapshot>;
}

/// Optional live-session channel used by verification to collect console
/// errors over a settling window. When no live session is available the
/// verifier falls back to a content-delta heuristic.
#[async_trait]
pub trait LiveSession: Send + Sync {
    /// Collect console errors observed during the settling window.
    async fn console_errors(&self, settle: Duration) -> RefineResult<Vec<String>>;
}
