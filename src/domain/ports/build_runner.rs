//! Build-runner port.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::RefineResult;

/// Outcome of one build invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BuildOutput {
    /// Process exit code. Nonzero on failure; `-1` when the process could
    /// not report one (killed, timed out).
    pub exit_code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Whether the caller-supplied timeout elapsed. A timed-out build is
    /// treated as a failed build.
    pub timed_out: bool,
}

impl BuildOutput {
    /// Whether the build succeeded: clean exit and no timeout.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Lines of stderr that carry a compiler-error signature.
    pub fn error_lines(&self) -> Vec<String> {
        self.stderr
            .lines()
            .map(str::trim)
            .filter(|l| l.starts_with("error"))
            .map(String::from)
            .collect()
    }
}

/// External build/test execution capability.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Run the project's build with a caller-supplied timeout.
    async fn build(&self, project: &Path, timeout: Duration) -> RefineResult<BuildOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_out_build_is_a_failure() {
        let output = BuildOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
        };
        assert!(!output.succeeded());
    }

    #[test]
    fn error_lines_filters_compiler_signatures() {
        let output = BuildOutput {
            exit_code: 1,
            stdout: String::new(),
            stderr: "warning: unused\nerror TS2304: Cannot find name 'foo'\n  at x".into(),
            timed_out: false,
        };
        let errors = output.error_lines();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("TS2304"));
    }
}
