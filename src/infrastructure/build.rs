//! Process-backed build runner.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::errors::{RefineError, RefineResult};
use crate::domain::models::BuildConfig;
use crate::domain::ports::{BuildOutput, BuildRunner};

/// Runs the project's build command (`npm run build` by default) as a child
/// process and captures its output. The timeout comes from the caller so the
/// verifier owns the budget; a timed-out process is killed and reported as a
/// failed build rather than an error.
#[derive(Debug, Clone)]
pub struct ProcessBuildRunner {
    program: String,
    args: Vec<String>,
}

impl ProcessBuildRunner {
    /// Build a runner from the configured command.
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }
}

#[async_trait]
impl BuildRunner for ProcessBuildRunner {
    async fn build(&self, project: &Path, timeout: Duration) -> RefineResult<BuildOutput> {
        tracing::debug!(
            program = %self.program,
            args = ?self.args,
            project = %project.display(),
            "running build"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(project)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RefineError::VerificationFailed(format!(
                    "failed to spawn '{}': {e}",
                    self.program
                ))
            })?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(BuildOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                timed_out: false,
            }),
            Ok(Err(e)) => Err(RefineError::VerificationFailed(format!(
                "build process failed: {e}"
            ))),
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "build timed out");
                // kill_on_drop reaps the child once the future is dropped
                Ok(BuildOutput {
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: format!("build timed out after {}s", timeout.as_secs()),
                    timed_out: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(program: &str, args: &[&str]) -> ProcessBuildRunner {
        ProcessBuildRunner::new(&BuildConfig {
            program: program.to_string(),
            args: args.iter().map(|s| (*s).to_string()).collect(),
            timeout_secs: 5,
        })
    }

    #[tokio::test]
    async fn successful_command_reports_clean_exit() {
        let dir = tempfile::tempdir().unwrap();
        let output = runner("true", &[])
            .build(dir.path(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(output.succeeded());
        assert_eq!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn failing_command_reports_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let output = runner("false", &[])
            .build(dir.path(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!output.succeeded());
        assert_ne!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn timeout_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let output = runner("sleep", &["5"])
            .build(dir.path(), Duration::from_millis(100))
            .await
            .unwrap();
        assert!(output.timed_out);
        assert!(!output.succeeded());
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = runner("definitely-not-a-real-program-xyz", &[])
            .build(dir.path(), Duration::from_secs(5))
            .await;
        assert!(result.is_err());
    }
}
