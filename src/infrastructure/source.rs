//! Source retrieval
//!
//! Fetches the branch head of the configured repository into a source
//! artifact and resolves the head revision identifier.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::tools::{get_tool_path, tools};

/// Resolved branch-head revision identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRevision {
    pub id: String,
}

/// Source retrieval interface: (repository, branch) -> (source tree, revision)
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Fetch the current head of `branch` from `repository` into `dest` and
    /// return the resolved revision. A missing repository or branch is an
    /// error, never a retry.
    async fn fetch(
        &self,
        repository: &str,
        branch: &str,
        dest: &Path,
    ) -> Result<SourceRevision, SourceError>;
}

/// Production source provider driving the git CLI
pub struct GitSource;

impl Default for GitSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GitSource {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the revision for an existing checkout.
    ///
    /// Priority:
    /// 1. RESOLVED_SOURCE_VERSION env var (set by the triggering system)
    /// 2. GIT_SHA env var (alternative)
    /// 3. git rev-parse HEAD in `dir` (fallback for direct CLI usage)
    ///
    /// Returns an empty string when nothing resolves; tag resolution then
    /// falls back to `latest` instead of failing the build.
    pub async fn resolve_revision(&self, dir: &Path) -> String {
        for var in ["RESOLVED_SOURCE_VERSION", "GIT_SHA"] {
            if let Ok(revision) = std::env::var(var) {
                if !revision.is_empty() {
                    debug!("source revision from {}", var);
                    return revision;
                }
            }
        }

        let output = Command::new(get_tool_path(tools::GIT))
            .args(["rev-parse", "HEAD"])
            .current_dir(dir)
            .output()
            .await;
        match output {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            _ => {
                debug!("no revision resolvable for {}", dir.display());
                String::new()
            }
        }
    }
}

#[async_trait]
impl SourceProvider for GitSource {
    async fn fetch(
        &self,
        repository: &str,
        branch: &str,
        dest: &Path,
    ) -> Result<SourceRevision, SourceError> {
        info!("📥 Fetching {} (branch {})", repository, branch);

        let git = get_tool_path(tools::GIT);
        let output = Command::new(&git)
            .args(["clone", "--depth", "1", "--branch", branch, "--single-branch"])
            .arg(repository)
            .arg(dest)
            .output()
            .await
            .map_err(|_| SourceError::CommandFailed {
                command: format!("{} clone", git),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_clone_failure(repository, branch, &stderr));
        }

        let output = Command::new(&git)
            .args(["rev-parse", "HEAD"])
            .current_dir(dest)
            .output()
            .await
            .map_err(|_| SourceError::CommandFailed {
                command: format!("{} rev-parse HEAD", git),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SourceError::RevisionFailed(stderr.trim().to_string()));
        }

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(SourceError::RevisionFailed("empty revision returned".to_string()));
        }

        // The artifact carries the tree only, not repository metadata
        let git_dir = dest.join(".git");
        if git_dir.exists() {
            tokio::fs::remove_dir_all(&git_dir)
                .await
                .map_err(|e| SourceError::FetchFailed {
                    message: format!("failed to strip repository metadata: {}", e),
                })?;
        }

        info!("✅ Fetched revision {}", id);
        Ok(SourceRevision { id })
    }
}

/// Map git clone stderr onto the source error taxonomy
fn classify_clone_failure(repository: &str, branch: &str, stderr: &str) -> SourceError {
    let lower = stderr.to_lowercase();
    if lower.contains("branch") && (lower.contains("not found") || lower.contains("couldn't find"))
    {
        SourceError::BranchNotFound {
            repository: repository.to_string(),
            branch: branch.to_string(),
        }
    } else if lower.contains("not found")
        || lower.contains("does not exist")
        || lower.contains("could not read")
        || lower.contains("no such file")
    {
        SourceError::RepositoryNotFound {
            repository: repository.to_string(),
        }
    } else {
        SourceError::FetchFailed {
            message: stderr.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_missing_branch() {
        let err = classify_clone_failure(
            "service-repo",
            "release",
            "fatal: Remote branch release not found in upstream origin",
        );
        assert!(matches!(err, SourceError::BranchNotFound { .. }));
    }

    #[test]
    fn test_classify_missing_repository() {
        let err = classify_clone_failure(
            "/srv/git/absent.git",
            "main",
            "fatal: repository '/srv/git/absent.git' does not exist",
        );
        assert!(matches!(err, SourceError::RepositoryNotFound { .. }));

        let err = classify_clone_failure(
            "https://example.com/absent.git",
            "main",
            "fatal: repository 'https://example.com/absent.git/' not found",
        );
        assert!(matches!(err, SourceError::RepositoryNotFound { .. }));
    }

    #[test]
    fn test_classify_other_failures_as_fetch_failed() {
        let err = classify_clone_failure(
            "service-repo",
            "main",
            "fatal: unable to access 'https://example.com/': Connection timed out",
        );
        match err {
            SourceError::FetchFailed { message } => {
                assert!(message.contains("Connection timed out"));
            }
            other => panic!("expected FetchFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_revision_prefers_env() {
        std::env::set_var("RESOLVED_SOURCE_VERSION", "feedc0ffee12");
        std::env::set_var("GIT_SHA", "deadbeef0000");

        let source = GitSource::new();
        let revision =
            tokio_test::block_on(source.resolve_revision(Path::new("/nonexistent-dir")));
        assert_eq!(revision, "feedc0ffee12");

        std::env::remove_var("RESOLVED_SOURCE_VERSION");
        let revision =
            tokio_test::block_on(source.resolve_revision(Path::new("/nonexistent-dir")));
        assert_eq!(revision, "deadbeef0000");

        std::env::remove_var("GIT_SHA");
    }
}
