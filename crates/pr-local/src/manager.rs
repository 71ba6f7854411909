//! Local-review session manager: start, get-diff, staleness-check,
//! refresh, and session rekey on HEAD change. The only mutable state kept
//! here is an in-memory diff cache keyed by review id — the fast path
//! after `start`; the store's persisted snapshot is the cold-read fallback.

use crate::digest;
use crate::git;
use anyhow::{Context, Result, bail};
use pr_core::model::{DiffStats, LocalDiffSnapshot, Review};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

const STALENESS_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct StartOutcome {
    pub review: Review,
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub diff_text: String,
    pub stats: DiffStats,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Staleness {
    Fresh,
    HeadChanged { original_head_sha: String, new_head_sha: String },
    DiffChanged,
    Unknown { error: String },
}

#[derive(Clone, Debug)]
pub struct RefreshOutcome {
    pub stats: DiffStats,
    pub session_changed: bool,
    pub new_review: Option<Review>,
    pub original_head_sha: Option<String>,
    pub new_head_sha: Option<String>,
}

struct Captured {
    repo_root: PathBuf,
    head_sha: String,
    branch: Option<String>,
    repository: Option<String>,
    diff_text: String,
    stats: DiffStats,
    digest: String,
}

fn capture(path: &Path) -> Result<Captured> {
    let repo_root = git::discover_repo_root(path)
        .with_context(|| format!("{} is not inside a git repository", path.display()))?;
    let head_sha = git::head_sha(&repo_root)?;
    let branch = git::current_branch(&repo_root)?;
    let repository = git::repository_identifier(&repo_root);
    let (tracked_diff, untracked) = git::working_tree_diff(&repo_root)?;
    let stats = git::diff_stats(&repo_root, &untracked)?;
    let diff_text = synthesize_untracked_diff(tracked_diff, &repo_root, &untracked)?;
    let digest = digest::compute(&diff_text, stats);
    Ok(Captured { repo_root, head_sha, branch, repository, diff_text, stats, digest })
}

/// Runs the blocking git capture on a blocking-pool thread so it can't
/// starve the async runtime, and so an async `timeout` around it actually
/// bounds the wait instead of never getting polled.
async fn capture_blocking(path: PathBuf) -> Result<Captured> {
    tokio::task::spawn_blocking(move || capture(&path)).await.context("git capture task panicked")?
}

/// Appends untracked files to the diff text as if freshly added, so
/// consumers see one unified patch instead of needing a second lookup.
fn synthesize_untracked_diff(mut diff_text: String, repo_root: &Path, untracked: &[String]) -> Result<String> {
    for file in untracked {
        let content = std::fs::read_to_string(repo_root.join(file)).unwrap_or_default();
        diff_text.push_str(&format!(
            "diff --git a/{file} b/{file}\nnew file mode 100644\n--- /dev/null\n+++ b/{file}\n"
        ));
        for line in content.lines() {
            diff_text.push('+');
            diff_text.push_str(line);
            diff_text.push('\n');
        }
    }
    Ok(diff_text)
}

/// Owns the store handle and an in-memory per-review diff cache.
pub struct LocalReviewManager {
    store: pr_store::Store,
    cache: Arc<Mutex<HashMap<i64, (String, DiffStats)>>>,
}

impl LocalReviewManager {
    pub fn new(store: pr_store::Store) -> Self {
        Self { store, cache: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub async fn start(&self, path: &Path) -> Result<StartOutcome> {
        if !path.exists() {
            bail!("path does not exist: {}", path.display());
        }
        let captured = capture_blocking(path.to_path_buf()).await?;
        let review = self
            .store
            .upsert_local_review(
                &captured.repo_root.to_string_lossy(),
                &captured.head_sha,
                captured.branch.as_deref(),
            )
            .await
            .context("failed to upsert local review")?;
        self.store
            .save_local_diff(review.id, &captured.diff_text, captured.stats, &captured.digest)
            .await
            .context("failed to persist diff snapshot")?;
        self.cache
            .lock()
            .await
            .insert(review.id, (captured.diff_text.clone(), captured.stats));
        Ok(StartOutcome {
            review,
            repository: captured.repository,
            branch: captured.branch,
            diff_text: captured.diff_text,
            stats: captured.stats,
        })
    }

    /// Fast path: in-memory cache. Cold path: the store's persisted snapshot.
    pub async fn get_diff(&self, review_id: i64) -> Result<(String, DiffStats)> {
        if let Some(cached) = self.cache.lock().await.get(&review_id) {
            return Ok(cached.clone());
        }
        let snapshot = self
            .store
            .get_local_diff(review_id)
            .await
            .context("failed to load diff snapshot")?
            .context("no diff snapshot for review")?;
        Ok((snapshot.diff_text, snapshot.stats))
    }

    /// Bounded to ~2s so a hung git operation can't block the caller.
    pub async fn check_staleness(&self, review_id: i64) -> Staleness {
        match timeout(STALENESS_CHECK_TIMEOUT, self.check_staleness_inner(review_id)).await {
            Ok(result) => result,
            Err(_) => Staleness::Unknown { error: "staleness check timed out".into() },
        }
    }

    async fn check_staleness_inner(&self, review_id: i64) -> Staleness {
        let review = match self.store.get_review(review_id).await {
            Ok(r) => r,
            Err(e) => return Staleness::Unknown { error: e.to_string() },
        };
        let (local_path, original_head_sha) = match (review.local_path, review.local_head_sha) {
            (Some(p), Some(s)) => (p, s),
            _ => return Staleness::Unknown { error: "review is not a local review".into() },
        };
        let snapshot = match self.store.get_local_diff(review_id).await {
            Ok(Some(s)) => s,
            Ok(None) => return Staleness::Unknown { error: "no prior diff snapshot".into() },
            Err(e) => return Staleness::Unknown { error: e.to_string() },
        };

        let captured = match capture_blocking(PathBuf::from(&local_path)).await {
            Ok(c) => c,
            Err(e) => return Staleness::Unknown { error: e.to_string() },
        };

        if captured.head_sha != original_head_sha {
            return Staleness::HeadChanged {
                original_head_sha,
                new_head_sha: captured.head_sha,
            };
        }
        if captured.digest != snapshot.digest {
            return Staleness::DiffChanged;
        }
        Staleness::Fresh
    }

    /// Recapture and persist; if HEAD changed, also upsert a new review
    /// session bound to the new HEAD and report the rekey.
    pub async fn refresh(&self, review_id: i64) -> Result<RefreshOutcome> {
        let review = self.store.get_review(review_id).await.context("review not found")?;
        let (local_path, original_head_sha) = match (review.local_path, review.local_head_sha) {
            (Some(p), Some(s)) => (p, s),
            _ => bail!("review {review_id} is not a local review"),
        };

        let captured = capture_blocking(PathBuf::from(&local_path)).await?;

        if captured.head_sha != original_head_sha {
            let new_review = self
                .store
                .upsert_local_review(&local_path, &captured.head_sha, captured.branch.as_deref())
                .await?;
            self.store
                .save_local_diff(new_review.id, &captured.diff_text, captured.stats, &captured.digest)
                .await?;
            self.cache
                .lock()
                .await
                .insert(new_review.id, (captured.diff_text.clone(), captured.stats));
            return Ok(RefreshOutcome {
                stats: captured.stats,
                session_changed: true,
                new_review: Some(new_review),
                original_head_sha: Some(original_head_sha),
                new_head_sha: Some(captured.head_sha),
            });
        }

        self.store
            .save_local_diff(review_id, &captured.diff_text, captured.stats, &captured.digest)
            .await?;
        self.cache
            .lock()
            .await
            .insert(review_id, (captured.diff_text.clone(), captured.stats));
        Ok(RefreshOutcome {
            stats: captured.stats,
            session_changed: false,
            new_review: None,
            original_head_sha: None,
            new_head_sha: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn init_repo(root: &Path) {
        Command::new("git").arg("init").current_dir(root).output().unwrap();
        Command::new("git").args(["config", "user.email", "t@example.com"]).current_dir(root).output().unwrap();
        Command::new("git").args(["config", "user.name", "t"]).current_dir(root).output().unwrap();
        std::fs::write(root.join("a.txt"), "hello\n").unwrap();
        Command::new("git").args(["add", "."]).current_dir(root).output().unwrap();
        Command::new("git").args(["commit", "-m", "init"]).current_dir(root).output().unwrap();
    }

    #[tokio::test]
    async fn start_creates_review_and_caches_diff() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("a.txt"), "hello\nworld\n").unwrap();

        let store = pr_store::Store::open_in_memory().unwrap();
        let manager = LocalReviewManager::new(store);
        let outcome = manager.start(dir.path()).await.unwrap();
        assert!(outcome.diff_text.contains("world"));
        assert_eq!(outcome.stats.tracked_changes, 1);

        let (cached_diff, _) = manager.get_diff(outcome.review.id).await.unwrap();
        assert_eq!(cached_diff, outcome.diff_text);
    }

    #[tokio::test]
    async fn staleness_check_reports_fresh_when_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        let store = pr_store::Store::open_in_memory().unwrap();
        let manager = LocalReviewManager::new(store);
        let outcome = manager.start(dir.path()).await.unwrap();
        assert_eq!(manager.check_staleness(outcome.review.id).await, Staleness::Fresh);
    }

    #[tokio::test]
    async fn staleness_check_detects_diff_drift_without_head_change() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        let store = pr_store::Store::open_in_memory().unwrap();
        let manager = LocalReviewManager::new(store);
        let outcome = manager.start(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello\nchanged\n").unwrap();
        assert_eq!(manager.check_staleness(outcome.review.id).await, Staleness::DiffChanged);
    }

    #[tokio::test]
    async fn staleness_check_detects_head_change() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        let store = pr_store::Store::open_in_memory().unwrap();
        let manager = LocalReviewManager::new(store);
        let outcome = manager.start(dir.path()).await.unwrap();

        std::fs::write(dir.path().join("b.txt"), "second commit\n").unwrap();
        Command::new("git").args(["add", "."]).current_dir(dir.path()).output().unwrap();
        Command::new("git").args(["commit", "-m", "second"]).current_dir(dir.path()).output().unwrap();

        match manager.check_staleness(outcome.review.id).await {
            Staleness::HeadChanged { .. } => {}
            other => panic!("expected HeadChanged, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_on_head_change_creates_new_review_session() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        let store = pr_store::Store::open_in_memory().unwrap();
        let manager = LocalReviewManager::new(store);
        let outcome = manager.start(dir.path()).await.unwrap();

        std::fs::write(dir.path().join("b.txt"), "second commit\n").unwrap();
        Command::new("git").args(["add", "."]).current_dir(dir.path()).output().unwrap();
        Command::new("git").args(["commit", "-m", "second"]).current_dir(dir.path()).output().unwrap();

        let refreshed = manager.refresh(outcome.review.id).await.unwrap();
        assert!(refreshed.session_changed);
        assert!(refreshed.new_review.is_some());
        assert_ne!(refreshed.new_review.unwrap().id, outcome.review.id);
    }
}
