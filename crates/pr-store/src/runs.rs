//! Analysis run repository. Runs form a tree (`parent_run_id`) for council
//! fan-out: one parent run per council invocation, one child per voice.

use chrono::{DateTime, Utc};
use pr_core::AppError;
use pr_core::model::{AnalysisRun, ConfigType, RunStatus, Tier};
use rusqlite::{OptionalExtension, Row, params};

use crate::Store;

fn row_to_run(row: &Row) -> rusqlite::Result<AnalysisRun> {
    let status: String = row.get("status")?;
    let config_type: String = row.get("config_type")?;
    let tier: Option<String> = row.get("tier")?;
    let levels_config: String = row.get("levels_config")?;
    Ok(AnalysisRun {
        id: row.get("id")?,
        review_id: row.get("review_id")?,
        provider: row.get("provider")?,
        model: row.get("model")?,
        tier: tier.map(|t| match t.as_str() {
            "fast" => Tier::Fast,
            "thorough" => Tier::Thorough,
            _ => Tier::Balanced,
        }),
        status: match status.as_str() {
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            "cancelled" => RunStatus::Cancelled,
            _ => RunStatus::Running,
        },
        started_at: row.get("started_at")?,
        completed_at: row.get("completed_at")?,
        summary: row.get("summary")?,
        total_suggestions: row.get("total_suggestions")?,
        files_analyzed: row.get("files_analyzed")?,
        head_sha: row.get("head_sha")?,
        custom_instructions: row.get("custom_instructions")?,
        repo_instructions: row.get("repo_instructions")?,
        request_instructions: row.get("request_instructions")?,
        parent_run_id: row.get("parent_run_id")?,
        config_type: match config_type.as_str() {
            "advanced" => ConfigType::Advanced,
            "council" => ConfigType::Council,
            _ => ConfigType::Single,
        },
        levels_config: serde_json::from_str(&levels_config).unwrap_or(serde_json::json!({})),
    })
}

/// Fields needed to start a run; `terminal_status` lets external ingestion
/// record an already-finished run in one insert instead of
/// create-then-immediately-update.
pub struct NewRun<'a> {
    pub id: &'a str,
    pub review_id: i64,
    pub provider: Option<&'a str>,
    pub model: Option<&'a str>,
    pub tier: Option<Tier>,
    pub head_sha: &'a str,
    pub custom_instructions: Option<&'a str>,
    pub repo_instructions: Option<&'a str>,
    pub request_instructions: Option<&'a str>,
    pub parent_run_id: Option<&'a str>,
    pub config_type: ConfigType,
    pub levels_config: serde_json::Value,
    pub terminal_status: Option<RunStatus>,
}

impl Store {
    pub async fn create_run(&self, new_run: NewRun<'_>) -> Result<AnalysisRun, AppError> {
        let conn = self.lock().await;
        let now = Utc::now();
        let (status, completed_at) = match new_run.terminal_status {
            Some(s) => (s, Some(now)),
            None => (RunStatus::Running, None),
        };
        conn.execute(
            "INSERT INTO analysis_runs
                (id, review_id, parent_run_id, provider, model, tier, status, config_type,
                 levels_config, head_sha, custom_instructions, repo_instructions,
                 request_instructions, started_at, completed_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
            params![
                new_run.id,
                new_run.review_id,
                new_run.parent_run_id,
                new_run.provider,
                new_run.model,
                new_run.tier.map(|t| t.as_str()),
                status.as_str(),
                new_run.config_type.as_str(),
                new_run.levels_config.to_string(),
                new_run.head_sha,
                new_run.custom_instructions,
                new_run.repo_instructions,
                new_run.request_instructions,
                now,
                completed_at,
            ],
        )?;
        fetch(&conn, new_run.id)
    }

    pub async fn get_run(&self, id: &str) -> Result<AnalysisRun, AppError> {
        let conn = self.lock().await;
        fetch(&conn, id)
    }

    /// Transition a run's status, optionally setting summary/counts. A run
    /// already in a terminal status is left untouched (idempotent).
    pub async fn update_run_status(
        &self,
        id: &str,
        status: RunStatus,
        summary: Option<&str>,
        total_suggestions: Option<i64>,
        files_analyzed: Option<i64>,
    ) -> Result<AnalysisRun, AppError> {
        let conn = self.lock().await;
        let run = fetch(&conn, id)?;
        if is_terminal(&run.status) {
            return Ok(run);
        }
        let completed_at = if is_terminal(&status) { Some(Utc::now()) } else { None };
        conn.execute(
            "UPDATE analysis_runs SET
                status = ?2,
                summary = COALESCE(?3, summary),
                total_suggestions = COALESCE(?4, total_suggestions),
                files_analyzed = COALESCE(?5, files_analyzed),
                completed_at = COALESCE(?6, completed_at)
             WHERE id = ?1",
            params![id, status.as_str(), summary, total_suggestions, files_analyzed, completed_at],
        )?;
        fetch(&conn, id)
    }

    /// Runs for a review, completed runs first (most recent completion
    /// first), then still-running runs, parents ordered ahead of children.
    pub async fn list_runs_for_review(&self, review_id: i64) -> Result<Vec<AnalysisRun>, AppError> {
        let conn = self.lock().await;
        let mut stmt = conn.prepare(
            "SELECT * FROM analysis_runs WHERE review_id = ?1
             ORDER BY (parent_run_id IS NOT NULL), completed_at DESC, started_at DESC",
        )?;
        let rows = stmt.query_map(params![review_id], row_to_run)?.collect::<Result<_, _>>()?;
        Ok(rows)
    }

    pub async fn list_child_runs(&self, parent_run_id: &str) -> Result<Vec<AnalysisRun>, AppError> {
        let conn = self.lock().await;
        let mut stmt =
            conn.prepare("SELECT * FROM analysis_runs WHERE parent_run_id = ?1 ORDER BY started_at ASC")?;
        let rows = stmt.query_map(params![parent_run_id], row_to_run)?.collect::<Result<_, _>>()?;
        Ok(rows)
    }

    pub async fn latest_run_for_review(&self, review_id: i64) -> Result<Option<AnalysisRun>, AppError> {
        let conn = self.lock().await;
        conn.query_row(
            "SELECT * FROM analysis_runs WHERE review_id = ?1 AND parent_run_id IS NULL
             ORDER BY started_at DESC LIMIT 1",
            params![review_id],
            row_to_run,
        )
        .optional()
        .map_err(Into::into)
    }

    pub async fn delete_run(&self, id: &str) -> Result<(), AppError> {
        let conn = self.lock().await;
        fetch(&conn, id)?;
        conn.execute("DELETE FROM analysis_runs WHERE id = ?1", params![id])?;
        Ok(())
    }
}

fn is_terminal(status: &RunStatus) -> bool {
    matches!(status, RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled)
}

fn fetch(conn: &rusqlite::Connection, id: &str) -> Result<AnalysisRun, AppError> {
    conn.query_row("SELECT * FROM analysis_runs WHERE id = ?1", params![id], row_to_run)
        .optional()?
        .ok_or_else(|| AppError::not_found("analysis_run", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_run<'a>(id: &'a str, review_id: i64) -> NewRun<'a> {
        NewRun {
            id,
            review_id,
            provider: Some("claude"),
            model: Some("claude-opus"),
            tier: Some(Tier::Balanced),
            head_sha: "sha1",
            custom_instructions: None,
            repo_instructions: None,
            request_instructions: None,
            parent_run_id: None,
            config_type: ConfigType::Single,
            levels_config: serde_json::json!({}),
            terminal_status: None,
        }
    }

    #[tokio::test]
    async fn create_run_defaults_to_running() {
        let store = Store::open_in_memory().unwrap();
        let review = store.upsert_local_review("/tmp/repo", "sha1", None).await.unwrap();
        let run = store.create_run(new_run("r1", review.id)).await.unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.completed_at.is_none());
    }

    #[tokio::test]
    async fn create_run_with_terminal_status_sets_completed_at() {
        let store = Store::open_in_memory().unwrap();
        let review = store.upsert_local_review("/tmp/repo", "sha1", None).await.unwrap();
        let mut run = new_run("r1", review.id);
        run.terminal_status = Some(RunStatus::Completed);
        let run = store.create_run(run).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.completed_at.is_some());
    }

    #[tokio::test]
    async fn update_run_status_is_noop_once_terminal() {
        let store = Store::open_in_memory().unwrap();
        let review = store.upsert_local_review("/tmp/repo", "sha1", None).await.unwrap();
        store.create_run(new_run("r1", review.id)).await.unwrap();
        store
            .update_run_status("r1", RunStatus::Completed, Some("done"), Some(3), Some(2))
            .await
            .unwrap();
        let after = store
            .update_run_status("r1", RunStatus::Failed, Some("should not apply"), None, None)
            .await
            .unwrap();
        assert_eq!(after.status, RunStatus::Completed);
        assert_eq!(after.summary.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn list_child_runs_orders_by_start_time() {
        let store = Store::open_in_memory().unwrap();
        let review = store.upsert_local_review("/tmp/repo", "sha1", None).await.unwrap();
        let mut parent = new_run("parent", review.id);
        parent.config_type = ConfigType::Council;
        store.create_run(parent).await.unwrap();
        let mut child = new_run("child1", review.id);
        child.parent_run_id = Some("parent");
        store.create_run(child).await.unwrap();
        let children = store.list_child_runs("parent").await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "child1");
    }
}
