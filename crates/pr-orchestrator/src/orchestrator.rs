//! The orchestrator proper: resolves a voice plan against the
//! provider registry, runs it level by level — council child runs tracked
//! individually, single/advanced runs as one atomic unit — and persists
//! suggestions and run status as each stage completes.

use crate::coordinator::RunCoordinator;
use crate::run::{VoiceRequest, run_voice};
use crate::voice::voice_id;
use pr_config::ProviderRegistry;
use pr_core::AppError;
use pr_core::ids::new_run_id;
use pr_core::model::{AnalysisRun, ConfigType, Level, RunStatus, VoicePlan};
use pr_core::recipe::PromptRecipe;
use pr_progress::{Bus, FrameStatus, Stage, progress_frame, review_topic, run_summary_frame, run_topic};
use pr_provider::{RawSuggestion, SpawnOptions};
use pr_store::{NewRun, Store};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Semaphore, watch};
use tracing::warn;

pub const DEFAULT_FAN_OUT_CAP: usize = 4;

/// Inputs to start one analysis invocation. `plan` is already fully
/// resolved — council membership, per-level voices, everything — the
/// orchestrator itself makes no provider/model choices.
pub struct StartAnalysis {
    pub review_id: i64,
    pub head_sha: String,
    pub repo_root: PathBuf,
    pub diff_text: String,
    pub plan: VoicePlan,
    pub custom_instructions: Option<String>,
    pub repo_instructions: Option<String>,
    pub request_instructions: Option<String>,
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Store,
    bus: Bus,
    registry: Arc<ProviderRegistry>,
    recipe: Arc<dyn PromptRecipe>,
    coordinator: Arc<RunCoordinator>,
    fan_out_cap: usize,
    yolo: bool,
    spawn_options: SpawnOptions,
}

impl Orchestrator {
    pub fn new(store: Store, bus: Bus, registry: Arc<ProviderRegistry>, recipe: Arc<dyn PromptRecipe>) -> Self {
        Self {
            store,
            bus,
            registry,
            recipe,
            coordinator: Arc::new(RunCoordinator::new()),
            fan_out_cap: DEFAULT_FAN_OUT_CAP,
            yolo: false,
            spawn_options: SpawnOptions::default(),
        }
    }

    pub fn with_fan_out_cap(mut self, cap: usize) -> Self {
        self.fan_out_cap = cap.max(1);
        self
    }

    pub fn with_yolo(mut self, yolo: bool) -> Self {
        self.yolo = yolo;
        self
    }

    pub fn with_spawn_options(mut self, options: SpawnOptions) -> Self {
        self.spawn_options = options;
        self
    }

    /// The run id currently executing for this review, if any.
    pub async fn running_run_id(&self, review_id: i64) -> Option<String> {
        self.coordinator.running_run_id(review_id).await
    }

    /// Request cancellation of a run. Returns `false` if it isn't
    /// currently registered as running.
    pub async fn cancel(&self, run_id: &str) -> bool {
        self.coordinator.cancel(run_id).await
    }

    /// Claims the review, creates the run row, and starts execution on a
    /// detached task. Returns as soon as the row exists — callers track
    /// progress via the progress bus or by polling the run's status.
    pub async fn start_analysis(&self, req: StartAnalysis) -> Result<AnalysisRun, AppError> {
        let enabled_levels: Vec<Level> = req.plan.levels.iter().filter(|l| l.enabled).cloned().collect();
        let total_voices: usize = enabled_levels.iter().map(|l| l.voices.len()).sum();
        if total_voices == 0 {
            return Err(AppError::InvalidInput("voice plan has no enabled voices".into()));
        }

        let run_id = new_run_id();
        let single_voice = (total_voices == 1).then(|| enabled_levels[0].voices[0].clone());

        let new_run = NewRun {
            id: &run_id,
            review_id: req.review_id,
            provider: single_voice.as_ref().map(|v| v.provider.as_str()),
            model: single_voice.as_ref().map(|v| v.model.as_str()),
            tier: single_voice.as_ref().and_then(|v| v.tier),
            head_sha: &req.head_sha,
            custom_instructions: req.custom_instructions.as_deref(),
            repo_instructions: req.repo_instructions.as_deref(),
            request_instructions: req.request_instructions.as_deref(),
            parent_run_id: None,
            config_type: req.plan.config_type,
            levels_config: serde_json::to_value(&req.plan).unwrap_or_else(|_| serde_json::json!({})),
            terminal_status: None,
        };

        let cancel_rx = self.coordinator.try_start(req.review_id, &run_id).await?;
        let run = match self.store.create_run(new_run).await {
            Ok(run) => run,
            Err(e) => {
                self.coordinator.finish(req.review_id, &run_id).await;
                return Err(e);
            }
        };

        let orchestrator = self.clone();
        let run_for_task = run.clone();
        tokio::spawn(async move {
            orchestrator.execute(run_for_task, enabled_levels, req, cancel_rx).await;
        });

        Ok(run)
    }

    async fn execute(&self, run: AnalysisRun, levels: Vec<Level>, req: StartAnalysis, cancel_rx: watch::Receiver<bool>) {
        let outcome = self.run_levels(&run, &levels, &req, cancel_rx).await;

        let (status, summary, total, files) = match &outcome {
            Ok((total, files)) => (RunStatus::Completed, None, Some(*total), Some(*files)),
            Err(AppError::Cancelled { .. }) => (RunStatus::Cancelled, None, None, None),
            Err(e) => (RunStatus::Failed, Some(e.to_string()), None, None),
        };

        if let Err(e) = self.store.update_run_status(&run.id, status, summary.as_deref(), total, files).await {
            warn!(run_id = %run.id, error = %e, "failed to persist terminal run status");
        }

        let frame_status = match status {
            RunStatus::Completed => FrameStatus::Completed,
            RunStatus::Cancelled => FrameStatus::Cancelled,
            RunStatus::Failed => FrameStatus::Failed,
            RunStatus::Running => FrameStatus::Running,
        };
        let total_suggestions = total.unwrap_or(0);
        self.bus
            .publish(&run_topic(&run.id), run_summary_frame(&run.id, frame_status, total_suggestions), true)
            .await;
        self.bus
            .publish(&review_topic(run.review_id), run_summary_frame(&run.id, frame_status, total_suggestions), true)
            .await;

        self.coordinator.finish(run.review_id, &run.id).await;
    }

    /// Runs every enabled level in ascending order, persisting suggestions
    /// as each level finishes, then aggregates council results. Returns
    /// `(total_suggestions, files_analyzed)` on success.
    async fn run_levels(
        &self,
        run: &AnalysisRun,
        levels: &[Level],
        req: &StartAnalysis,
        cancel_rx: watch::Receiver<bool>,
    ) -> Result<(i64, i64), AppError> {
        let is_council = req.plan.config_type == ConfigType::Council;
        let diff_text: Arc<str> = Arc::from(req.diff_text.as_str());
        let mut total_suggestions: i64 = 0;
        let mut files_analyzed: HashSet<String> = HashSet::new();
        let mut prior_digest: Option<String> = None;

        for level in levels {
            if *cancel_rx.borrow() {
                return Err(AppError::Cancelled { run_id: run.id.clone() });
            }

            let mut targets = Vec::with_capacity(level.voices.len());
            for voice in &level.voices {
                let target_run_id = if is_council {
                    let child_id = new_run_id();
                    let child = self
                        .store
                        .create_run(NewRun {
                            id: &child_id,
                            review_id: run.review_id,
                            provider: Some(&voice.provider),
                            model: Some(&voice.model),
                            tier: voice.tier,
                            head_sha: &run.head_sha,
                            custom_instructions: req.custom_instructions.as_deref(),
                            repo_instructions: req.repo_instructions.as_deref(),
                            request_instructions: req.request_instructions.as_deref(),
                            parent_run_id: Some(&run.id),
                            config_type: ConfigType::Council,
                            levels_config: serde_json::json!({"level": level.level, "voice": voice_id(voice)}),
                            terminal_status: None,
                        })
                        .await?;
                    child.id
                } else {
                    run.id.clone()
                };
                targets.push((voice.clone(), target_run_id));
            }

            let semaphore = Arc::new(Semaphore::new(self.fan_out_cap));
            let mut set = tokio::task::JoinSet::new();
            for (voice, target_run_id) in targets {
                let permit_sem = semaphore.clone();
                let vreq = VoiceRequest {
                    registry: self.registry.clone(),
                    recipe: self.recipe.clone(),
                    voice,
                    repo_root: req.repo_root.clone(),
                    diff_text: diff_text.clone(),
                    custom_instructions: req.custom_instructions.as_deref().map(Arc::from),
                    repo_instructions: req.repo_instructions.as_deref().map(Arc::from),
                    request_instructions: req.request_instructions.as_deref().map(Arc::from),
                    prior_levels_digest: prior_digest.clone(),
                    yolo: self.yolo,
                    spawn_options: self.spawn_options,
                    run_id: run.id.clone(),
                    level: level.level,
                };
                let bus = self.bus.clone();
                let cancel_rx = cancel_rx.clone();
                set.spawn(async move {
                    let _permit = permit_sem.acquire_owned().await.expect("semaphore never closed");
                    (target_run_id, run_voice(vreq, bus, cancel_rx).await)
                });
            }

            let mut level_results: Vec<(String, String, Result<Vec<RawSuggestion>, AppError>)> = Vec::new();
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((target_run_id, Ok(outcome))) => {
                        level_results.push((target_run_id, outcome.voice_id, Ok(outcome.suggestions)));
                    }
                    Ok((target_run_id, Err(e))) => {
                        level_results.push((target_run_id, String::new(), Err(e)));
                    }
                    Err(join_err) => {
                        level_results.push((
                            String::new(),
                            String::new(),
                            Err(AppError::External(format!("voice task panicked: {join_err}"))),
                        ));
                    }
                }
            }

            let mut level_titles = Vec::new();
            let mut hard_failure: Option<AppError> = None;

            for (target_run_id, voice_label, result) in level_results {
                match result {
                    Ok(suggestions) => {
                        for s in &suggestions {
                            files_analyzed.insert(s.file.clone());
                            level_titles.push(s.title.clone());
                        }
                        if !suggestions.is_empty() {
                            self.store
                                .bulk_insert_suggestions(
                                    run.review_id,
                                    &target_run_id,
                                    Some(level.level as i64),
                                    Some(&voice_label),
                                    &suggestions,
                                    true,
                                )
                                .await?;
                        }
                        total_suggestions += suggestions.len() as i64;
                        if is_council {
                            self.store
                                .update_run_status(&target_run_id, RunStatus::Completed, None, Some(suggestions.len() as i64), None)
                                .await?;
                        }
                    }
                    Err(e) => {
                        if is_council && !matches!(e, AppError::Cancelled { .. }) {
                            warn!(run_id = %target_run_id, error = %e, "council voice failed; continuing with remaining voices");
                            self.store.update_run_status(&target_run_id, RunStatus::Failed, Some(&e.to_string()), None, None).await?;
                        } else {
                            hard_failure.get_or_insert(e);
                        }
                    }
                }
            }

            if let Some(err) = hard_failure {
                return Err(err);
            }

            prior_digest = Some(format!("Level {}: {} suggestions ({})", level.level, level_titles.len(), level_titles.join("; ")));

            self.bus
                .publish(
                    &run_topic(&run.id),
                    progress_frame(&run.id, Some(level.level as i64), None, None, Stage::LevelDone, FrameStatus::Running, None),
                    false,
                )
                .await;
        }

        if is_council {
            if *cancel_rx.borrow() {
                return Err(AppError::Cancelled { run_id: run.id.clone() });
            }
            let child_ids: HashSet<String> =
                self.store.list_child_runs(&run.id).await?.into_iter().map(|r| r.id).collect();
            let raw: Vec<_> = self
                .store
                .list_comments(run.review_id, true)
                .await?
                .into_iter()
                .filter(|c| c.is_raw && c.ai_run_id.as_ref().is_some_and(|id| child_ids.contains(id)))
                .collect();
            let final_set = crate::aggregate::deduplicate(raw);
            if !final_set.is_empty() {
                self.store.bulk_insert_suggestions(run.review_id, &run.id, None, None, &final_set, false).await?;
                total_suggestions += final_set.len() as i64;
            }
            self.bus
                .publish(
                    &run_topic(&run.id),
                    progress_frame(&run.id, None, None, None, Stage::Aggregation, FrameStatus::Running, None),
                    false,
                )
                .await;
        }

        Ok((total_suggestions, files_analyzed.len() as i64))
    }
}
