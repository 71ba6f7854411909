//! Single-voice execution: builds the command, composes the prompt, streams
//! the provider's output (publishing a progress frame per file boundary),
//! and returns its raw suggestions or the reason it didn't finish.
//!
//! Every field here is owned (not borrowed) so a request can be handed to
//! `tokio::spawn` — a level's voices run as real concurrent tasks, not just
//! interleaved futures on one task.

use crate::voice::{build_command, voice_id};
use pr_config::ProviderRegistry;
use pr_core::AppError;
use pr_core::model::Voice;
use pr_core::recipe::{PromptRecipe, RecipeInput};
use pr_progress::{Bus, FrameStatus, Stage, progress_frame, run_topic};
use pr_provider::{ExitOutcome, RawSuggestion, SpawnOptions, SuggestionEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

pub struct VoiceOutcome {
    pub voice_id: String,
    pub suggestions: Vec<RawSuggestion>,
}

/// Everything `run_voice` needs, owned so the call can be spawned.
pub struct VoiceRequest {
    pub registry: Arc<ProviderRegistry>,
    pub recipe: Arc<dyn PromptRecipe>,
    pub voice: Voice,
    pub repo_root: PathBuf,
    pub diff_text: Arc<str>,
    pub custom_instructions: Option<Arc<str>>,
    pub repo_instructions: Option<Arc<str>>,
    pub request_instructions: Option<Arc<str>>,
    pub prior_levels_digest: Option<String>,
    pub yolo: bool,
    pub spawn_options: SpawnOptions,
    pub run_id: String,
    pub level: u32,
}

/// Runs one voice to completion, racing its event stream against the
/// shared per-run cancel signal. A flipped cancel signal triggers
/// `ProviderHandle::cancel` and surfaces as `AppError::Cancelled`.
pub async fn run_voice(req: VoiceRequest, bus: Bus, mut cancel_rx: watch::Receiver<bool>) -> Result<VoiceOutcome, AppError> {
    let cmd = build_command(&req.registry, &req.voice, &req.repo_root, req.yolo)?;
    let prompt = req.recipe.compose(&RecipeInput {
        voice: &req.voice,
        diff_text: &req.diff_text,
        custom_instructions: req.custom_instructions.as_deref(),
        repo_instructions: req.repo_instructions.as_deref(),
        request_instructions: req.request_instructions.as_deref(),
        prior_levels_digest: req.prior_levels_digest.as_deref(),
    });

    let mut handle = pr_provider::spawn(cmd, prompt, req.spawn_options)
        .await
        .map_err(|e| AppError::External(e.to_string()))?;

    let voice_label = voice_id(&req.voice);
    let topic = run_topic(&req.run_id);
    let mut suggestions = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel_rx.changed() => {
                if *cancel_rx.borrow() {
                    handle.cancel();
                    let _ = handle.exit().await;
                    return Err(AppError::Cancelled { run_id: req.run_id });
                }
            }
            event = handle.next_event() => {
                match event {
                    Some(SuggestionEvent::Suggestion(s)) => suggestions.push(s),
                    Some(SuggestionEvent::FileStart { file }) => {
                        let frame = progress_frame(
                            &req.run_id, Some(req.level as i64), Some(&voice_label), Some(&file),
                            Stage::FileStart, FrameStatus::Running, None,
                        );
                        bus.publish(&topic, frame, false).await;
                    }
                    Some(SuggestionEvent::FileEnd) => {
                        let frame = progress_frame(
                            &req.run_id, Some(req.level as i64), Some(&voice_label), None,
                            Stage::FileDone, FrameStatus::Running, None,
                        );
                        bus.publish(&topic, frame, false).await;
                    }
                    Some(SuggestionEvent::Summary { .. }) => {}
                    None => break,
                }
            }
        }
    }

    match handle.exit().await.map_err(|e| AppError::External(e.to_string()))? {
        ExitOutcome::Completed => Ok(VoiceOutcome { voice_id: voice_label, suggestions }),
        ExitOutcome::Failed { stderr_tail } => Err(AppError::ProviderFailed { voice: voice_label, stderr_tail }),
        ExitOutcome::Cancelled => Err(AppError::Cancelled { run_id: req.run_id }),
    }
}
