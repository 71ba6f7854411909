//! Frame shapes and topic-naming helpers. Frames are plain JSON objects —
//! the bus itself is payload-agnostic — but these builders keep the field
//! names consistent with what subscribers are told to expect.

use serde_json::{Value, json};

pub fn run_topic(run_id: &str) -> String {
    format!("run-{run_id}")
}

pub fn review_topic(review_id: i64) -> String {
    format!("review-{review_id}")
}

/// First frame sent on every new subscription.
pub fn connected_frame() -> Value {
    json!({"type": "connected"})
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    FileStart,
    FileDone,
    LevelDone,
    Aggregation,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::FileStart => "file_start",
            Stage::FileDone => "file_done",
            Stage::LevelDone => "level_done",
            Stage::Aggregation => "aggregation",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl FrameStatus {
    fn as_str(self) -> &'static str {
        match self {
            FrameStatus::Running => "running",
            FrameStatus::Completed => "completed",
            FrameStatus::Failed => "failed",
            FrameStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, FrameStatus::Running)
    }
}

/// A run-keyed progress or terminal frame.
#[allow(clippy::too_many_arguments)]
pub fn progress_frame(
    run_id: &str,
    level: Option<i64>,
    voice_id: Option<&str>,
    file: Option<&str>,
    stage: Stage,
    status: FrameStatus,
    percent: Option<u8>,
) -> Value {
    json!({
        "type": "progress",
        "runId": run_id,
        "level": level,
        "voiceId": voice_id,
        "file": file,
        "stage": stage.as_str(),
        "status": status.as_str(),
        "percent": percent,
    })
}

/// A review-keyed terminal summary, published once a run (or council)
/// finishes.
pub fn run_summary_frame(run_id: &str, status: FrameStatus, total_suggestions: i64) -> Value {
    json!({
        "type": "run_summary",
        "runId": run_id,
        "status": status.as_str(),
        "totalSuggestions": total_suggestions,
    })
}

/// A review-keyed frame for a result ingested from outside the orchestrator.
pub fn external_ingestion_frame(run_id: &str, total_suggestions: i64) -> Value {
    json!({
        "type": "run_summary",
        "runId": run_id,
        "source": "external",
        "status": "completed",
        "totalSuggestions": total_suggestions,
    })
}
