//! Shared data-model types: the vocabulary every other crate in the workspace builds on.

use serde::{Deserialize, Serialize};

/// Discriminates a review's origin: a remote pull request or a local working tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewType {
    Pr,
    Local,
}

impl ReviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pr => "pr",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for ReviewType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Review lifecycle status (distinct from an analysis run's status).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Draft,
    Pending,
    Submitted,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Submitted => "submitted",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Analysis run status. `Running` is the only non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("invalid run status '{other}'")),
        }
    }
}

/// Shape of the voice plan that produced a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    Single,
    Advanced,
    Council,
}

impl ConfigType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Advanced => "advanced",
            Self::Council => "council",
        }
    }
}

impl std::fmt::Display for ConfigType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who authored a comment row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentSource {
    User,
    Ai,
}

impl CommentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }
}

impl std::fmt::Display for CommentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comment lifecycle status, shared by user comments and AI suggestions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Active,
    Dismissed,
    Adopted,
    Submitted,
    Draft,
    Inactive,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Dismissed => "dismissed",
            Self::Adopted => "adopted",
            Self::Submitted => "submitted",
            Self::Draft => "draft",
            Self::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which side of a unified diff a line-level comment anchors to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "LEFT")]
    Left,
    #[serde(rename = "RIGHT")]
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }

    /// Maps the external ingestion field `old_or_new`:
    /// `'OLD'` -> `LEFT`; `'NEW'` or absent -> `RIGHT`.
    pub fn from_old_or_new(old_or_new: Option<&str>) -> Self {
        match old_or_new {
            Some("OLD") => Self::Left,
            _ => Self::Right,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider pricing/quality tier. `premium` and `free` are accepted aliases on input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Fast,
    Balanced,
    Thorough,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Thorough => "thorough",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" | "free" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "thorough" | "premium" => Ok(Self::Thorough),
            other => Err(format!("invalid tier '{other}'")),
        }
    }
}

/// One `(provider, model, tier)` combination participating in an analysis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub provider: String,
    pub model: String,
    pub tier: Option<Tier>,
    #[serde(default)]
    pub custom_instructions: Option<String>,
}

/// One level in a voice plan; council levels may carry more than one voice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub level: u32,
    pub enabled: bool,
    pub voices: Vec<Voice>,
}

/// A fully resolved voice plan, independent of how it was configured.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoicePlan {
    pub config_type: ConfigType,
    pub levels: Vec<Level>,
}

/// The root of an analysis unit: one PR, or one local working-tree session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub review_type: ReviewType,
    pub repository: Option<String>,
    pub pr_number: Option<i64>,
    pub local_path: Option<String>,
    pub local_head_sha: Option<String>,
    pub status: ReviewStatus,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub custom_instructions: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One invocation of the orchestrator; one row in the runs table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub id: String,
    pub review_id: i64,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub tier: Option<Tier>,
    pub status: RunStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub summary: Option<String>,
    pub total_suggestions: i64,
    pub files_analyzed: i64,
    pub head_sha: String,
    pub custom_instructions: Option<String>,
    pub repo_instructions: Option<String>,
    pub request_instructions: Option<String>,
    pub parent_run_id: Option<String>,
    pub config_type: ConfigType,
    pub levels_config: serde_json::Value,
}

/// A user-authored comment or an AI-sourced suggestion; unified table, discriminated by `source`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub review_id: i64,
    pub source: CommentSource,
    pub author: String,
    pub ai_run_id: Option<String>,
    pub ai_level: Option<i64>,
    pub ai_confidence: Option<f64>,
    pub reasoning: Option<String>,
    pub file: String,
    pub line_start: Option<i64>,
    pub line_end: Option<i64>,
    pub side: Side,
    pub diff_position: Option<i64>,
    pub is_file_level: bool,
    pub comment_type: String,
    pub title: String,
    pub body: String,
    pub commit_sha: Option<String>,
    pub status: CommentStatus,
    pub parent_id: Option<i64>,
    pub adopted_as_id: Option<i64>,
    pub voice_id: Option<String>,
    pub is_raw: bool,
}

/// Cached working-tree diff for a local review.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalDiffSnapshot {
    pub review_id: i64,
    pub diff_text: String,
    pub stats: DiffStats,
    pub digest: String,
    pub captured_at: chrono::DateTime<chrono::Utc>,
}

/// Counts of tracked/untracked/staged/unstaged changes in a working tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub tracked_changes: u32,
    pub untracked_files: u32,
    pub staged_changes: u32,
    pub unstaged_changes: u32,
}

/// A named, reusable voice plan.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Council {
    pub id: String,
    pub name: String,
    pub council_type: ConfigType,
    pub config: serde_json::Value,
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A user-pinned line range from a non-diff file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContextFile {
    pub id: i64,
    pub review_id: i64,
    pub file: String,
    pub line_start: i64,
    pub line_end: i64,
    pub label: Option<String>,
}

/// A chat session attached to a comment (used by the machine protocol's conversational tools).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: i64,
    pub comment_id: i64,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One message in a chat session, ordered by `id` ascending within the session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: i64,
    pub role: String,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
