//! Error taxonomy shared by every layer: store, orchestrator, provider adapter, HTTP surface.

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("analysis already running for review {review_id} (run {existing_run_id})")]
    Conflict {
        review_id: i64,
        existing_run_id: String,
    },

    #[error("store error: {0}")]
    Storage(String),

    #[error("provider '{voice}' failed: {stderr_tail}")]
    ProviderFailed { voice: String, stderr_tail: String },

    #[error("run {run_id} cancelled")]
    Cancelled { run_id: String },

    #[error("operation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("external dependency failed: {0}")]
    External(String),
}

impl AppError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// HTTP status code this error maps to, shared by the axum `IntoResponse` impl
    /// in pr-http so no handler hand-rolls a status code.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Storage(_) => 500,
            Self::ProviderFailed { .. } => 500,
            Self::Cancelled { .. } => 409,
            Self::Timeout { .. } => 200, // staleness check surfaces {isStale:null,error}, not an HTTP failure
            Self::External(_) => 502,
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::InvalidInput(e.to_string())
    }
}
