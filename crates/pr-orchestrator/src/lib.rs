//! Runs a voice plan against the provider registry: level-by-level
//! execution, per-voice cancellation and failure isolation, and council
//! aggregation. The HTTP and machine-protocol surfaces are the only
//! callers — this crate owns no transport of its own.

mod aggregate;
mod coordinator;
mod orchestrator;
mod run;
mod voice;

pub use aggregate::deduplicate;
pub use coordinator::RunCoordinator;
pub use orchestrator::{DEFAULT_FAN_OUT_CAP, Orchestrator, StartAnalysis};
pub use run::{VoiceOutcome, VoiceRequest, run_voice};
pub use voice::{build_command, voice_id};
