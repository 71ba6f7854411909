//! Local-review session management: discovers the git repo behind a
//! filesystem path, captures its working-tree diff, and tracks staleness
//! against the captured HEAD so a client can be prompted to rebind when the
//! underlying repo moves on.

mod digest;
mod git;
mod manager;

pub use manager::{LocalReviewManager, RefreshOutcome, StartOutcome, Staleness};
