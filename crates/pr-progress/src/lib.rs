//! In-process progress fan-out: run-keyed and review-keyed topics over
//! `tokio::sync::broadcast`, with a retained last-terminal frame per topic
//! so a subscriber that connects after the fact still sees how the run
//! ended.

mod bus;
mod frame;

pub use bus::{Bus, Subscription};
pub use frame::{FrameStatus, Stage, connected_frame, external_ingestion_frame, progress_frame, review_topic, run_summary_frame, run_topic};
