//! Re-entrancy and cancellation registries. Two small in-memory
//! maps, each guarded by its own short-lived mutex lock the same way every
//! other shared map in this codebase is guarded — the lock is held only for
//! the duration of a single check-and-insert or lookup, never across an
//! `.await` that waits on a subprocess or the store.

use pr_core::AppError;
use std::collections::HashMap;
use tokio::sync::{Mutex, watch};

/// Tracks, per review, which run id (if any) is currently executing, and per
/// run, the cancel signal that reaches every live voice task for that run.
pub struct RunCoordinator {
    active_by_review: Mutex<HashMap<i64, String>>,
    cancel_by_run: Mutex<HashMap<String, watch::Sender<bool>>>,
}

impl RunCoordinator {
    pub fn new() -> Self {
        Self {
            active_by_review: Mutex::new(HashMap::new()),
            cancel_by_run: Mutex::new(HashMap::new()),
        }
    }

    /// Claim `run_id` as the running run for `review_id`. Fails with
    /// `AppError::Conflict` if another run is already registered for this
    /// review — the re-entrancy check a would-be second `start_analysis`
    /// call must pass before it writes anything to the store.
    pub async fn try_start(&self, review_id: i64, run_id: &str) -> Result<watch::Receiver<bool>, AppError> {
        let mut active = self.active_by_review.lock().await;
        if let Some(existing) = active.get(&review_id) {
            return Err(AppError::Conflict {
                review_id,
                existing_run_id: existing.clone(),
            });
        }
        active.insert(review_id, run_id.to_string());
        drop(active);

        let (tx, rx) = watch::channel(false);
        self.cancel_by_run.lock().await.insert(run_id.to_string(), tx);
        Ok(rx)
    }

    /// Request cancellation of `run_id`. Returns `false` if the run isn't
    /// registered (already finished, or never started).
    pub async fn cancel(&self, run_id: &str) -> bool {
        match self.cancel_by_run.lock().await.get(run_id) {
            Some(tx) => {
                let _ = tx.send(true);
                true
            }
            None => false,
        }
    }

    /// Release both registry entries once a run reaches a terminal status.
    pub async fn finish(&self, review_id: i64, run_id: &str) {
        self.active_by_review.lock().await.remove(&review_id);
        self.cancel_by_run.lock().await.remove(run_id);
    }

    pub async fn running_run_id(&self, review_id: i64) -> Option<String> {
        self.active_by_review.lock().await.get(&review_id).cloned()
    }
}

impl Default for RunCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
