//! Shared application state handed to every route.

use pr_local::LocalReviewManager;
use pr_orchestrator::Orchestrator;
use pr_progress::Bus;
use pr_store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub bus: Bus,
    pub orchestrator: Orchestrator,
    pub local: LocalReviewManager,
}

impl AppState {
    pub fn new(store: Store, bus: Bus, orchestrator: Orchestrator, local: LocalReviewManager) -> Self {
        Self { store, bus, orchestrator, local }
    }
}
