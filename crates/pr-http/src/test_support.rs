//! Test-only wiring shared by this crate's route tests: an in-memory store,
//! a fresh bus, and an orchestrator backed by a `/bin/sh` "provider" so a
//! full analyze round-trip runs without a real AI backend.

#![cfg(test)]

use crate::state::AppState;
use pr_config::{Config, ProviderOverride, ProviderRegistry};
use pr_core::recipe::BasicRecipe;
use pr_local::LocalReviewManager;
use pr_progress::Bus;
use pr_orchestrator::Orchestrator;
use pr_store::Store;
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

/// A throwaway git repo with one commit and one uncommitted change, so
/// `LocalReviewManager::start` has both a HEAD and a non-empty diff to capture.
pub fn fixture_repo() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let git = |args: &[&str]| {
        let status = Command::new("git").args(args).current_dir(root).status().unwrap();
        assert!(status.success(), "git {args:?} failed");
    };
    git(&["init", "-q"]);
    git(&["config", "user.email", "test@example.com"]);
    git(&["config", "user.name", "test"]);
    std::fs::write(root.join("a.rs"), "fn main() {}\n").unwrap();
    git(&["add", "a.rs"]);
    git(&["commit", "-q", "-m", "initial"]);
    std::fs::write(root.join("a.rs"), "fn main() {\n    println!(\"hi\");\n}\n").unwrap();
    dir
}

pub fn one_suggestion_script(file: &str) -> String {
    format!(
        r#"cat <<'EOF'
{{"kind":"file_start","file":"{file}"}}
{{"kind":"suggestion","file":"{file}","line":1,"type":"bug","title":"t","description":"d","confidence":0.5}}
{{"kind":"file_end"}}
EOF"#
    )
}

pub fn test_state(provider: &str, script: &str) -> AppState {
    let mut config = Config::default();
    config.providers.insert(
        provider.into(),
        ProviderOverride {
            command: Some("/bin/sh".into()),
            extra_args: vec!["-c".into(), script.into()],
            ..Default::default()
        },
    );
    let registry = Arc::new(ProviderRegistry::from_config(&config));
    let store = Store::open_in_memory().unwrap();
    let bus = Bus::new();
    let orchestrator = Orchestrator::new(store.clone(), bus.clone(), registry, Arc::new(BasicRecipe)).with_fan_out_cap(2);
    let local = LocalReviewManager::new(store.clone());
    AppState::new(store, bus, orchestrator, local)
}
