use std::time::{Duration, Instant};
use tracing::debug;

pub(super) const DEFAULT_HEARTBEAT_SECS: u64 = 20;
pub(super) const HEARTBEAT_INTERVAL_ENV: &str = "PAIR_REVIEW_PROVIDER_HEARTBEAT_SECS";

pub(super) fn resolve_heartbeat_interval() -> Option<Duration> {
    let raw = std::env::var(HEARTBEAT_INTERVAL_ENV).ok();
    let secs = match raw {
        Some(value) => match value.trim().parse::<u64>() {
            Ok(0) => return None,
            Ok(parsed) => parsed,
            Err(_) => DEFAULT_HEARTBEAT_SECS,
        },
        None => DEFAULT_HEARTBEAT_SECS,
    };
    Some(Duration::from_secs(secs))
}

pub(super) fn maybe_emit_heartbeat(
    heartbeat_interval: Option<Duration>,
    execution_start: Instant,
    last_activity: Instant,
    last_heartbeat: &mut Instant,
    idle_timeout: Duration,
) {
    let Some(interval) = heartbeat_interval else {
        return;
    };

    let now = Instant::now();
    let idle_for = now.saturating_duration_since(last_activity);
    if idle_for < interval {
        return;
    }
    if now.saturating_duration_since(*last_heartbeat) < interval {
        return;
    }

    let elapsed = now.saturating_duration_since(execution_start);
    debug!(
        elapsed_secs = elapsed.as_secs(),
        idle_secs = idle_for.as_secs(),
        idle_timeout_secs = idle_timeout.as_secs(),
        "provider still running"
    );
    *last_heartbeat = now;
}
