//! Content digest over a diff snapshot, used for staleness comparison.
//! `sha2::Sha256` over the diff text concatenated with a canonical
//! (sorted-key) rendering of the stats — this codebase's one hashing
//! idiom, reused here for diff+stats identity instead of whatever it
//! originally hashed.

use pr_core::model::DiffStats;
use sha2::{Digest, Sha256};

pub fn compute(diff_text: &str, stats: DiffStats) -> String {
    let mut hasher = Sha256::new();
    hasher.update(diff_text.as_bytes());
    hasher.update(
        format!(
            "staged_changes={}\ntracked_changes={}\nuntracked_files={}\nunstaged_changes={}\n",
            stats.staged_changes, stats.tracked_changes, stats.untracked_files, stats.unstaged_changes,
        )
        .as_bytes(),
    );
    data_encoding::HEXLOWER.encode(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_hashes_identically() {
        let stats = DiffStats { tracked_changes: 1, untracked_files: 0, staged_changes: 1, unstaged_changes: 0 };
        assert_eq!(compute("diff", stats), compute("diff", stats));
    }

    #[test]
    fn different_diff_text_changes_digest() {
        let stats = DiffStats::default();
        assert_ne!(compute("diff a", stats), compute("diff b", stats));
    }

    #[test]
    fn different_stats_changes_digest_even_with_same_text() {
        let a = DiffStats { tracked_changes: 1, ..Default::default() };
        let b = DiffStats { tracked_changes: 2, ..Default::default() };
        assert_ne!(compute("diff", a), compute("diff", b));
    }
}
