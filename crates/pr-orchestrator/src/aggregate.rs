//! Council aggregation: after every voice child has finished,
//! collapse the raw (`is_raw = 1`) suggestions from all of them into one
//! deduplicated, confidence-ranked final set.

use pr_core::model::Comment;
use pr_provider::RawSuggestion;
use std::collections::HashMap;

/// Suggestions anchored to the same file and (approximately) the same line
/// range are treated as the same finding; the one with the highest
/// confidence (ties broken by whichever was seen first) becomes the
/// representative. The result is sorted by confidence descending, with
/// suggestions carrying no confidence sorted last.
pub fn deduplicate(raw: Vec<Comment>) -> Vec<RawSuggestion> {
    let mut by_key: HashMap<(String, Option<i64>, Option<i64>, String), Comment> = HashMap::new();

    for comment in raw {
        let key = (
            comment.file.clone(),
            comment.line_start,
            comment.line_end,
            comment.comment_type.clone(),
        );
        match by_key.get(&key) {
            Some(existing) if existing.ai_confidence.unwrap_or(0.0) >= comment.ai_confidence.unwrap_or(0.0) => {}
            _ => {
                by_key.insert(key, comment);
            }
        }
    }

    let mut ranked: Vec<Comment> = by_key.into_values().collect();
    ranked.sort_by(|a, b| {
        b.ai_confidence
            .unwrap_or(-1.0)
            .partial_cmp(&a.ai_confidence.unwrap_or(-1.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    ranked
        .into_iter()
        .map(|c| RawSuggestion {
            file: c.file,
            line_start: c.line_start,
            line_end: c.line_end,
            side: c.side,
            is_file_level: c.is_file_level,
            comment_type: c.comment_type,
            title: c.title,
            body: c.body,
            confidence: c.ai_confidence,
            reasoning: c.reasoning,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pr_core::model::{CommentSource, CommentStatus, Side};

    fn comment(file: &str, line: i64, confidence: Option<f64>) -> Comment {
        Comment {
            id: 0,
            review_id: 1,
            source: CommentSource::Ai,
            author: "ai".into(),
            ai_run_id: Some("child".into()),
            ai_level: Some(1),
            ai_confidence: confidence,
            reasoning: None,
            file: file.into(),
            line_start: Some(line),
            line_end: Some(line),
            side: Side::Right,
            diff_position: None,
            is_file_level: false,
            comment_type: "bug".into(),
            title: "t".into(),
            body: "d".into(),
            commit_sha: None,
            status: CommentStatus::Active,
            parent_id: None,
            adopted_as_id: None,
            voice_id: Some("codex:gpt-5".into()),
            is_raw: true,
        }
    }

    #[test]
    fn duplicate_findings_collapse_to_highest_confidence() {
        let a = comment("a.rs", 10, Some(0.4));
        let b = comment("a.rs", 10, Some(0.9));
        let deduped = deduplicate(vec![a, b]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].confidence, Some(0.9));
    }

    #[test]
    fn distinct_files_are_kept_separate() {
        let a = comment("a.rs", 10, Some(0.4));
        let b = comment("b.rs", 10, Some(0.4));
        assert_eq!(deduplicate(vec![a, b]).len(), 2);
    }

    #[test]
    fn ranked_output_sorts_by_confidence_descending() {
        let low = comment("a.rs", 1, Some(0.1));
        let high = comment("b.rs", 1, Some(0.9));
        let deduped = deduplicate(vec![low, high]);
        assert_eq!(deduped[0].file, "b.rs");
        assert_eq!(deduped[1].file, "a.rs");
    }
}
