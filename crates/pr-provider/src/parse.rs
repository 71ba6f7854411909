//! Boundary-marker-tolerant streaming JSON parser for provider stdout.
//!
//! Providers are free to emit line-delimited JSON, JSON objects separated by
//! blank lines, or a single JSON array at the end of the stream. This parser
//! tolerates all three: it scans the accumulated buffer for balanced
//! top-level `{...}` or `[...]` spans (respecting string escaping), and for
//! each complete span found, either emits one event (object) or flattens an
//! array into one event per element.

use pr_core::model::Side;
use serde::Deserialize;
use tracing::warn;

/// A single event produced by a provider's stdout stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionEvent {
    FileStart { file: String },
    Suggestion(RawSuggestion),
    FileEnd,
    Summary { text: String },
}

/// Suggestion fields as emitted by a provider, before being persisted as a
/// `Comment` (which additionally carries review/run identifiers assigned by
/// the store).
#[derive(Debug, Clone, PartialEq)]
pub struct RawSuggestion {
    pub file: String,
    pub line_start: Option<i64>,
    pub line_end: Option<i64>,
    pub side: Side,
    pub is_file_level: bool,
    pub comment_type: String,
    pub title: String,
    pub body: String,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    kind: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    line: Option<i64>,
    #[serde(default)]
    line_start: Option<i64>,
    #[serde(default)]
    line_end: Option<i64>,
    #[serde(default)]
    old_or_new: Option<String>,
    #[serde(default, rename = "type")]
    comment_type: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Incremental scanner: fed raw byte chunks, yields complete `SuggestionEvent`s
/// as soon as their JSON span closes. Malformed spans are skipped with a
/// logged warning; the stream continues.
pub struct BoundaryParser {
    buf: String,
}

impl BoundaryParser {
    pub fn new() -> Self {
        Self { buf: String::new() }
    }

    /// Feed a chunk of stdout bytes, returning any events that became complete.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SuggestionEvent> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));
        self.drain_complete_values()
    }

    /// Called once at EOF: any trailing whitespace-only buffer is discarded;
    /// a genuinely incomplete trailing span is dropped (with a warning), since
    /// there is no more input to complete it.
    pub fn finish(mut self) -> Vec<SuggestionEvent> {
        let events = self.drain_complete_values();
        if !self.buf.trim().is_empty() {
            warn!(remainder = %self.buf.trim(), "discarding incomplete trailing provider output");
        }
        events
    }

    fn drain_complete_values(&mut self) -> Vec<SuggestionEvent> {
        let mut events = Vec::new();
        loop {
            let trimmed_start = self
                .buf
                .char_indices()
                .find(|(_, c)| !c.is_whitespace())
                .map(|(i, _)| i);
            let Some(start) = trimmed_start else {
                self.buf.clear();
                break;
            };
            let Some(end) = find_balanced_span_end(&self.buf[start..]) else {
                break;
            };
            let span_end = start + end;
            let span = self.buf[start..span_end].to_string();
            self.buf.drain(..span_end);

            match serde_json::from_str::<serde_json::Value>(&span) {
                Ok(serde_json::Value::Array(items)) => {
                    for item in items {
                        if let Some(event) = value_to_event(item) {
                            events.push(event);
                        }
                    }
                }
                Ok(value) => {
                    if let Some(event) = value_to_event(value) {
                        events.push(event);
                    }
                }
                Err(e) => {
                    warn!(error = %e, span = %span, "skipping malformed provider JSON chunk");
                }
            }
        }
        events
    }
}

impl Default for BoundaryParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the end offset (exclusive) of the first balanced top-level `{}`/`[]`
/// span in `text`, respecting string literals and escapes. Returns `None` if
/// `text` doesn't start with `{`/`[` or the span never closes.
fn find_balanced_span_end(text: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    let (_, first) = chars.next()?;
    if first != '{' && first != '[' {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in std::iter::once((0, first)).chain(chars) {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

fn value_to_event(value: serde_json::Value) -> Option<SuggestionEvent> {
    let raw: RawEvent = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "skipping provider event with unrecognized shape");
            return None;
        }
    };

    match raw.kind.as_str() {
        "file_start" => Some(SuggestionEvent::FileStart { file: raw.file? }),
        "file_end" => Some(SuggestionEvent::FileEnd),
        "summary" => Some(SuggestionEvent::Summary { text: raw.text? }),
        "suggestion" => {
            let file = raw.file?;
            let title = raw.title.unwrap_or_default();
            let description = raw.description.unwrap_or_default();
            let line_start = raw.line_start.or(raw.line);
            let line_end = raw.line_end.or(line_start);
            Some(SuggestionEvent::Suggestion(RawSuggestion {
                file,
                is_file_level: line_start.is_none(),
                line_start,
                line_end,
                side: Side::from_old_or_new(raw.old_or_new.as_deref()),
                comment_type: raw.comment_type.unwrap_or_else(|| "comment".into()),
                title,
                body: description,
                confidence: raw.confidence,
                reasoning: raw.reasoning,
            }))
        }
        other => {
            warn!(kind = %other, "skipping provider event with unknown kind");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(file: &str) -> String {
        format!(
            r#"{{"kind":"suggestion","file":"{file}","line_start":10,"type":"bug","title":"t","description":"d"}}"#
        )
    }

    #[test]
    fn parses_line_delimited_json() {
        let mut parser = BoundaryParser::new();
        let input = format!(
            "{{\"kind\":\"file_start\",\"file\":\"a.rs\"}}\n{}\n{{\"kind\":\"file_end\"}}\n",
            suggestion("a.rs")
        );
        let events = parser.feed(input.as_bytes());
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], SuggestionEvent::FileStart { file } if file == "a.rs"));
        assert!(matches!(&events[2], SuggestionEvent::FileEnd));
    }

    #[test]
    fn parses_blank_line_separated_objects() {
        let mut parser = BoundaryParser::new();
        let input = format!("{}\n\n\n{}\n", suggestion("a.rs"), suggestion("b.rs"));
        let events = parser.feed(input.as_bytes());
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn parses_trailing_json_array() {
        let mut parser = BoundaryParser::new();
        let input = format!("[{}, {}]", suggestion("a.rs"), suggestion("b.rs"));
        let events = parser.feed(input.as_bytes());
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn handles_split_chunks_across_feed_calls() {
        let mut parser = BoundaryParser::new();
        let whole = suggestion("a.rs");
        let (first, second) = whole.split_at(whole.len() / 2);
        assert!(parser.feed(first.as_bytes()).is_empty());
        let events = parser.feed(second.as_bytes());
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn malformed_chunk_is_skipped_not_fatal() {
        let mut parser = BoundaryParser::new();
        let input = format!("{{not json}}\n{}\n", suggestion("a.rs"));
        let events = parser.feed(input.as_bytes());
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn line_only_field_normalizes_to_line_start_and_end() {
        let mut parser = BoundaryParser::new();
        let input = r#"{"kind":"suggestion","file":"a.rs","line":5,"type":"nit","title":"t","description":"d"}"#;
        let events = parser.feed(input.as_bytes());
        let SuggestionEvent::Suggestion(s) = &events[0] else {
            panic!("expected suggestion event");
        };
        assert_eq!(s.line_start, Some(5));
        assert_eq!(s.line_end, Some(5));
    }

    #[test]
    fn type_field_becomes_comment_type() {
        let mut parser = BoundaryParser::new();
        let input = suggestion("a.rs");
        let events = parser.feed(input.as_bytes());
        let SuggestionEvent::Suggestion(s) = &events[0] else {
            panic!("expected suggestion event");
        };
        assert_eq!(s.comment_type, "bug");
    }

    #[test]
    fn old_maps_to_left_side() {
        let mut parser = BoundaryParser::new();
        let input = r#"{"kind":"suggestion","file":"a.rs","line":5,"old_or_new":"OLD","type":"nit","title":"t","description":"d"}"#;
        let events = parser.feed(input.as_bytes());
        let SuggestionEvent::Suggestion(s) = &events[0] else {
            panic!("expected suggestion event");
        };
        assert_eq!(s.side, Side::Left);
    }

    #[test]
    fn missing_line_fields_means_file_level() {
        let mut parser = BoundaryParser::new();
        let input = r#"{"kind":"suggestion","file":"a.rs","type":"nit","title":"t","description":"d"}"#;
        let events = parser.feed(input.as_bytes());
        let SuggestionEvent::Suggestion(s) = &events[0] else {
            panic!("expected suggestion event");
        };
        assert!(s.is_file_level);
    }

    #[test]
    fn unknown_kind_is_skipped() {
        let mut parser = BoundaryParser::new();
        let input = format!("{{\"kind\":\"mystery\"}}\n{}\n", suggestion("a.rs"));
        let events = parser.feed(input.as_bytes());
        assert_eq!(events.len(), 1);
    }
}
