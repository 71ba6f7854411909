//! Opaque short IDs for analysis runs and local-review sessions.
//!
//! Store-assigned rows (reviews, comments) use plain integers and need no
//! helper here; runs and sessions use a ULID so they're sortable by creation
//! time without a second index.

/// Generates a new opaque run/session id.
pub fn new_run_id() -> String {
    ulid::Ulid::new().to_string()
}

/// Validates the ULID shape (26-char Crockford Base32) without constructing one,
/// so callers can reject a malformed path parameter before it reaches the store.
pub fn is_valid_run_id(s: &str) -> bool {
    s.len() == 26 && ulid::Ulid::from_string(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_id_is_valid() {
        let id = new_run_id();
        assert!(is_valid_run_id(&id));
    }

    #[test]
    fn test_invalid_run_id_rejected() {
        assert!(!is_valid_run_id("not-a-ulid"));
        assert!(!is_valid_run_id(""));
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = new_run_id();
        let b = new_run_id();
        assert_ne!(a, b);
    }
}
