//! Identity-conflict detection.
//!
//! When locally persisted network state drifts out of sync with the
//! messaging network (stale installation, broken identity association), the
//! SDK surfaces it as ordinary string errors. We pattern-match the known
//! markers; a hit means "clear local network state and reinitialize", which
//! [`crate::session::SessionState::connect`] attempts exactly once.

const IDENTITY_CONFLICT_MARKERS: &[&str] = &[
    "sequence_id",
    "identity update",
    "association state",
    "signature validation",
    "installation is not registered",
    "key package",
];

pub(crate) fn is_identity_conflict_error(error: &str) -> bool {
    let lowered = error.to_ascii_lowercase();
    IDENTITY_CONFLICT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_markers_match_case_insensitively() {
        assert!(is_identity_conflict_error("Sequence_ID mismatch: 42 != 41"));
        assert!(is_identity_conflict_error(
            "failed to validate identity update for inbox"
        ));
        assert!(is_identity_conflict_error("signature validation failed"));
    }

    #[test]
    fn test_ordinary_errors_do_not_match() {
        assert!(!is_identity_conflict_error("connection refused"));
        assert!(!is_identity_conflict_error("timeout after 15s"));
        assert!(!is_identity_conflict_error(""));
    }
}
