//! Tolerant matching of external (billing-system) service ids.
//!
//! Upstream exports do not guarantee a consistent id shape: the same
//! subscriber can appear as `00123`, `SVC-00123`, or with a site prefix
//! glued on. The matcher resolves these shapes with a documented
//! precedence; lookups stay deterministic because every rule is symmetric.

/// Matches stored external ids against ids found in CSV rows.
///
/// Precedence:
/// 1. exact match (trimmed, case-insensitive);
/// 2. prefix-wrapped: one side equals a known prefix followed by the other;
/// 3. suffix match: one side ends with the other, with a minimum overlap
///    length guarding against spurious short-suffix hits.
#[derive(Debug, Clone)]
pub struct ExternalIdMatcher {
    prefixes: Vec<String>,
    min_suffix_len: usize,
}

impl Default for ExternalIdMatcher {
    fn default() -> Self {
        Self {
            prefixes: vec!["SVC-".to_string(), "CLI-".to_string()],
            min_suffix_len: 4,
        }
    }
}

impl ExternalIdMatcher {
    pub fn new(prefixes: Vec<String>, min_suffix_len: usize) -> Self {
        Self {
            prefixes,
            min_suffix_len,
        }
    }

    /// Whether `stored` (a client's or referral's external id) matches
    /// `candidate` (the service id from a CSV row).
    pub fn matches(&self, stored: &str, candidate: &str) -> bool {
        let stored = stored.trim();
        let candidate = candidate.trim();
        if stored.is_empty() || candidate.is_empty() {
            return false;
        }

        if stored.eq_ignore_ascii_case(candidate) {
            return true;
        }

        for prefix in &self.prefixes {
            if eq_with_prefix(prefix, candidate, stored) || eq_with_prefix(prefix, stored, candidate)
            {
                return true;
            }
        }

        self.suffix_matches(stored, candidate) || self.suffix_matches(candidate, stored)
    }

    fn suffix_matches(&self, longer: &str, shorter: &str) -> bool {
        let longer = longer.as_bytes();
        let shorter = shorter.as_bytes();
        if shorter.len() < self.min_suffix_len || longer.len() <= shorter.len() {
            return false;
        }
        longer[longer.len() - shorter.len()..].eq_ignore_ascii_case(shorter)
    }
}

/// `wrapped == prefix + bare`, ignoring case. Byte-wise, so ids with
/// arbitrary content cannot panic on a char boundary.
fn eq_with_prefix(prefix: &str, bare: &str, wrapped: &str) -> bool {
    let prefix = prefix.as_bytes();
    let bare = bare.as_bytes();
    let wrapped = wrapped.as_bytes();
    wrapped.len() == prefix.len() + bare.len()
        && wrapped[..prefix.len()].eq_ignore_ascii_case(prefix)
        && wrapped[prefix.len()..].eq_ignore_ascii_case(bare)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exact_match_is_case_insensitive_and_trimmed() {
        let matcher = ExternalIdMatcher::default();
        assert!(matcher.matches("ab123", "AB123"));
        assert!(matcher.matches("  00123 ", "00123"));
        assert!(!matcher.matches("00123", "00124"));
    }

    #[test]
    fn empty_ids_never_match() {
        let matcher = ExternalIdMatcher::default();
        assert!(!matcher.matches("", ""));
        assert!(!matcher.matches("00123", "   "));
    }

    #[test]
    fn known_prefix_wrapped_forms_match_both_directions() {
        let matcher = ExternalIdMatcher::default();
        assert!(matcher.matches("SVC-00123", "00123"));
        assert!(matcher.matches("00123", "SVC-00123"));
        assert!(matcher.matches("cli-00123", "00123"));
        assert!(!matcher.matches("XYZ-00123", "00123x"));
    }

    #[test]
    fn suffix_match_requires_minimum_overlap() {
        let matcher = ExternalIdMatcher::default();
        // 5-char overlap: accepted.
        assert!(matcher.matches("NORTH00123", "00123"));
        // 3-char overlap: too short, rejected.
        assert!(!matcher.matches("NORTH123", "123"));
    }

    #[test]
    fn unknown_prefix_still_matches_through_suffix_rule() {
        let matcher = ExternalIdMatcher::default();
        assert!(matcher.matches("ZZ-00123", "00123"));
    }

    proptest! {
        /// Property: matching is symmetric for any pair of candidate shapes.
        #[test]
        fn matching_is_symmetric(a in "[A-Za-z0-9-]{1,12}", b in "[A-Za-z0-9-]{1,12}") {
            let matcher = ExternalIdMatcher::default();
            prop_assert_eq!(matcher.matches(&a, &b), matcher.matches(&b, &a));
        }

        /// Property: every id matches itself.
        #[test]
        fn matching_is_reflexive(id in "[A-Za-z0-9-]{1,16}") {
            let matcher = ExternalIdMatcher::default();
            prop_assert!(matcher.matches(&id, &id));
        }
    }
}

