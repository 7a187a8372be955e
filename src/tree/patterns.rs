//! Segment matching primitives
//!
//! Comparisons are byte-wise: rule patterns and path segments are treated
//! as opaque byte strings, and path separators never occur inside a
//! segment. Suffix patterns reuse the prefix machinery by comparing the
//! byte-reversed strings, so suffix children can be kept sorted and
//! scanned exactly like prefix children.

use std::cmp::Ordering;

use glob::Pattern;

/// True iff `pattern` is a byte-wise prefix of `segment`.
pub(crate) fn is_prefix(pattern: &str, segment: &str) -> bool {
    segment.as_bytes().starts_with(pattern.as_bytes())
}

/// True iff `pattern` is a byte-wise suffix of `segment`.
pub(crate) fn is_suffix(pattern: &str, segment: &str) -> bool {
    segment.as_bytes().ends_with(pattern.as_bytes())
}

/// Lexicographic order of the byte-reversed strings. Suffix children are
/// sorted with this, which clusters patterns by their segment endings.
pub(crate) fn reversed_cmp(a: &str, b: &str) -> Ordering {
    a.bytes().rev().cmp(b.bytes().rev())
}

/// Byte comparison over the first `min(len)` bytes only: a pattern that is
/// a prefix of `segment` compares equal, and once a pattern compares
/// greater, no later pattern in prefix order can match.
pub(crate) fn prefix_cmp_truncated(pattern: &str, segment: &str) -> Ordering {
    let len = pattern.len().min(segment.len());
    pattern.as_bytes()[..len].cmp(&segment.as_bytes()[..len])
}

/// [`prefix_cmp_truncated`] over the byte-reversed strings, for suffix
/// scans.
pub(crate) fn reversed_cmp_truncated(pattern: &str, segment: &str) -> Ordering {
    for (p, s) in pattern.bytes().rev().zip(segment.bytes().rev()) {
        match p.cmp(&s) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Full-segment glob match (`*`, `?`, `[...]`).
pub(crate) fn matches_glob(pattern: &Pattern, segment: &str) -> bool {
    pattern.matches(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_matching() {
        assert!(is_prefix("", "anything"));
        assert!(is_prefix("rel", "release-1.0"));
        assert!(is_prefix("release-1.0", "release-1.0"));
        assert!(!is_prefix("release-1.0x", "release-1.0"));
        assert!(!is_prefix("rel", "branches"));
    }

    #[test]
    fn test_suffix_matching() {
        assert!(is_suffix("", "anything"));
        assert!(is_suffix(".md", "readme.md"));
        assert!(is_suffix("readme.md", "readme.md"));
        assert!(!is_suffix(".md", "readme.txt"));
        assert!(!is_suffix("xreadme.md", "readme.md"));
    }

    #[test]
    fn test_reversed_order_clusters_endings() {
        // Sorted by reversed bytes, equal endings become neighbours.
        let mut patterns = vec![".md", ".c", "e.md", ".txt"];
        patterns.sort_by(|a, b| reversed_cmp(a, b));
        assert_eq!(patterns, vec![".c", ".md", "e.md", ".txt"]);
    }

    #[test]
    fn test_truncated_comparison_treats_prefix_as_equal() {
        assert_eq!(prefix_cmp_truncated("ab", "abc"), Ordering::Equal);
        assert_eq!(prefix_cmp_truncated("abd", "abc"), Ordering::Greater);
        assert_eq!(prefix_cmp_truncated("abb", "abc"), Ordering::Less);
        // The pattern may be longer than the segment and still compare
        // equal; the caller decides with a full prefix test.
        assert_eq!(prefix_cmp_truncated("abcd", "abc"), Ordering::Equal);
        assert_eq!(prefix_cmp_truncated("", "abc"), Ordering::Equal);
    }

    #[test]
    fn test_truncated_reversed_comparison() {
        assert_eq!(reversed_cmp_truncated(".md", "readme.md"), Ordering::Equal);
        assert_eq!(reversed_cmp_truncated(".me", "readme.md"), Ordering::Greater);
        assert_eq!(reversed_cmp_truncated(".mc", "readme.md"), Ordering::Less);
        assert_eq!(reversed_cmp_truncated("", "readme.md"), Ordering::Equal);
    }

    #[test]
    fn test_glob_matching() {
        let pattern = Pattern::new("*.[ch]").unwrap();
        assert!(matches_glob(&pattern, "main.c"));
        assert!(matches_glob(&pattern, "main.h"));
        assert!(!matches_glob(&pattern, "main.rs"));

        let pattern = Pattern::new("v?-*").unwrap();
        assert!(matches_glob(&pattern, "v1-beta"));
        assert!(!matches_glob(&pattern, "v12-beta"));
    }

    #[test]
    fn test_glob_matches_empty_star() {
        let pattern = Pattern::new("a*").unwrap();
        assert!(matches_glob(&pattern, "a"));
    }
}
