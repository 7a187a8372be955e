//! Path rules and their access entries
//!
//! A rule section like
//!
//! ```text
//! [calc:/branches/*/docs]
//! alice = rw
//! * = r
//! ```
//!
//! arrives from the parser as one [`Acl`]: a sequence number (its position
//! in the file), an optional repository qualifier, a [`PathRule`] of
//! classified [`Segment`]s, and one [`AccessEntry`] per assignment line.

use std::fmt;
use std::sync::Arc;

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::acl::Rights;
use crate::error::{AuthzError, Result};

/// Who an access entry applies to.
///
/// Group expansion happens in the parser, so a group assignment reaches the
/// engine as one `User` entry per member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Principal {
    /// `$anonymous`: only unauthenticated requests.
    Anonymous,
    /// `$authenticated`: any named user.
    Authenticated,
    /// `*`: everyone, authenticated or not.
    Everyone,
    /// A concrete user name. A literal `"$anonymous"` user name is just a
    /// strange user name; it does not match unauthenticated requests.
    User(String),
}

impl Principal {
    /// Whether this selector applies to the given user, where `None` is
    /// the anonymous user.
    pub fn applies_to(&self, user: Option<&str>) -> bool {
        match self {
            Principal::Anonymous => user.is_none(),
            Principal::Authenticated => user.is_some(),
            Principal::Everyone => true,
            Principal::User(name) => user == Some(name.as_str()),
        }
    }
}

/// One `name = rights` line of a rule section.
#[derive(Debug, Clone)]
pub struct AccessEntry {
    principal: Principal,
    rights: Rights,
}

impl AccessEntry {
    /// Create an entry. Rights are masked to what a rule may grant, so a
    /// stray `RECURSIVE` bit cannot leak into the tree.
    pub fn new(principal: Principal, rights: Rights) -> Self {
        Self {
            principal,
            rights: rights & Rights::rule_mask(),
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn rights(&self) -> Rights {
        self.rights
    }
}

/// Pattern category of a rule segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Plain text, matched byte for byte.
    Literal,
    /// `*`: exactly one arbitrary segment.
    Any,
    /// `**`: zero or more arbitrary segments.
    AnyRecursive,
    /// `text*`: segments starting with the stored text.
    Prefix,
    /// `*text`: segments ending with the stored text.
    Suffix,
    /// Any other glob, e.g. `*.[ch]` or `v?.*`.
    Fnmatch,
}

/// One classified component of a path rule.
///
/// The pattern text is interned (`Arc<str>`); equality is kind plus
/// pointer-or-byte equality of the pattern. For `Prefix` and `Suffix` the
/// stored text is the fixed part without the `*`.
#[derive(Debug, Clone)]
pub struct Segment {
    kind: SegmentKind,
    pattern: Arc<str>,
    glob: Option<Arc<Pattern>>,
}

impl Segment {
    pub fn literal(text: &str) -> Self {
        Self {
            kind: SegmentKind::Literal,
            pattern: Arc::from(text),
            glob: None,
        }
    }

    pub fn any() -> Self {
        Self {
            kind: SegmentKind::Any,
            pattern: Arc::from("*"),
            glob: None,
        }
    }

    pub fn any_recursive() -> Self {
        Self {
            kind: SegmentKind::AnyRecursive,
            pattern: Arc::from("**"),
            glob: None,
        }
    }

    pub fn prefix(text: &str) -> Self {
        Self {
            kind: SegmentKind::Prefix,
            pattern: Arc::from(text),
            glob: None,
        }
    }

    pub fn suffix(text: &str) -> Self {
        Self {
            kind: SegmentKind::Suffix,
            pattern: Arc::from(text),
            glob: None,
        }
    }

    /// A general glob segment; compiled here so lookups never re-parse it.
    pub fn fnmatch(text: &str) -> Result<Self> {
        let glob = Pattern::new(text).map_err(|e| AuthzError::InvalidPattern {
            pattern: text.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            kind: SegmentKind::Fnmatch,
            pattern: Arc::from(text),
            glob: Some(Arc::new(glob)),
        })
    }

    /// Classify a raw segment the way the rule parser does: `*` and `**`
    /// are the wildcard kinds, text without wildcard characters is a
    /// literal, a single `*` at the end or start makes a prefix or suffix
    /// pattern, and everything else is a general glob.
    pub fn classify(text: &str) -> Result<Self> {
        if text == "*" {
            return Ok(Self::any());
        }
        if text == "**" {
            return Ok(Self::any_recursive());
        }
        if !text.bytes().any(|b| matches!(b, b'*' | b'?' | b'[')) {
            return Ok(Self::literal(text));
        }

        let wildcards = text.bytes().filter(|b| matches!(b, b'*' | b'?' | b'[')).count();
        if wildcards == 1 {
            if let Some(prefix) = text.strip_suffix('*') {
                return Ok(Self::prefix(prefix));
            }
            if let Some(suffix) = text.strip_prefix('*') {
                return Ok(Self::suffix(suffix));
            }
        }

        Self::fnmatch(text)
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// The stored pattern text (without the `*` for prefix and suffix
    /// segments).
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub(crate) fn pattern_arc(&self) -> Arc<str> {
        Arc::clone(&self.pattern)
    }

    pub(crate) fn glob_arc(&self) -> Option<Arc<Pattern>> {
        self.glob.clone()
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && (Arc::ptr_eq(&self.pattern, &other.pattern) || self.pattern == other.pattern)
    }
}

impl Eq for Segment {}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SegmentKind::Prefix => write!(f, "{}*", self.pattern),
            SegmentKind::Suffix => write!(f, "*{}", self.pattern),
            _ => f.write_str(&self.pattern),
        }
    }
}

/// An ordered list of segments; the empty rule addresses the repository
/// root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathRule {
    segments: Vec<Segment>,
}

impl PathRule {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parse a rule path such as `/branches/*/docs/**`. Leading and
    /// trailing separators and separator runs are ignored, so `/` is the
    /// root rule. Adjacent `**` segments collapse into one; a single `**`
    /// already matches any number of segments.
    pub fn parse(path: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            let segment = Segment::classify(part)?;
            if segment.kind() == SegmentKind::AnyRecursive
                && segments.last().map(Segment::kind) == Some(SegmentKind::AnyRecursive)
            {
                continue;
            }
            segments.push(segment);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether this rule addresses the repository root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for PathRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// One rule section, filtered and normalized by the parser.
#[derive(Debug, Clone)]
pub struct Acl {
    sequence_number: i64,
    repository: Option<String>,
    rule: PathRule,
    entries: Vec<AccessEntry>,
}

impl Acl {
    /// Create an ACL. `sequence_number` is the section's position in the
    /// source file, starting at 1; later sections override earlier ones
    /// wherever their rules overlap. `repository = None` applies the rule
    /// to every repository.
    pub fn new(
        sequence_number: i64,
        repository: Option<&str>,
        rule: PathRule,
        entries: Vec<AccessEntry>,
    ) -> Self {
        Self {
            sequence_number,
            repository: repository.map(str::to_owned),
            rule,
            entries,
        }
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    pub fn rule(&self) -> &PathRule {
        &self.rule
    }

    /// The rights this single ACL grants to `user` on `repository`, or
    /// `None` when it does not apply to that pair at all. An applicable
    /// entry with empty rights yields `Some(empty)`, which is a deny, not
    /// "does not apply". When several entries apply, their rights combine.
    pub fn evaluate(&self, user: Option<&str>, repository: &str) -> Option<Rights> {
        if let Some(repos) = &self.repository
            && repos != repository
        {
            return None;
        }

        let mut applies = false;
        let mut rights = Rights::empty();
        for entry in &self.entries {
            if entry.principal().applies_to(user) {
                applies = true;
                rights |= entry.rights();
            }
        }
        applies.then_some(rights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_kinds() {
        let cases = [
            ("trunk", SegmentKind::Literal),
            ("*", SegmentKind::Any),
            ("**", SegmentKind::AnyRecursive),
            ("release-*", SegmentKind::Prefix),
            ("*.md", SegmentKind::Suffix),
            ("*.[ch]", SegmentKind::Fnmatch),
            ("v?-*", SegmentKind::Fnmatch),
            ("a*b", SegmentKind::Fnmatch),
            ("", SegmentKind::Literal),
        ];
        for (text, kind) in cases {
            assert_eq!(Segment::classify(text).unwrap().kind(), kind, "{text:?}");
        }
    }

    #[test]
    fn test_classify_strips_wildcard_from_fixed_part() {
        let prefix = Segment::classify("release-*").unwrap();
        assert_eq!(prefix.pattern(), "release-");
        assert_eq!(prefix.to_string(), "release-*");

        let suffix = Segment::classify("*.md").unwrap();
        assert_eq!(suffix.pattern(), ".md");
        assert_eq!(suffix.to_string(), "*.md");
    }

    #[test]
    fn test_classify_rejects_broken_glob() {
        let err = Segment::classify("a[b*").unwrap_err();
        assert!(matches!(err, AuthzError::InvalidPattern { .. }));
    }

    #[test]
    fn test_segment_equality_by_kind_and_pattern() {
        assert_eq!(Segment::literal("a"), Segment::literal("a"));
        assert_ne!(Segment::literal("a"), Segment::prefix("a"));
        assert_ne!(Segment::literal("a"), Segment::literal("b"));
    }

    #[test]
    fn test_parse_normalizes_separators() {
        let rule = PathRule::parse("//trunk///src/").unwrap();
        assert_eq!(rule.segments().len(), 2);
        assert_eq!(rule.to_string(), "/trunk/src");

        assert!(PathRule::parse("/").unwrap().is_root());
        assert!(PathRule::parse("").unwrap().is_root());
    }

    #[test]
    fn test_parse_collapses_adjacent_any_recursive() {
        let rule = PathRule::parse("/a/**/**/b").unwrap();
        assert_eq!(rule.to_string(), "/a/**/b");
    }

    #[test]
    fn test_principal_matching() {
        assert!(Principal::Anonymous.applies_to(None));
        assert!(!Principal::Anonymous.applies_to(Some("alice")));

        assert!(Principal::Authenticated.applies_to(Some("alice")));
        assert!(!Principal::Authenticated.applies_to(None));

        assert!(Principal::Everyone.applies_to(None));
        assert!(Principal::Everyone.applies_to(Some("alice")));

        let alice = Principal::User("alice".into());
        assert!(alice.applies_to(Some("alice")));
        assert!(!alice.applies_to(Some("bob")));
        assert!(!alice.applies_to(None));
    }

    #[test]
    fn test_literal_anonymous_name_is_not_the_selector() {
        let odd = Principal::User("$anonymous".into());
        assert!(odd.applies_to(Some("$anonymous")));
        assert!(!odd.applies_to(None));
    }

    #[test]
    fn test_evaluate_repository_filter() {
        let acl = Acl::new(
            1,
            Some("calc"),
            PathRule::parse("/trunk").unwrap(),
            vec![AccessEntry::new(Principal::Everyone, Rights::READ)],
        );
        assert_eq!(acl.repository(), Some("calc"));
        assert_eq!(acl.sequence_number(), 1);
        assert_eq!(acl.evaluate(Some("alice"), "calc"), Some(Rights::READ));
        assert_eq!(acl.evaluate(Some("alice"), "paint"), None);

        let global = Acl::new(
            2,
            None,
            PathRule::parse("/trunk").unwrap(),
            vec![AccessEntry::new(Principal::Everyone, Rights::READ)],
        );
        assert_eq!(global.evaluate(Some("alice"), "paint"), Some(Rights::READ));
    }

    #[test]
    fn test_evaluate_combines_matching_entries() {
        let acl = Acl::new(
            1,
            None,
            PathRule::parse("/trunk").unwrap(),
            vec![
                AccessEntry::new(Principal::Everyone, Rights::READ),
                AccessEntry::new(Principal::User("alice".into()), Rights::WRITE),
            ],
        );
        assert_eq!(
            acl.evaluate(Some("alice"), "calc"),
            Some(Rights::READ | Rights::WRITE)
        );
        assert_eq!(acl.evaluate(Some("bob"), "calc"), Some(Rights::READ));
    }

    #[test]
    fn test_evaluate_empty_rights_still_applies() {
        let acl = Acl::new(
            1,
            None,
            PathRule::parse("/secret").unwrap(),
            vec![AccessEntry::new(Principal::Everyone, Rights::empty())],
        );
        // A deny entry is an answer, not a "does not apply".
        assert_eq!(acl.evaluate(Some("alice"), "calc"), Some(Rights::empty()));
    }

    #[test]
    fn test_evaluate_no_matching_entry() {
        let acl = Acl::new(
            1,
            None,
            PathRule::parse("/trunk").unwrap(),
            vec![AccessEntry::new(Principal::User("alice".into()), Rights::READ)],
        );
        assert_eq!(acl.evaluate(Some("bob"), "calc"), None);
        assert_eq!(acl.evaluate(None, "calc"), None);
    }

    #[test]
    fn test_entry_masks_recursive_bit() {
        let entry = AccessEntry::new(Principal::Everyone, Rights::READ | Rights::RECURSIVE);
        assert_eq!(entry.rights(), Rights::READ);
    }
}
