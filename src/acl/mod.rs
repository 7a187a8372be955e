//! Parsed authorization model
//!
//! The types in this module describe the output of the authorization-file
//! parser: an ordered list of [`Acl`]s, each pairing a path rule (a list of
//! [`Segment`]s) with the access entries of its source section. Group
//! expansion has already been performed by the parser, so entries only name
//! concrete users or the built-in selectors (`*`, `$anonymous`,
//! `$authenticated`).
//!
//! The engine never evaluates rules whose user/repository selectors do not
//! match the active query; [`Acl::evaluate`] is the single point where that
//! filtering happens.

pub mod rights;
pub mod rule;

pub use rights::Rights;
pub use rule::{AccessEntry, Acl, PathRule, Principal, Segment, SegmentKind};
