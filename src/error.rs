//! Error types for repo-authz
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors that are part of the API.
//! Denied access is never an error: queries answer `false` instead.

use thiserror::Error;

/// Errors produced while building or querying an authorization rule tree.
#[derive(Error, Debug)]
pub enum AuthzError {
    /// A general glob segment failed to compile.
    #[error("invalid segment pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Two rules that both apply to the current user and repository target
    /// the exact same path. The rule source forbids this, so construction
    /// aborts rather than silently picking a winner.
    #[error("conflicting rules for '{path}': sections {first} and {second} target the same path")]
    ConflictingRules {
        path: String,
        first: i64,
        second: i64,
    },

    /// A non-null query path did not start with `/`.
    #[error("malformed path '{path}': repository paths must start with '/'")]
    MalformedPath { path: String },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, AuthzError>;
