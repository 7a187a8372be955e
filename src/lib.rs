//! Path-based access control for version-control repositories
//!
//! Given the parsed contents of an authorization file, this crate decides
//! whether a user may read and/or write a repository path.
//!
//! ## Features
//!
//! - **Wildcarded rules** - path segments may be `*` (one segment), `**`
//!   (any number of segments), `text*`, `*text`, or a general glob
//! - **Recursive queries** - ask whether rights hold on a whole subtree,
//!   answered from precomputed per-subtree bounds instead of enumeration
//! - **Filtered trees** - rules are folded into a prefix tree per
//!   `(user, repository)` pair, so queries never touch irrelevant rules
//! - **Query locality** - a small MRU cache of filtered trees, and walks
//!   shared between queries under the same parent directory
//!
//! ## Rule model
//!
//! ```text
//! sections  →  ACLs (sequence number, repository?, path rule, entries)
//! entries   →  * | $anonymous | $authenticated | user  =  rights
//! ```
//!
//! The later of two overlapping rules wins. A path without a matching rule
//! inherits from its nearest ruled parent; the root defaults to deny-all.
//!
//! ## Example
//!
//! ```
//! use repo_authz::{AccessEntry, Acl, Authz, PathRule, Principal, Rights};
//!
//! let acls = vec![
//!     Acl::new(1, None, PathRule::parse("/")?, vec![
//!         AccessEntry::new(Principal::Everyone, Rights::READ),
//!     ]),
//!     Acl::new(2, Some("calc"), PathRule::parse("/trunk/secret")?, vec![
//!         AccessEntry::new(Principal::Everyone, Rights::empty()),
//!     ]),
//! ];
//! let mut authz = Authz::new(acls);
//!
//! assert!(authz.check_access(Some("calc"), Some("/trunk"), Some("alice"), Rights::READ)?);
//! assert!(!authz.check_access(Some("calc"), Some("/trunk/secret/x"), Some("alice"), Rights::READ)?);
//! # Ok::<(), repo_authz::AuthzError>(())
//! ```

pub mod acl;
pub mod error;

mod authz;
mod tree;

// Re-export main types
pub use acl::{AccessEntry, Acl, PathRule, Principal, Rights, Segment, SegmentKind};
pub use authz::{ANY_REPOSITORY, Authz};
pub use error::{AuthzError, Result};
