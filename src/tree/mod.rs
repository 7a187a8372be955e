//! Filtered rule tree
//!
//! All rules relevant to one `(user, repository)` pair are folded into a
//! prefix tree whose edges are whole path segments. Literal segments live
//! in a per-node hash map; pattern segments (`*`, `**`, `text*`, `*text`
//! and general globs) live in a separate substructure so the common
//! pattern-free case stays a single hash lookup per level.
//!
//! After construction, two finalization passes precompute for every node
//! the minimal and maximal rights found anywhere in its subtree. Lookups
//! use those bounds to answer early: if even the best case below the
//! current node cannot satisfy the requirement, the walk stops with a
//! denial, and if the worst case already satisfies it, with a grant.

pub(crate) mod builder;
pub(crate) mod lookup;
pub(crate) mod node;
pub(crate) mod patterns;

pub(crate) use builder::TreeBuilder;
pub(crate) use lookup::{LookupState, lookup};
pub(crate) use node::{Node, NodeId};
