//! Authorization handle and query facade
//!
//! An [`Authz`] owns the parsed rule list plus a small most-recently-used
//! cache of rule trees, each filtered down to one `(user, repository)`
//! pair. Queries against one handle must be serialized (the cache
//! reshuffles on every query, hence `&mut self`); distinct handles are
//! fully independent.

use tracing::{debug, trace};

use crate::acl::{Acl, Rights};
use crate::error::{AuthzError, Result};
use crate::tree::{LookupState, Node, NodeId, TreeBuilder, lookup};

/// Stands in for the repository name when a query does not provide one.
/// It never equals a real repository, so only repository-unqualified rules
/// apply to such queries.
pub const ANY_REPOSITORY: &str = "[ANY_REPOSITORY]";

/// Filtered trees kept per handle. Servers typically alternate between a
/// handful of `(user, repository)` pairs, so a few slots go a long way.
const FILTERED_TREE_CACHE_SIZE: usize = 4;

/// The rule tree specialized to one `(user, repository)` pair, together
/// with the reusable lookup state for queries against it.
struct FilteredTree {
    /// `None` is the anonymous user.
    user: Option<String>,
    repository: String,
    /// Node arena; dropping it releases the whole tree.
    nodes: Vec<Node>,
    lookup_state: LookupState,
}

impl FilteredTree {
    fn is_for(&self, user: Option<&str>, repository: &str) -> bool {
        self.user.as_deref() == user && self.repository == repository
    }
}

/// An authorization handle: the parsed rules plus the filtered-tree cache.
pub struct Authz {
    acls: Vec<Acl>,
    /// Most recently used first.
    filtered: Vec<FilteredTree>,
}

impl Authz {
    /// Create a handle from the parser's normalized rule list.
    ///
    /// The list is expected in source order with ascending sequence
    /// numbers, and with at most one section per `(repository, path)`
    /// pair; a query that discovers two applicable rules for the very same
    /// path fails with [`AuthzError::ConflictingRules`].
    pub fn new(acls: Vec<Acl>) -> Self {
        Self {
            acls,
            filtered: Vec::new(),
        }
    }

    /// Whether `user` has the `required` access on `path` in `repository`.
    ///
    /// - `repository = None` restricts the check to rules that are not
    ///   qualified with a repository name.
    /// - `path = None` asks whether the user holds the rights on *any*
    ///   path of the repository. Otherwise the path must start with `/`;
    ///   empty segments and repeated separators are tolerated.
    /// - `user = None` is the anonymous user.
    /// - With [`Rights::RECURSIVE`] in `required`, every path at or below
    ///   `path` must grant the remaining rights. This speaks only to paths
    ///   addressable by some rule; it makes no statement about paths that
    ///   merely exist in the repository.
    pub fn check_access(
        &mut self,
        repository: Option<&str>,
        path: Option<&str>,
        user: Option<&str>,
        required: Rights,
    ) -> Result<bool> {
        let repository = repository.unwrap_or(ANY_REPOSITORY);
        debug!(repository, path, user, required = ?required, "checking access");

        let tree = self.filtered_tree(repository, user)?;

        let Some(path) = path else {
            let required = required & Rights::rule_mask();
            let root = &tree.nodes[NodeId::ROOT.index()];
            return Ok(root.rights.max_rights.contains(required));
        };
        if !path.starts_with('/') {
            return Err(AuthzError::MalformedPath {
                path: path.to_string(),
            });
        }

        let FilteredTree {
            nodes,
            lookup_state,
            ..
        } = tree;
        Ok(lookup(
            nodes,
            lookup_state,
            path,
            required & Rights::rule_mask(),
            required.contains(Rights::RECURSIVE),
        ))
    }

    /// Fetch the filtered tree for the pair from the cache, or build it.
    fn filtered_tree(&mut self, repository: &str, user: Option<&str>) -> Result<&mut FilteredTree> {
        if let Some(found) = self
            .filtered
            .iter()
            .position(|tree| tree.is_for(user, repository))
        {
            trace!(repository, user, "filtered tree cache hit");
            self.filtered[..=found].rotate_right(1);
            return Ok(&mut self.filtered[0]);
        }

        // Make room first: the evicted tree is gone before the new one is
        // built, so the two never coexist.
        if self.filtered.len() == FILTERED_TREE_CACHE_SIZE
            && let Some(evicted) = self.filtered.pop()
        {
            trace!(
                repository = evicted.repository.as_str(),
                user = evicted.user.as_deref(),
                "evicting oldest filtered tree"
            );
        }

        let nodes = TreeBuilder::build(&self.acls, user, repository)?;
        self.filtered.insert(
            0,
            FilteredTree {
                user: user.map(str::to_owned),
                repository: repository.to_owned(),
                nodes,
                lookup_state: LookupState::new(),
            },
        );
        Ok(&mut self.filtered[0])
    }
}
