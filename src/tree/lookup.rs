//! Walking the filtered tree
//!
//! A path query follows the tree one segment at a time. Because several
//! pattern children can match a single segment, the walk tracks the *set*
//! of nodes compatible with the path so far, together with a running
//! summary of their rights: the highest-precedence access record for point
//! answers, and the min/max bounds for pruning and recursive answers.
//!
//! The state is reusable. It remembers the parent path of the last walk,
//! so checking `/trunk/a`, `/trunk/b`, `/trunk/c` walks `/trunk` once.

use std::cmp::Ordering;

use crate::acl::Rights;
use crate::tree::node::{Access, LimitedRights, Node, NodeId};
use crate::tree::patterns::{
    is_prefix, is_suffix, matches_glob, prefix_cmp_truncated, reversed_cmp_truncated,
};

/// Reusable lookup state. Creating one is cheap, but reusing it across
/// queries against the same tree keeps the buffers warm and enables the
/// parent-path shortcut.
#[derive(Debug)]
pub(crate) struct LookupState {
    /// Rights applying at the level walked last, summarized over all
    /// matching nodes.
    rights: LimitedRights,
    /// Nodes compatible with the path walked so far.
    current: Vec<NodeId>,
    /// Nodes for the next segment, built up while scanning `current`.
    next: Vec<NodeId>,
    /// The directory walked in the previous query; `current` and
    /// `parent_rights` describe this path.
    parent_path: String,
    parent_rights: LimitedRights,
}

impl LookupState {
    pub fn new() -> Self {
        Self {
            rights: LimitedRights::unset(),
            current: Vec::with_capacity(4),
            next: Vec::with_capacity(4),
            parent_path: String::new(),
            parent_rights: LimitedRights::unset(),
        }
    }

    /// Point the state at the tree root for a walk of `path`, returning
    /// the portion that still has to be walked. When the previous query's
    /// parent path is a directory prefix of `path`, the walk resumes
    /// there with the node set already in place.
    fn init<'p>(&mut self, nodes: &[Node], path: &'p str) -> &'p str {
        if !self.parent_path.is_empty()
            && path.len() > self.parent_path.len()
            && path.as_bytes()[self.parent_path.len()] == b'/'
            && path.starts_with(self.parent_path.as_str())
        {
            self.rights = self.parent_rights;
            return &path[self.parent_path.len()..];
        }

        let root = &nodes[NodeId::ROOT.index()];
        self.rights = root.rights;
        self.parent_rights = root.rights;
        self.current.clear();
        self.next.clear();
        self.current.push(NodeId::ROOT);

        // A `**` below the root matches the empty segment sequence too.
        if let Some(var) = root.pattern_children.as_ref().and_then(|p| p.any_var) {
            let var_rights = nodes[var.index()].rights;
            self.rights.combine_access(&var_rights);
            self.rights.combine_limits(&var_rights);
            self.current.push(var);
        }

        self.parent_path.clear();
        path
    }

    /// Enlist `id` as a match for the next level and fold its rights into
    /// the running summary.
    fn add_next(&mut self, nodes: &[Node], id: NodeId) {
        let node = &nodes[id.index()];
        // The record from the latest rule wins; the bounds overlay across
        // every node still in play, since any of them may match below.
        self.rights.combine_access(&node.rights);
        self.rights.combine_limits(&node.rights);
        self.next.push(id);

        // A `**` child also matches the empty segment sequence, so it
        // applies to this very level as well. Rule normalization keeps
        // `**` from chaining, so one step suffices.
        if let Some(var) = node.pattern_children.as_ref().and_then(|p| p.any_var) {
            let var_node = &nodes[var.index()];
            self.rights.combine_access(&var_node.rights);
            self.rights.combine_limits(&var_node.rights);
            self.next.push(var);
        }
    }

    /// Enlist every prefix child whose fixed text starts `segment`. The
    /// children are sorted, so the scan stops at the first entry sorting
    /// past the segment.
    fn add_prefix_matches(&mut self, nodes: &[Node], segment: &str, prefixes: &[NodeId]) {
        for &id in prefixes {
            let pattern = &nodes[id.index()].segment;
            match prefix_cmp_truncated(pattern, segment) {
                Ordering::Greater => break,
                _ if is_prefix(pattern, segment) => self.add_next(nodes, id),
                _ => {}
            }
        }
    }

    /// Suffix counterpart of [`Self::add_prefix_matches`], scanning in
    /// byte-reversed order.
    fn add_suffix_matches(&mut self, nodes: &[Node], segment: &str, suffixes: &[NodeId]) {
        for &id in suffixes {
            let pattern = &nodes[id.index()].segment;
            match reversed_cmp_truncated(pattern, segment) {
                Ordering::Greater => break,
                _ if is_suffix(pattern, segment) => self.add_next(nodes, id),
                _ => {}
            }
        }
    }
}

/// Split the next segment off `path`. Returns the segment and the rest
/// behind the separator run, or `None` after the last segment. The caller
/// strips leading and trailing separators beforehand, so the rest is never
/// empty.
fn next_segment(path: &str) -> (&str, Option<&str>) {
    match path.find('/') {
        Some(at) => (&path[..at], Some(path[at..].trim_start_matches('/'))),
        None => (path, None),
    }
}

/// Walk `path` from the tree root and report whether `required` is granted
/// on it. `required` must not contain the recursive bit; `recursive`
/// instead asks whether every path at or below `path` grants it. `path`
/// does not need to be normalized.
pub(crate) fn lookup(
    nodes: &[Node],
    state: &mut LookupState,
    path: &str,
    required: Rights,
    recursive: bool,
) -> bool {
    // Normalize the tail; the front stays raw for the parent-path check.
    let trimmed = path.trim_end_matches('/');
    let remaining = state.init(nodes, trimmed).trim_start_matches('/');
    let mut path = (!remaining.is_empty()).then_some(remaining);

    while !state.current.is_empty() {
        let Some(rest) = path else { break };

        // Even the best case in this subtree cannot satisfy the request.
        if !state.rights.max_rights.contains(required) {
            return false;
        }
        // The worst case already satisfies it.
        if state.rights.min_rights.contains(required) {
            return true;
        }

        let (segment, tail) = next_segment(rest);
        path = tail;

        state.next.clear();
        state.rights.access = Access::unset();
        state.rights.min_rights = Rights::rule_mask();
        state.rights.max_rights = Rights::empty();

        // Keep the parent path in step with what `current` will describe
        // once `next` replaces it.
        if path.is_some() {
            state.parent_path.push('/');
            state.parent_path.push_str(segment);
        }

        for position in 0..state.current.len() {
            let id = state.current[position];
            let node = &nodes[id.index()];

            if let Some(&child) = node.literal_children.get(segment) {
                state.add_next(nodes, child);
            }

            if let Some(patterns) = node.pattern_children.as_ref() {
                if let Some(any) = patterns.any {
                    state.add_next(nodes, any);
                }
                // A `**` node matches this level and stays active for the
                // next one.
                if patterns.repeat {
                    state.add_next(nodes, id);
                }
                if !patterns.prefixes.is_empty() {
                    state.add_prefix_matches(nodes, segment, &patterns.prefixes);
                }
                for &complex in &patterns.complex {
                    if let Some(glob) = nodes[complex.index()].glob.as_deref()
                        && matches_glob(glob, segment)
                    {
                        state.add_next(nodes, complex);
                    }
                }
                if !patterns.suffixes.is_empty() {
                    state.add_suffix_matches(nodes, segment, &patterns.suffixes);
                }
            }
        }

        // No rule targeted this segment directly: the parent's rights
        // apply to the segment itself and bound whatever lies below.
        if !state.rights.has_local_rule() {
            state.rights.access = state.parent_rights.access;
            state.rights.min_rights &= state.parent_rights.access.rights;
            state.rights.max_rights |= state.parent_rights.access.rights;
        }

        if path.is_some() {
            std::mem::swap(&mut state.current, &mut state.next);
            state.parent_rights = state.rights;
        }
    }

    if recursive {
        state.rights.min_rights.contains(required)
    } else {
        state.rights.access.rights.contains(required)
    }
}
