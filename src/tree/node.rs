//! Tree nodes and their access bookkeeping

use std::collections::HashMap;
use std::sync::Arc;

use glob::Pattern;

use crate::acl::Rights;

/// Marks an access record that no rule has written yet. Inferior to every
/// real sequence number, so any rule overrides it.
pub(crate) const NO_SEQUENCE_NUMBER: i64 = -1;

/// Sequence number of the implicit deny-all record at the repository root.
/// Real rules start at 1 and therefore always win over it.
pub(crate) const ROOT_SEQUENCE_NUMBER: i64 = 0;

/// Access granted by one path rule: the rights plus the rule's position in
/// the source file. When several rules match the same path, the highest
/// sequence number wins.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Access {
    pub sequence_number: i64,
    pub rights: Rights,
}

impl Access {
    pub fn unset() -> Self {
        Self {
            sequence_number: NO_SEQUENCE_NUMBER,
            rights: Rights::empty(),
        }
    }
}

/// A node's own access record plus the bounds on the rights found anywhere
/// in its subtree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LimitedRights {
    /// Rights granted directly at this node, if any rule targets it.
    pub access: Access,
    /// Rights the user holds on every path in this subtree.
    pub min_rights: Rights,
    /// Rights the user holds on at least one path in this subtree.
    pub max_rights: Rights,
}

impl LimitedRights {
    /// The identity of the combine operations: no access record, and
    /// bounds that leave the first combined value unchanged.
    pub fn unset() -> Self {
        Self {
            access: Access::unset(),
            min_rights: Rights::rule_mask(),
            max_rights: Rights::empty(),
        }
    }

    /// Whether a rule wrote an access record here, as opposed to rights
    /// inherited from some parent path.
    pub fn has_local_rule(&self) -> bool {
        self.access.sequence_number != NO_SEQUENCE_NUMBER
    }

    /// Keep the access record defined by the later rule.
    pub fn combine_access(&mut self, other: &LimitedRights) {
        if self.access.sequence_number < other.access.sequence_number {
            self.access = other.access;
        }
    }

    /// Widen the best case and narrow the worst case by `other`.
    pub fn combine_limits(&mut self, other: &LimitedRights) {
        self.max_rights |= other.max_rights;
        self.min_rights &= other.min_rights;
    }
}

/// Index of a node in its tree's arena.
///
/// All nodes of one filtered tree live in a single `Vec<Node>`; children
/// are stored as indices into it. Dropping the vector releases the whole
/// tree at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Children that match by pattern rather than by literal text. Kept out of
/// [`Node`] so pattern presence is a single check.
#[derive(Debug, Default)]
pub(crate) struct PatternChildren {
    /// The `*` child, if any.
    pub any: Option<NodeId>,
    /// The `**` child, if any.
    pub any_var: Option<NodeId>,
    /// `text*` children, sorted by their fixed prefix.
    pub prefixes: Vec<NodeId>,
    /// `*text` children, sorted by the byte-reversed fixed suffix.
    pub suffixes: Vec<NodeId>,
    /// General glob children, unordered.
    pub complex: Vec<NodeId>,
    /// This node itself is a `**` segment and stays in the match set on
    /// every deeper level.
    pub repeat: bool,
}

/// One segment-labelled node of the filtered rule tree.
#[derive(Debug)]
pub(crate) struct Node {
    /// The rule segment this node was created for. For suffix patterns
    /// this is the fixed part in source order, not reversed.
    pub segment: Arc<str>,
    pub rights: LimitedRights,
    pub literal_children: HashMap<Arc<str>, NodeId>,
    pub pattern_children: Option<Box<PatternChildren>>,
    /// Compiled matcher, present only on general glob nodes.
    pub glob: Option<Arc<Pattern>>,
}

impl Node {
    pub fn new(segment: Arc<str>, glob: Option<Arc<Pattern>>) -> Self {
        Self {
            segment,
            rights: LimitedRights::unset(),
            literal_children: HashMap::new(),
            pattern_children: None,
            glob,
        }
    }

    pub fn root() -> Self {
        Self::new(Arc::from(""), None)
    }

    pub fn patterns_mut(&mut self) -> &mut PatternChildren {
        self.pattern_children.get_or_insert_default()
    }
}
