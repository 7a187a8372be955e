//! Folding rules into a filtered tree

use tracing::debug;

use crate::acl::{Acl, Rights, Segment, SegmentKind};
use crate::error::{AuthzError, Result};
use crate::tree::node::{Access, LimitedRights, Node, NodeId, ROOT_SEQUENCE_NUMBER};
use crate::tree::patterns::reversed_cmp;

/// One step of the previous insertion, kept so the next rule can resume
/// below the deepest node it shares with its predecessor. Rules from one
/// source file usually share long prefixes, so this skips most of the
/// per-rule tree walk.
struct ContextStep {
    segment: Segment,
    node: NodeId,
}

/// Folds the rules relevant to one `(user, repository)` pair into a node
/// arena.
pub(crate) struct TreeBuilder {
    nodes: Vec<Node>,
    context: Vec<ContextStep>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            nodes: vec![Node::root()],
            context: Vec::with_capacity(32),
        }
    }

    /// Build the finalized node arena for `(user, repository)`. Rules that
    /// do not apply to the pair are skipped entirely; if no applicable
    /// rule addresses the root, an implicit deny-all is put there.
    pub fn build(acls: &[Acl], user: Option<&str>, repository: &str) -> Result<Vec<Node>> {
        let mut builder = Self::new();

        let mut relevant = 0usize;
        for acl in acls {
            if let Some(rights) = acl.evaluate(user, repository) {
                relevant += 1;
                builder.insert(acl, rights)?;
            }
        }

        let mut nodes = builder.nodes;
        let root = &mut nodes[NodeId::ROOT.index()];
        if !root.rights.has_local_rule() {
            root.rights.access = Access {
                sequence_number: ROOT_SEQUENCE_NUMBER,
                rights: Rights::empty(),
            };
        }

        let root_access = nodes[NodeId::ROOT.index()].rights.access;
        finalize_up(&mut nodes, NodeId::ROOT, root_access);
        finalize_down(&mut nodes, NodeId::ROOT, LimitedRights::unset());

        debug!(
            user,
            repository,
            rules = relevant,
            nodes = nodes.len(),
            "filtered rule tree built"
        );
        Ok(nodes)
    }

    /// Insert one applicable rule, creating missing nodes along its
    /// segments and recording the rule's access at the final one.
    fn insert(&mut self, acl: &Acl, rights: Rights) -> Result<()> {
        let access = Access {
            sequence_number: acl.sequence_number(),
            rights,
        };
        let rule = acl.rule().segments();

        // Resume below the deepest node shared with the previous rule.
        let mut node = NodeId::ROOT;
        let mut matched = 0;
        for (step, segment) in self.context.iter().zip(rule) {
            if step.segment != *segment {
                break;
            }
            node = step.node;
            matched += 1;
        }
        self.context.truncate(matched);

        for segment in &rule[matched..] {
            let child = self.ensure_child(node, segment);
            self.context.push(ContextStep {
                segment: segment.clone(),
                node: child,
            });
            node = child;
        }

        // One rule section per path: a second access record at the same
        // leaf means the rule source broke that contract.
        let leaf = &mut self.nodes[node.index()];
        if leaf.rights.has_local_rule() {
            return Err(AuthzError::ConflictingRules {
                path: acl.rule().to_string(),
                first: leaf.rights.access.sequence_number,
                second: access.sequence_number,
            });
        }
        leaf.rights.access = access;
        Ok(())
    }

    fn ensure_child(&mut self, parent: NodeId, segment: &Segment) -> NodeId {
        match segment.kind() {
            SegmentKind::Literal => self.ensure_literal(parent, segment),
            SegmentKind::Any => {
                if let Some(id) = self.pattern_slot(parent, |p| p.any) {
                    return id;
                }
                let id = self.alloc(segment);
                self.nodes[parent.index()].patterns_mut().any = Some(id);
                id
            }
            SegmentKind::AnyRecursive => {
                if let Some(id) = self.pattern_slot(parent, |p| p.any_var) {
                    return id;
                }
                let id = self.alloc(segment);
                // The node stays in the match set on every deeper level.
                self.nodes[id.index()].patterns_mut().repeat = true;
                self.nodes[parent.index()].patterns_mut().any_var = Some(id);
                id
            }
            SegmentKind::Prefix | SegmentKind::Suffix => self.ensure_sorted(parent, segment),
            SegmentKind::Fnmatch => self.ensure_complex(parent, segment),
        }
    }

    fn ensure_literal(&mut self, parent: NodeId, segment: &Segment) -> NodeId {
        if let Some(&id) = self.nodes[parent.index()]
            .literal_children
            .get(segment.pattern())
        {
            return id;
        }
        let id = self.alloc(segment);
        self.nodes[parent.index()]
            .literal_children
            .insert(segment.pattern_arc(), id);
        id
    }

    /// Keep prefix children sorted by their fixed text and suffix children
    /// by its byte-reversed form, so lookups can scan them in order.
    fn ensure_sorted(&mut self, parent: NodeId, segment: &Segment) -> NodeId {
        let suffix = segment.kind() == SegmentKind::Suffix;

        let (found, insert_at) = {
            let list = self.nodes[parent.index()]
                .pattern_children
                .as_ref()
                .map(|p| {
                    if suffix {
                        p.suffixes.as_slice()
                    } else {
                        p.prefixes.as_slice()
                    }
                })
                .unwrap_or(&[]);
            let search = list.binary_search_by(|&id| {
                let existing = &*self.nodes[id.index()].segment;
                if suffix {
                    reversed_cmp(existing, segment.pattern())
                } else {
                    existing.cmp(segment.pattern())
                }
            });
            match search {
                Ok(i) => (Some(list[i]), 0),
                Err(i) => (None, i),
            }
        };
        if let Some(id) = found {
            return id;
        }

        let id = self.alloc(segment);
        let patterns = self.nodes[parent.index()].patterns_mut();
        if suffix {
            patterns.suffixes.insert(insert_at, id);
        } else {
            patterns.prefixes.insert(insert_at, id);
        }
        id
    }

    fn ensure_complex(&mut self, parent: NodeId, segment: &Segment) -> NodeId {
        if let Some(patterns) = self.nodes[parent.index()].pattern_children.as_ref() {
            for &id in &patterns.complex {
                if *self.nodes[id.index()].segment == *segment.pattern() {
                    return id;
                }
            }
        }
        let id = self.alloc(segment);
        self.nodes[parent.index()].patterns_mut().complex.push(id);
        id
    }

    fn pattern_slot(
        &self,
        parent: NodeId,
        slot: impl Fn(&super::node::PatternChildren) -> Option<NodeId>,
    ) -> Option<NodeId> {
        self.nodes[parent.index()]
            .pattern_children
            .as_deref()
            .and_then(slot)
    }

    fn alloc(&mut self, segment: &Segment) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes
            .push(Node::new(segment.pattern_arc(), segment.glob_arc()));
        id
    }
}

/// All children of a node, in no particular order.
fn child_ids(node: &Node) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = node.literal_children.values().copied().collect();
    if let Some(patterns) = &node.pattern_children {
        ids.extend(patterns.any);
        ids.extend(patterns.any_var);
        ids.extend_from_slice(&patterns.prefixes);
        ids.extend_from_slice(&patterns.suffixes);
        ids.extend_from_slice(&patterns.complex);
    }
    ids
}

/// Post-order pass: the effective access of a node is its own record or,
/// absent one, the inherited record; each node's min/max bounds start from
/// that and fold in all child bounds. Returns the node's final bounds.
fn finalize_up(nodes: &mut [Node], id: NodeId, inherited: Access) -> (Rights, Rights) {
    let effective = {
        let node = &nodes[id.index()];
        if node.rights.has_local_rule() {
            node.rights.access
        } else {
            inherited
        }
    };

    let mut min_rights = effective.rights;
    let mut max_rights = effective.rights;
    for child in child_ids(&nodes[id.index()]) {
        let (child_min, child_max) = finalize_up(nodes, child, effective);
        min_rights &= child_min;
        max_rights |= child_max;
    }

    let node = &mut nodes[id.index()];
    node.rights.min_rights = min_rights;
    node.rights.max_rights = max_rights;
    (min_rights, max_rights)
}

/// Pre-order pass: a `**` rule applies to every level below the node that
/// holds it, so its bounds are folded into the accumulator and thereby
/// into the whole subtree.
fn finalize_down(nodes: &mut [Node], id: NodeId, mut var_rights: LimitedRights) {
    nodes[id.index()].rights.combine_limits(&var_rights);

    if let Some(var) = nodes[id.index()]
        .pattern_children
        .as_ref()
        .and_then(|p| p.any_var)
    {
        let var_limits = nodes[var.index()].rights;
        var_rights.combine_limits(&var_limits);
    }

    for child in child_ids(&nodes[id.index()]) {
        finalize_down(nodes, child, var_rights);
    }
}
