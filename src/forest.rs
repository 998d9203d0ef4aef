//! Forest: arena-based mutable tree storage.
//!
//! All nodes are stored in a `PrimaryMap` owned by `Forest`; a `NodeRef` is
//! a 4-byte index into it. Parent links are plain back-references, so the
//! ownership graph is acyclic by construction. Detached nodes stay in the
//! arena until the forest is dropped, and dropping the forest frees every
//! node without recursing, whatever the tree depth.

use cranelift_entity::PrimaryMap;
use smallvec::SmallVec;
use thiserror::Error;

use crate::location::Location;
use crate::refs::NodeRef;
use crate::symtab::SymbolTable;
use crate::token::{flag, Token, ERROR, ERROR_AST, ERROR_MSG, LIFT};

// ============================================================================
// Marker flags
// ============================================================================

/// Upward summary bits: does this subtree contain an `Error` / a `Lift`?
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MarkerFlags(u8);

const MARKER_ERROR: u8 = 1 << 0;
const MARKER_LIFT: u8 = 1 << 1;

impl MarkerFlags {
    pub fn contains_error(self) -> bool {
        self.0 & MARKER_ERROR != 0
    }

    pub fn contains_lift(self) -> bool {
        self.0 & MARKER_LIFT != 0
    }

    fn set(&mut self, bit: u8) {
        self.0 |= bit;
    }

    fn assign(&mut self, bit: u8, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    fn get(self, bit: u8) -> bool {
        self.0 & bit != 0
    }
}

// ============================================================================
// Node data
// ============================================================================

/// Data for a single tree node in the arena.
pub struct NodeData {
    pub kind: Token,
    pub location: Location,
    pub(crate) children: SmallVec<[NodeRef; 4]>,
    pub(crate) parent: Option<NodeRef>,
    pub(crate) symtab: Option<SymbolTable>,
    pub(crate) markers: MarkerFlags,
}

/// Errors from tree and scope operations.
///
/// These report misuse of the engine by a pass definition, not problems in
/// the program being rewritten; those are `Error` nodes in the tree.
#[derive(Debug, Error)]
pub enum ForestError {
    #[error("node {0} is not a child of {1}")]
    NotAChild(NodeRef, NodeRef),
    #[error("node {0} has no enclosing scope")]
    NoEnclosingScope(NodeRef),
    #[error("node {0} has no top-level scope for fresh names")]
    NoTopScope(NodeRef),
    #[error("lifted nodes with no destination")]
    LiftWithoutDestination,
}

// ============================================================================
// Forest
// ============================================================================

/// Arena-based mutable tree storage.
///
/// Owns every node and provides methods for creating, querying, and
/// mutating them. Marker summaries are maintained across mutations.
pub struct Forest {
    nodes: PrimaryMap<NodeRef, NodeData>,
}

impl Forest {
    /// Create a new empty forest.
    pub fn new() -> Self {
        Self {
            nodes: PrimaryMap::new(),
        }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create a detached node with no location.
    pub fn node(&mut self, kind: Token) -> NodeRef {
        self.node_at(kind, Location::default())
    }

    /// Create a detached node at the given location.
    ///
    /// Kinds with the `SYMTAB` flag get an empty symbol table.
    pub fn node_at(&mut self, kind: Token, location: Location) -> NodeRef {
        let symtab = kind.has(flag::SYMTAB).then(SymbolTable::default);
        self.nodes.push(NodeData {
            kind,
            location,
            children: SmallVec::new(),
            parent: None,
            symtab,
            markers: MarkerFlags::default(),
        })
    }

    /// Create a detached node whose location spans a node range, from the
    /// first node's location to the last's.
    pub fn node_spanning(&mut self, kind: Token, range: &[NodeRef]) -> NodeRef {
        let location = match (range.first(), range.last()) {
            (Some(&first), Some(&last)) => self.nodes[first]
                .location
                .union(&self.nodes[last].location),
            _ => Location::default(),
        };
        self.node_at(kind, location)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Get immutable reference to node data.
    pub fn get(&self, n: NodeRef) -> &NodeData {
        &self.nodes[n]
    }

    pub(crate) fn nodes_mut(&mut self, n: NodeRef) -> &mut NodeData {
        &mut self.nodes[n]
    }

    pub fn kind(&self, n: NodeRef) -> Token {
        self.nodes[n].kind
    }

    pub fn location(&self, n: NodeRef) -> &Location {
        &self.nodes[n].location
    }

    pub fn parent(&self, n: NodeRef) -> Option<NodeRef> {
        self.nodes[n].parent
    }

    pub fn children(&self, n: NodeRef) -> &[NodeRef] {
        &self.nodes[n].children
    }

    pub fn num_children(&self, n: NodeRef) -> usize {
        self.nodes[n].children.len()
    }

    pub fn child(&self, n: NodeRef, index: usize) -> NodeRef {
        self.nodes[n].children[index]
    }

    pub fn front(&self, n: NodeRef) -> Option<NodeRef> {
        self.nodes[n].children.first().copied()
    }

    pub fn back(&self, n: NodeRef) -> Option<NodeRef> {
        self.nodes[n].children.last().copied()
    }

    /// Position of `child` in `parent`'s child list.
    pub fn find(&self, parent: NodeRef, child: NodeRef) -> Option<usize> {
        self.nodes[parent].children.iter().position(|&c| c == child)
    }

    pub fn contains_error(&self, n: NodeRef) -> bool {
        self.nodes[n].markers.contains_error()
    }

    pub fn contains_lift(&self, n: NodeRef) -> bool {
        self.nodes[n].markers.contains_lift()
    }

    /// Nearest ancestor whose kind is in `kinds`, starting from the parent.
    pub fn ancestor_with_kind(&self, n: NodeRef, kinds: &[Token]) -> Option<NodeRef> {
        let mut curr = self.nodes[n].parent;
        while let Some(p) = curr {
            if self.nodes[p].kind.in_list(kinds) {
                return Some(p);
            }
            curr = self.nodes[p].parent;
        }
        None
    }

    // ========================================================================
    // Locations
    // ========================================================================

    /// Set the location of `n` and every descendant that has no source yet.
    pub fn set_location(&mut self, n: NodeRef, location: &Location) {
        let mut work: Vec<NodeRef> = vec![n];
        while let Some(curr) = work.pop() {
            let data = &mut self.nodes[curr];
            if data.location.source.is_none() {
                data.location = location.clone();
            }
            work.extend_from_slice(&self.nodes[curr].children);
        }
    }

    /// Extend the location of `n` to cover `location` as well.
    pub fn extend_location(&mut self, n: NodeRef, location: &Location) {
        let merged = self.nodes[n].location.union(location);
        self.nodes[n].location = merged;
    }

    // ========================================================================
    // Child mutation
    // ========================================================================

    /// Append a child, reparenting it to `parent`.
    pub fn push_back(&mut self, parent: NodeRef, child: NodeRef) {
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        self.propagate_markers(parent, child);
    }

    /// Append children in order, reparenting each.
    pub fn push_back_all(&mut self, parent: NodeRef, children: &[NodeRef]) {
        for &child in children {
            self.push_back(parent, child);
        }
    }

    /// Prepend a child, reparenting it to `parent`.
    pub fn push_front(&mut self, parent: NodeRef, child: NodeRef) {
        self.nodes[parent].children.insert(0, child);
        self.nodes[child].parent = Some(parent);
        self.propagate_markers(parent, child);
    }

    /// Append a child without reparenting it.
    ///
    /// For building transient views; the child's authoritative parent path
    /// is unchanged and no marker bits move.
    pub fn push_back_ephemeral(&mut self, parent: NodeRef, child: NodeRef) {
        self.nodes[parent].children.push(child);
    }

    /// Remove and return the last child, clearing its parent link if this
    /// node still holds it.
    pub fn pop_back(&mut self, parent: NodeRef) -> Option<NodeRef> {
        let child = self.nodes[parent].children.pop()?;
        if self.nodes[child].parent == Some(parent) {
            self.nodes[child].parent = None;
        }
        self.recompute_markers(parent);
        Some(child)
    }

    /// Insert a child at `index`, reparenting it.
    pub fn insert(&mut self, parent: NodeRef, index: usize, child: NodeRef) {
        self.nodes[parent].children.insert(index, child);
        self.nodes[child].parent = Some(parent);
        self.propagate_markers(parent, child);
    }

    /// Insert children at `index` in order, reparenting each.
    pub fn insert_all(&mut self, parent: NodeRef, index: usize, children: &[NodeRef]) {
        for (offset, &child) in children.iter().enumerate() {
            self.insert(parent, index + offset, child);
        }
    }

    /// Remove the children in `range` from the child list.
    ///
    /// A removed child's parent link is cleared only if it still points at
    /// `parent`; children that were already reparented elsewhere keep their
    /// new parent.
    pub fn erase(&mut self, parent: NodeRef, range: std::ops::Range<usize>) {
        let removed: SmallVec<[NodeRef; 4]> =
            self.nodes[parent].children.drain(range).collect();
        for child in removed {
            if self.nodes[child].parent == Some(parent) {
                self.nodes[child].parent = None;
            }
        }
        self.recompute_markers(parent);
    }

    /// Replace the child at `index` with `new`, or erase it when `new` is
    /// `None`.
    pub fn replace_at(
        &mut self,
        parent: NodeRef,
        index: usize,
        new: Option<NodeRef>,
    ) -> Result<(), ForestError> {
        match new {
            Some(new) => {
                let old = self.nodes[parent].children[index];
                if self.nodes[old].parent == Some(parent) {
                    self.nodes[old].parent = None;
                }
                self.nodes[parent].children[index] = new;
                self.nodes[new].parent = Some(parent);
                self.propagate_markers(parent, new);
                self.recompute_markers(parent);
            }
            None => self.erase(parent, index..index + 1),
        }
        Ok(())
    }

    /// Replace the child `old` with `new`, or erase it when `new` is `None`.
    pub fn replace(
        &mut self,
        parent: NodeRef,
        old: NodeRef,
        new: Option<NodeRef>,
    ) -> Result<(), ForestError> {
        let index = self
            .find(parent, old)
            .ok_or(ForestError::NotAChild(old, parent))?;
        self.replace_at(parent, index, new)
    }

    // ========================================================================
    // Marker maintenance
    // ========================================================================

    /// Marker bit, if any, that `n` contributes to its ancestors.
    fn contributed_bits(&self, n: NodeRef) -> u8 {
        let data = &self.nodes[n];
        let mut bits = 0;
        if data.kind == *ERROR || data.markers.contains_error() {
            bits |= MARKER_ERROR;
        }
        if data.kind == *LIFT || data.markers.contains_lift() {
            bits |= MARKER_LIFT;
        }
        bits
    }

    /// After attaching `child` under `parent`: push the child's marker bits
    /// up the ancestor path until an ancestor already has them.
    fn propagate_markers(&mut self, parent: NodeRef, child: NodeRef) {
        let bits = self.contributed_bits(child);
        for bit in [MARKER_ERROR, MARKER_LIFT] {
            if bits & bit == 0 {
                continue;
            }
            let mut curr = Some(parent);
            while let Some(n) = curr {
                if self.nodes[n].markers.get(bit) {
                    break;
                }
                self.nodes[n].markers.set(bit);
                curr = self.nodes[n].parent;
            }
        }
    }

    /// After detaching children from `parent`: rebuild each marker bit from
    /// the remaining children, walking up only while bits keep changing.
    fn recompute_markers(&mut self, parent: NodeRef) {
        let mut curr = Some(parent);
        while let Some(n) = curr {
            let mut changed = false;
            for bit in [MARKER_ERROR, MARKER_LIFT] {
                let actual = self.nodes[n]
                    .children
                    .iter()
                    .any(|&c| self.contributed_bits(c) & bit != 0);
                if self.nodes[n].markers.get(bit) != actual {
                    self.nodes[n].markers.assign(bit, actual);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
            curr = self.nodes[n].parent;
        }
    }

    // ========================================================================
    // Ordering relations
    // ========================================================================

    /// Walk `a` and `b` up to equal depth, then in lockstep until their
    /// parents match. Panics if the nodes are not in the same tree.
    fn same_parent(&self, a: NodeRef, b: NodeRef) -> (NodeRef, NodeRef) {
        let depth = |mut n: NodeRef| {
            let mut d = 0usize;
            while let Some(p) = self.nodes[n].parent {
                d += 1;
                n = p;
            }
            d
        };

        let (mut p, mut q) = (a, b);
        let (mut dp, mut dq) = (depth(a), depth(b));
        let up = |n: NodeRef| {
            self.nodes[n]
                .parent
                .expect("same_parent: nodes are not in the same tree")
        };

        while dp > dq {
            p = up(p);
            dp -= 1;
        }
        while dq > dp {
            q = up(q);
            dq -= 1;
        }
        while self.nodes[p].parent != self.nodes[q].parent {
            p = up(p);
            q = up(q);
        }
        (p, q)
    }

    /// Whether `a` is strictly to the left of `b` in a pre-order walk, with
    /// neither dominating the other.
    pub fn precedes(&self, a: NodeRef, b: NodeRef) -> bool {
        if a == b {
            return false;
        }
        let (p, q) = self.same_parent(a, b);
        // Same node after depth adjustment: one dominates the other.
        if p == q {
            return false;
        }
        let parent = self.nodes[p]
            .parent
            .expect("precedes: nodes are not in the same tree");
        self.find(parent, p) < self.find(parent, q)
    }

    /// The node that is `a`, or `b`, or their lowest common ancestor; when
    /// one dominates the other, the dominator is returned.
    pub fn common_parent(&self, a: NodeRef, b: NodeRef) -> NodeRef {
        if a == b {
            return a;
        }
        let (p, q) = self.same_parent(a, b);
        if p == q {
            return p;
        }
        self.nodes[p]
            .parent
            .expect("common_parent: nodes are not in the same tree")
    }

    // ========================================================================
    // Clone and structural equality
    // ========================================================================

    /// Deep copy of a subtree, preserving kinds and locations.
    ///
    /// Symbol-table contents are not cloned; scope-bearing kinds get a fresh
    /// empty table. Iterative, so deep trees cannot overflow the stack.
    pub fn clone_subtree(&mut self, n: NodeRef) -> NodeRef {
        let root = {
            let data = &self.nodes[n];
            (data.kind, data.location.clone())
        };
        let clone_root = self.node_at(root.0, root.1);

        let mut work: Vec<(NodeRef, NodeRef)> = vec![(n, clone_root)];
        while let Some((src, dst)) = work.pop() {
            let kids: SmallVec<[NodeRef; 4]> = self.nodes[src].children.clone();
            for child in kids {
                let (kind, location) = {
                    let data = &self.nodes[child];
                    (data.kind, data.location.clone())
                };
                let child_clone = self.node_at(kind, location);
                self.push_back(dst, child_clone);
                work.push((child, child_clone));
            }
        }
        clone_root
    }

    /// Structural equality: same kind, same location view for kinds with the
    /// `PRINT` flag, and child-wise recursive equality. Symbol tables are
    /// ignored.
    pub fn equals(&self, a: NodeRef, b: NodeRef) -> bool {
        let mut work: Vec<(NodeRef, NodeRef)> = vec![(a, b)];
        while let Some((a, b)) = work.pop() {
            let (da, db) = (&self.nodes[a], &self.nodes[b]);
            if da.kind != db.kind {
                return false;
            }
            if da.kind.has(flag::PRINT) && da.location != db.location {
                return false;
            }
            if da.children.len() != db.children.len() {
                return false;
            }
            work.extend(da.children.iter().copied().zip(db.children.iter().copied()));
        }
        true
    }

    // ========================================================================
    // Error nodes
    // ========================================================================

    /// Build `Error(ErrorMsg, ErrorAst(ast))`, the shape diagnostics take in
    /// the tree.
    pub fn error(&mut self, msg: &str, ast: Option<NodeRef>) -> NodeRef {
        let err = self.node(*ERROR);
        let msg_node = self.node_at(*ERROR_MSG, Location::synthetic(msg));
        self.push_back(err, msg_node);
        if let Some(ast) = ast {
            let holder = self.node(*ERROR_AST);
            self.push_back(holder, ast);
            self.push_back(err, holder);
        }
        err
    }

    /// Collect every `Error` node not contained in another `Error`, in
    /// pre-order.
    pub fn get_errors(&self, root: NodeRef) -> Vec<NodeRef> {
        let mut errors = Vec::new();
        let mut work: Vec<NodeRef> = vec![root];
        while let Some(n) = work.pop() {
            let data = &self.nodes[n];
            if data.kind == *ERROR {
                errors.push(n);
                continue;
            }
            if !data.markers.contains_error() {
                continue;
            }
            work.extend(data.children.iter().rev());
        }
        errors
    }

    // ========================================================================
    // Builder
    // ========================================================================

    /// Start building a node of the given kind.
    pub fn build(&mut self, kind: Token) -> NodeBuilder<'_> {
        let node = self.node(kind);
        NodeBuilder { forest: self, node }
    }

    /// Start building a node of the given kind at a location.
    pub fn build_at(&mut self, kind: Token, location: Location) -> NodeBuilder<'_> {
        let node = self.node_at(kind, location);
        NodeBuilder { forest: self, node }
    }
}

impl Default for Forest {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder attaching children to a freshly created node.
pub struct NodeBuilder<'f> {
    forest: &'f mut Forest,
    node: NodeRef,
}

impl NodeBuilder<'_> {
    /// Append an existing node as a child.
    pub fn child(self, child: NodeRef) -> Self {
        self.forest.push_back(self.node, child);
        self
    }

    /// Append a new childless node of the given kind.
    pub fn leaf(self, kind: Token) -> Self {
        let child = self.forest.node(kind);
        self.child(child)
    }

    /// Append a new childless node of the given kind at a location.
    pub fn leaf_at(self, kind: Token, location: Location) -> Self {
        let child = self.forest.node_at(kind, location);
        self.child(child)
    }

    /// Append existing nodes as children, in order.
    pub fn children(self, children: impl IntoIterator<Item = NodeRef>) -> Self {
        let mut this = self;
        for child in children {
            this = this.child(child);
        }
        this
    }

    pub fn finish(self) -> NodeRef {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{GROUP, TOP};

    fn leaf_kind() -> Token {
        Token::new("Leaf")
    }

    #[test]
    fn push_and_parent_tracking() {
        let mut f = Forest::new();
        let parent = f.node(*GROUP);
        let a = f.node(leaf_kind());
        let b = f.node(leaf_kind());

        assert_eq!(f.parent(a), None);
        f.push_back(parent, a);
        f.push_back(parent, b);
        assert_eq!(f.parent(a), Some(parent));
        assert_eq!(f.children(parent), &[a, b]);
    }

    #[test]
    fn insert_keeps_order() {
        let mut f = Forest::new();
        let parent = f.node(*GROUP);
        let a = f.node(leaf_kind());
        let c = f.node(leaf_kind());
        f.push_back(parent, a);
        f.push_back(parent, c);

        let b = f.node(leaf_kind());
        f.insert(parent, 1, b);
        assert_eq!(f.children(parent), &[a, b, c]);
        assert_eq!(f.parent(b), Some(parent));
    }

    #[test]
    fn erase_clears_parent_only_when_owned() {
        let mut f = Forest::new();
        let parent = f.node(*GROUP);
        let other = f.node(*GROUP);
        let a = f.node(leaf_kind());
        let b = f.node(leaf_kind());
        f.push_back(parent, a);
        f.push_back(parent, b);

        // `a` was moved elsewhere; erasing it from `parent` must not steal
        // it back from `other`.
        f.push_back(other, a);
        f.erase(parent, 0..2);
        assert_eq!(f.parent(a), Some(other));
        assert_eq!(f.parent(b), None);
        assert!(f.children(parent).is_empty());
    }

    #[test]
    fn ephemeral_push_does_not_reparent() {
        let mut f = Forest::new();
        let owner = f.node(*GROUP);
        let view = f.node(*GROUP);
        let a = f.node(leaf_kind());
        f.push_back(owner, a);

        f.push_back_ephemeral(view, a);
        assert_eq!(f.parent(a), Some(owner));
        assert_eq!(f.children(view), &[a]);
    }

    #[test]
    fn pop_back_returns_and_detaches() {
        let mut f = Forest::new();
        let parent = f.node(*GROUP);
        let a = f.node(leaf_kind());
        f.push_back(parent, a);

        assert_eq!(f.pop_back(parent), Some(a));
        assert_eq!(f.parent(a), None);
        assert_eq!(f.pop_back(parent), None);
    }

    #[test]
    fn replace_swaps_in_place() {
        let mut f = Forest::new();
        let parent = f.node(*GROUP);
        let a = f.node(leaf_kind());
        let b = f.node(leaf_kind());
        f.push_back(parent, a);

        f.replace(parent, a, Some(b)).unwrap();
        assert_eq!(f.children(parent), &[b]);
        assert_eq!(f.parent(a), None);
        assert_eq!(f.parent(b), Some(parent));

        f.replace(parent, b, None).unwrap();
        assert!(f.children(parent).is_empty());

        let stranger = f.node(leaf_kind());
        assert!(f.replace(parent, stranger, None).is_err());
    }

    #[test]
    fn error_markers_propagate_on_attach() {
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let file = f.node(*GROUP);
        let group = f.node(*GROUP);
        f.push_back(top, file);
        f.push_back(file, group);

        let err = f.error("bad input", None);
        f.push_back(group, err);

        assert!(f.contains_error(group));
        assert!(f.contains_error(file));
        assert!(f.contains_error(top));
        // The error node itself only summarises its own subtree.
        assert!(!f.contains_error(err));
    }

    #[test]
    fn error_markers_clear_on_detach() {
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let group = f.node(*GROUP);
        f.push_back(top, group);
        let err = f.error("oops", None);
        f.push_back(group, err);
        assert!(f.contains_error(top));

        let pos = f.find(group, err).unwrap();
        f.erase(group, pos..pos + 1);
        assert!(!f.contains_error(group));
        assert!(!f.contains_error(top));
    }

    #[test]
    fn lift_markers_track_independently() {
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let group = f.node(*GROUP);
        f.push_back(top, group);

        let lift = f.node(*LIFT);
        let err = f.error("both", None);
        f.push_back(group, lift);
        f.push_back(group, err);

        assert!(f.contains_lift(top));
        assert!(f.contains_error(top));

        let pos = f.find(group, lift).unwrap();
        f.erase(group, pos..pos + 1);
        assert!(!f.contains_lift(top));
        assert!(f.contains_error(top));
    }

    #[test]
    fn precedes_is_strict_left_of() {
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let left = f.node(*GROUP);
        let right = f.node(*GROUP);
        let a = f.node(leaf_kind());
        let b = f.node(leaf_kind());
        f.push_back(top, left);
        f.push_back(top, right);
        f.push_back(left, a);
        f.push_back(right, b);

        assert!(f.precedes(a, b));
        assert!(!f.precedes(b, a));
        assert!(!f.precedes(a, a));
        // Domination is not precedence in either direction.
        assert!(!f.precedes(left, a));
        assert!(!f.precedes(a, left));
    }

    #[test]
    fn common_parent_prefers_dominator() {
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let left = f.node(*GROUP);
        let right = f.node(*GROUP);
        let a = f.node(leaf_kind());
        let b = f.node(leaf_kind());
        f.push_back(top, left);
        f.push_back(top, right);
        f.push_back(left, a);
        f.push_back(right, b);

        assert_eq!(f.common_parent(a, a), a);
        assert_eq!(f.common_parent(left, a), left);
        assert_eq!(f.common_parent(a, left), left);
        assert_eq!(f.common_parent(a, b), top);
    }

    #[test]
    fn clone_is_structurally_equal() {
        let mut f = Forest::new();
        let leaf = leaf_kind();
        let a = f.node(leaf);
        let b = f.node(leaf);
        let group = f.build(*GROUP).child(a).child(b).finish();
        let top = f.build(*TOP).child(group).finish();

        let copy = f.clone_subtree(top);
        assert!(f.equals(top, copy));
        assert_ne!(top, copy);
        // Independent: mutating the copy leaves the original alone.
        let copy_group = f.child(copy, 0);
        f.erase(copy_group, 0..1);
        assert!(!f.equals(top, copy));
        assert_eq!(f.num_children(group), 2);
    }

    #[test]
    fn equals_checks_print_locations_only() {
        let mut f = Forest::new();
        let plain = Token::new("Plain");
        let printed = Token::with_flags("Name", flag::PRINT);

        let a = f.node_at(plain, Location::synthetic("one"));
        let b = f.node_at(plain, Location::synthetic("two"));
        assert!(f.equals(a, b));

        let c = f.node_at(printed, Location::synthetic("one"));
        let d = f.node_at(printed, Location::synthetic("two"));
        let e = f.node_at(printed, Location::synthetic("one"));
        assert!(!f.equals(c, d));
        assert!(f.equals(c, e));
    }

    #[test]
    fn get_errors_returns_outermost_only() {
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let group = f.node(*GROUP);
        f.push_back(top, group);

        let inner = f.error("inner", None);
        let holder = f.node(*GROUP);
        f.push_back(holder, inner);
        let outer = f.error("outer", Some(holder));
        f.push_back(group, outer);

        let plain = f.error("plain", None);
        f.push_back(group, plain);

        let errors = f.get_errors(top);
        assert_eq!(errors, vec![outer, plain]);
    }

    #[test]
    fn spanning_node_covers_range() {
        let mut f = Forest::new();
        let src = crate::location::SourceDef::synthetic("a b c");
        let a = f.node_at(leaf_kind(), Location::new(src.clone(), crate::location::Span::new(0, 1)));
        let c = f.node_at(leaf_kind(), Location::new(src, crate::location::Span::new(4, 5)));
        let span = f.node_spanning(*GROUP, &[a, c]);
        assert_eq!(f.location(span).view(), "a b c");
    }

    #[test]
    fn set_location_skips_children_with_sources() {
        let mut f = Forest::new();
        let with_src = f.node_at(leaf_kind(), Location::synthetic("keep"));
        let without = f.node(leaf_kind());
        let group = f.build(*GROUP).child(with_src).child(without).finish();

        let loc = Location::synthetic("span");
        f.set_location(group, &loc);
        assert_eq!(f.location(group).view(), "span");
        assert_eq!(f.location(with_src).view(), "keep");
        assert_eq!(f.location(without).view(), "span");
    }
}
