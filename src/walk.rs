//! Iterative tree traversal.
//!
//! Both walks use an explicit stack, so their stack usage is bounded
//! independently of tree depth. The mutating walk may edit the subtree
//! rooted at the node it is visiting, but not that node's ancestors.

use crate::forest::Forest;
use crate::refs::NodeRef;

/// Controls whether to descend into children during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into the node's children.
    Advance,
    /// Skip the node's children; the post visitor is not invoked for it.
    Skip,
}

/// Pre/post traversal over a subtree.
///
/// `pre` runs when a node is first visited and decides whether to descend;
/// `post` runs after all of the node's children have been visited, and only
/// if `pre` returned [`WalkAction::Advance`].
pub fn walk(
    forest: &Forest,
    root: NodeRef,
    pre: &mut dyn FnMut(&Forest, NodeRef) -> WalkAction,
    post: &mut dyn FnMut(&Forest, NodeRef),
) {
    if pre(forest, root) == WalkAction::Skip {
        return;
    }

    // (node, index of the next child to visit)
    let mut path: Vec<(NodeRef, usize)> = vec![(root, 0)];
    while let Some(&mut (node, ref mut index)) = path.last_mut() {
        if *index < forest.num_children(node) {
            let child = forest.child(node, *index);
            *index += 1;
            if pre(forest, child) == WalkAction::Advance {
                path.push((child, 0));
            }
        } else {
            post(forest, node);
            path.pop();
        }
    }
}

/// Pre-order walk with no post step.
pub fn walk_pre(
    forest: &Forest,
    root: NodeRef,
    pre: &mut dyn FnMut(&Forest, NodeRef) -> WalkAction,
) {
    walk(forest, root, pre, &mut |_, _| {});
}

/// Mutating pre/post traversal.
///
/// Child counts are re-read on every step, so visitors may insert or remove
/// children below the node they were handed.
pub fn walk_mut(
    forest: &mut Forest,
    root: NodeRef,
    pre: &mut dyn FnMut(&mut Forest, NodeRef) -> WalkAction,
    post: &mut dyn FnMut(&mut Forest, NodeRef),
) {
    if pre(forest, root) == WalkAction::Skip {
        return;
    }

    let mut path: Vec<(NodeRef, usize)> = vec![(root, 0)];
    while let Some(&mut (node, ref mut index)) = path.last_mut() {
        if *index < forest.num_children(node) {
            let child = forest.child(node, *index);
            *index += 1;
            if pre(forest, child) == WalkAction::Advance {
                path.push((child, 0));
            }
        } else {
            post(forest, node);
            path.pop();
        }
    }
}
