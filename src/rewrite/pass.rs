//! Rewrite rules and the pass runner.
//!
//! A pass holds an ordered rule list and direction flags. Running a pass
//! sweeps the tree, applying the first matching rule at each cursor
//! position, then resolves `Lift` markers, and repeats until a sweep makes
//! no changes (or once, with [`dir::ONCE`]).

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::forest::{Forest, ForestError};
use crate::location::Location;
use crate::refs::NodeRef;
use crate::rewrite::pattern::{Cursor, Match, Pattern};
use crate::token::{Token, ERROR, LIFT, NO_CHANGE, SEQ};

/// Traversal direction flags.
pub mod dir {
    pub type Flag = u32;

    /// Apply rules to children before their parent.
    pub const BOTTOMUP: Flag = 1 << 0;
    /// Recurse into children from their parent.
    pub const TOPDOWN: Flag = 1 << 1;
    /// Run a single sweep instead of iterating to a fixed point.
    pub const ONCE: Flag = 1 << 2;
}

/// Action run when a rule's pattern matches. Returning `None` deletes the
/// matched range; see [`Pass`] for how the returned kind is dispatched.
pub type Effect = Rc<dyn Fn(&mut Forest, &Match) -> Option<NodeRef>>;

/// A rewrite rule: a pattern plus the effect producing its replacement.
#[derive(Clone)]
pub struct Rule {
    pattern: Pattern,
    effect: Effect,
}

impl Rule {
    pub fn new(
        pattern: Pattern,
        effect: impl Fn(&mut Forest, &Match) -> Option<NodeRef> + 'static,
    ) -> Self {
        Self {
            pattern,
            effect: Rc::new(effect),
        }
    }
}

type HookFn = Box<dyn Fn(&mut Forest, NodeRef) -> usize>;

/// Results of running a pass to completion.
#[derive(Debug)]
pub struct PassReport {
    /// Number of sweeps performed.
    pub iterations: usize,
    /// Total nodes inserted by fired rules.
    pub changes: usize,
}

/// A unit of transformation: direction flags, ordered rules, and optional
/// per-kind and per-run callbacks.
pub struct Pass {
    direction: dir::Flag,
    rules: Vec<Rule>,
    pre: BTreeMap<Token, HookFn>,
    post: BTreeMap<Token, HookFn>,
    pre_once: Option<HookFn>,
    post_once: Option<HookFn>,
}

impl Pass {
    pub fn new(direction: dir::Flag) -> Self {
        Self {
            direction,
            rules: Vec::new(),
            pre: BTreeMap::new(),
            post: BTreeMap::new(),
            pre_once: None,
            post_once: None,
        }
    }

    /// Append a rule; rule order is significant, first match wins.
    pub fn rule(
        mut self,
        pattern: Pattern,
        effect: impl Fn(&mut Forest, &Match) -> Option<NodeRef> + 'static,
    ) -> Self {
        self.rules.push(Rule::new(pattern, effect));
        self
    }

    pub fn add_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Callback invoked when a node of `kind` is visited, before its
    /// children.
    pub fn pre(mut self, kind: Token, f: impl Fn(&mut Forest, NodeRef) -> usize + 'static) -> Self {
        self.pre.insert(kind, Box::new(f));
        self
    }

    /// Callback invoked when a node of `kind` is visited, after its
    /// children.
    pub fn post(
        mut self,
        kind: Token,
        f: impl Fn(&mut Forest, NodeRef) -> usize + 'static,
    ) -> Self {
        self.post.insert(kind, Box::new(f));
        self
    }

    /// Callback invoked on the root before iteration starts.
    pub fn pre_once(mut self, f: impl Fn(&mut Forest, NodeRef) -> usize + 'static) -> Self {
        self.pre_once = Some(Box::new(f));
        self
    }

    /// Callback invoked on the root after iteration finishes.
    pub fn post_once(mut self, f: impl Fn(&mut Forest, NodeRef) -> usize + 'static) -> Self {
        self.post_once = Some(Box::new(f));
        self
    }

    fn flag(&self, f: dir::Flag) -> bool {
        self.direction & f != 0
    }

    /// Run the pass over the tree rooted at `root` until a sweep produces
    /// no changes, or for a single sweep with [`dir::ONCE`]. Each sweep
    /// ends with the lift phase; lifted nodes still unresolved at the root
    /// are fatal.
    pub fn run(&self, forest: &mut Forest, root: NodeRef) -> Result<PassReport, ForestError> {
        let mut changes_sum = 0;
        let mut count = 0;

        if let Some(f) = &self.pre_once {
            changes_sum += f(forest, root);
        }

        let mut m = Match::new();
        loop {
            let changes = self.apply(forest, &mut m, root);

            let residue = self.lift(forest, root);
            if !residue.is_empty() {
                return Err(ForestError::LiftWithoutDestination);
            }

            changes_sum += changes;
            count += 1;
            trace!(sweep = count, changes, "pass sweep");

            if self.flag(dir::ONCE) || changes == 0 {
                break;
            }
        }

        if let Some(f) = &self.post_once {
            changes_sum += f(forest, root);
        }

        debug!(
            iterations = count,
            changes = changes_sum,
            "pass reached fixed point"
        );
        Ok(PassReport {
            iterations: count,
            changes: changes_sum,
        })
    }

    /// Attempt the rules at position `it` of `node`'s children. Returns the
    /// cursor position to resume at and `Some(inserted)` when a rule fired.
    fn step(
        &self,
        forest: &mut Forest,
        m: &mut Match,
        node: NodeRef,
        it: usize,
    ) -> (usize, Option<usize>) {
        for rule in &self.rules {
            let mut cur = Cursor::at(forest, node, it);
            m.reset();
            if !rule.pattern.matches(forest, &mut cur, m) {
                continue;
            }
            let matched_end = cur.pos;

            let replace = (rule.effect)(forest, m);
            if let Some(r) = replace {
                // The rule fired but declined to change anything: treat as a
                // non-match and try the next rule.
                if forest.kind(r) == *NO_CHANGE {
                    continue;
                }
            }

            // Replacements take over the span of the matched range.
            let loc = if it < matched_end {
                let mut loc = forest.location(forest.child(node, it)).clone();
                for i in it + 1..matched_end {
                    loc = loc.union(forest.location(forest.child(node, i)));
                }
                loc
            } else {
                Location::default()
            };

            forest.erase(node, it..matched_end);

            let replaced = match replace {
                None => 0,
                Some(r) if forest.kind(r) == *SEQ => {
                    // Unpack the sequence in place of the match.
                    let kids: Vec<NodeRef> = forest.children(r).to_vec();
                    forest.erase(r, 0..kids.len());
                    for &k in &kids {
                        forest.set_location(k, &loc);
                    }
                    forest.insert_all(node, it, &kids);
                    kids.len()
                }
                Some(r) => {
                    forest.set_location(r, &loc);
                    forest.insert(node, it, r);
                    1
                }
            };

            return (it, Some(replaced));
        }

        (it, None)
    }

    /// Per-node algorithm: sweep the rules over `node`'s children, with
    /// direction-dependent recursion and cursor movement.
    fn apply(&self, forest: &mut Forest, m: &mut Match, node: NodeRef) -> usize {
        // Error and Lift subtrees are inert islands.
        if forest.kind(node).in_list(&[*ERROR, *LIFT]) {
            return 0;
        }

        let mut changes = 0;

        if let Some(f) = self.pre.get(&forest.kind(node)) {
            changes += f(forest, node);
        }

        let mut it = 0;
        while it < forest.num_children(node) {
            let child = forest.child(node, it);
            if forest.kind(child).in_list(&[*ERROR, *LIFT]) {
                it += 1;
                continue;
            }

            if self.flag(dir::BOTTOMUP) {
                changes += self.apply(forest, m, child);
            }

            let (new_it, replaced) = self.step(forest, m, node, it);
            it = new_it;
            if let Some(n) = replaced {
                changes += n;
            }

            if self.flag(dir::ONCE) {
                match replaced {
                    // Matched range deleted: the next sibling has shifted
                    // into this position, re-examine it without recursing.
                    Some(0) => {}
                    Some(n) => {
                        if self.flag(dir::TOPDOWN) {
                            for i in 0..n {
                                let inserted = forest.child(node, it + i);
                                changes += self.apply(forest, m, inserted);
                            }
                        }
                        it += n;
                    }
                    None => {
                        if self.flag(dir::TOPDOWN) {
                            changes += self.apply(forest, m, forest.child(node, it));
                        }
                        it += 1;
                    }
                }
            } else if replaced.is_some() {
                // A rule fired: re-examine this node from its begin.
                it = 0;
            } else {
                if self.flag(dir::TOPDOWN) {
                    changes += self.apply(forest, m, forest.child(node, it));
                }
                it += 1;
            }
        }

        if let Some(f) = self.post.get(&forest.kind(node)) {
            changes += f(forest, node);
        }

        changes
    }

    /// Lift phase, bottom-up: remove `Lift` children, splice each lifted
    /// payload into the nearest ancestor whose kind matches the lift's
    /// target, and bubble the rest upward. Returns the still-unresolved
    /// lifts at this level.
    fn lift(&self, forest: &mut Forest, node: NodeRef) -> Vec<NodeRef> {
        let mut uplift = Vec::new();
        let mut it = 0;

        while it < forest.num_children(node) {
            let mut advance = true;
            let child = forest.child(node, it);
            let mut lifted = self.lift(forest, child);

            if forest.kind(child) == *LIFT {
                lifted.insert(0, child);
                forest.erase(node, it..it + 1);
                advance = false;
            }

            for lnode in lifted {
                let resolved = forest
                    .front(lnode)
                    .is_some_and(|target| forest.kind(target) == forest.kind(node));
                if resolved {
                    let payload: Vec<NodeRef> = forest.children(lnode)[1..].to_vec();
                    forest.erase(lnode, 1..1 + payload.len());
                    forest.insert_all(node, it, &payload);
                    it += payload.len();
                    advance = false;
                } else {
                    uplift.push(lnode);
                }
            }

            if advance {
                it += 1;
            }
        }

        uplift
    }
}
