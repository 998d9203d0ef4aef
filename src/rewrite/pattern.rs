//! Pattern combinators over child-sequence cursors.
//!
//! A pattern matches against a cursor into a parent's child list and a
//! mutable capture context. On success the cursor advances past whatever
//! the pattern consumed; on failure the cursor is restored and no captures
//! are committed. Backtracking is shallow: each combinator snapshots only
//! the cursor and captures it may need to rewind.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use regex::Regex;
use smallvec::SmallVec;

use crate::forest::Forest;
use crate::refs::NodeRef;
use crate::token::Token;

// ============================================================================
// Cursor and captures
// ============================================================================

/// A position in a parent's child sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub parent: NodeRef,
    pub pos: usize,
    pub end: usize,
}

impl Cursor {
    /// Cursor over the full child list of `parent`.
    pub fn over(forest: &Forest, parent: NodeRef) -> Self {
        Self {
            parent,
            pos: 0,
            end: forest.num_children(parent),
        }
    }

    /// Cursor over `parent`'s children starting at `pos`.
    pub fn at(forest: &Forest, parent: NodeRef, pos: usize) -> Self {
        Self {
            parent,
            pos,
            end: forest.num_children(parent),
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.end
    }
}

/// Captures accumulated while matching: capture token → the consumed nodes.
///
/// Captured ranges are snapshots; they go stale if the parent's child list
/// is mutated afterwards.
#[derive(Clone, Default)]
pub struct Match {
    captures: BTreeMap<Token, SmallVec<[NodeRef; 2]>>,
}

impl Match {
    pub fn new() -> Self {
        Self::default()
    }

    /// The nodes captured under `name`; empty when absent.
    pub fn get(&self, name: Token) -> &[NodeRef] {
        self.captures.get(&name).map(|v| &v[..]).unwrap_or(&[])
    }

    /// First node captured under `name`.
    pub fn node(&self, name: Token) -> Option<NodeRef> {
        self.get(name).first().copied()
    }

    /// Drop accumulated captures between rule attempts.
    pub fn reset(&mut self) {
        self.captures.clear();
    }

    /// Merge a submatch. Existing captures win on collision; a combinator
    /// that re-captures a name does so through [`Match::set`].
    fn merge(&mut self, other: Match) {
        for (name, nodes) in other.captures {
            self.captures.entry(name).or_insert(nodes);
        }
    }

    fn set(&mut self, name: Token, nodes: SmallVec<[NodeRef; 2]>) {
        self.captures.insert(name, nodes);
    }
}

impl fmt::Debug for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.captures.iter()).finish()
    }
}

// ============================================================================
// Pattern
// ============================================================================

type GuardFn = dyn Fn(&Forest, &[NodeRef]) -> bool;

#[derive(Clone)]
enum Pat {
    Any,
    Start,
    End,
    Kind(Token),
    KindRe(Token, Rc<Regex>),
    Inside(SmallVec<[Token; 2]>),
    Seq(Box<Pat>, Box<Pat>),
    Choice(Box<Pat>, Box<Pat>),
    Opt(Box<Pat>),
    Rep(Box<Pat>),
    Not(Box<Pat>),
    Pred(Box<Pat>),
    NegPred(Box<Pat>),
    Cap(Token, Box<Pat>),
    Children(Box<Pat>, Box<Pat>),
    Guard(Rc<GuardFn>, Box<Pat>),
}

/// A composable matcher over child-sequence slices.
#[derive(Clone)]
pub struct Pattern {
    pat: Pat,
}

/// Matches any single child.
pub fn any() -> Pattern {
    Pattern { pat: Pat::Any }
}

/// Zero-width anchor: the cursor is at the parent's begin.
pub fn start() -> Pattern {
    Pattern { pat: Pat::Start }
}

/// Zero-width anchor: the cursor is at the parent's end.
pub fn end() -> Pattern {
    Pattern { pat: Pat::End }
}

/// Matches a single child of the given kind.
pub fn kind(token: Token) -> Pattern {
    Pattern {
        pat: Pat::Kind(token),
    }
}

/// Matches a single child of the given kind whose location view fully
/// matches `pattern`.
///
/// # Panics
///
/// Panics when `pattern` is not a valid regular expression; rule tables are
/// built by the pass author, so this is a programmer error.
pub fn kind_re(token: Token, pattern: &str) -> Pattern {
    let anchored = format!("^(?:{})$", pattern);
    let regex = Regex::new(&anchored)
        .unwrap_or_else(|e| panic!("kind_re: invalid regex {:?}: {}", pattern, e));
    Pattern {
        pat: Pat::KindRe(token, Rc::new(regex)),
    }
}

/// Zero-width context check: the cursor's parent has one of the given
/// kinds. Under [`Pattern::rep`], any ancestor qualifies.
pub fn inside(kinds: &[Token]) -> Pattern {
    Pattern {
        pat: Pat::Inside(SmallVec::from_slice(kinds)),
    }
}

impl Pattern {
    /// Sequence: this pattern, then `next`.
    pub fn then(self, next: Pattern) -> Pattern {
        Pattern {
            pat: Pat::Seq(Box::new(self.pat), Box::new(next.pat)),
        }
    }

    /// Ordered choice: this pattern, or `alt` if it fails.
    pub fn or(self, alt: Pattern) -> Pattern {
        Pattern {
            pat: Pat::Choice(Box::new(self.pat), Box::new(alt.pat)),
        }
    }

    /// Optional: this pattern or a no-op; always succeeds.
    pub fn opt(self) -> Pattern {
        Pattern {
            pat: Pat::Opt(Box::new(self.pat)),
        }
    }

    /// Greedy zero-or-more repetition. Combinators with custom repetition
    /// semantics (`inside`, anchors, lookahead) are delegated a single
    /// invocation instead.
    pub fn rep(self) -> Pattern {
        Pattern {
            pat: Pat::Rep(Box::new(self.pat)),
        }
    }

    /// Not-followed-by, consuming: fails where this pattern matches,
    /// otherwise consumes exactly one child.
    pub fn not(self) -> Pattern {
        Pattern {
            pat: Pat::Not(Box::new(self.pat)),
        }
    }

    /// Zero-width positive lookahead.
    pub fn pred(self) -> Pattern {
        Pattern {
            pat: Pat::Pred(Box::new(self.pat)),
        }
    }

    /// Zero-width negative lookahead.
    pub fn neg_pred(self) -> Pattern {
        Pattern {
            pat: Pat::NegPred(Box::new(self.pat)),
        }
    }

    /// Record the consumed range under `name` on success.
    pub fn capture(self, name: Token) -> Pattern {
        Pattern {
            pat: Pat::Cap(name, Box::new(self.pat)),
        }
    }

    /// Descend: match this pattern at the current level, then match `sub`
    /// against the children of the first consumed node.
    pub fn children(self, sub: Pattern) -> Pattern {
        Pattern {
            pat: Pat::Children(Box::new(self.pat), Box::new(sub.pat)),
        }
    }

    /// Semantic predicate: on success, hand the consumed range to `f`; fail
    /// (and rewind) when it returns false.
    pub fn then_do(self, f: impl Fn(&Forest, &[NodeRef]) -> bool + 'static) -> Pattern {
        Pattern {
            pat: Pat::Guard(Rc::new(f), Box::new(self.pat)),
        }
    }

    /// Attempt a match at the cursor, committing captures on success.
    pub fn matches(&self, forest: &Forest, cur: &mut Cursor, m: &mut Match) -> bool {
        self.pat.matches(forest, cur, m)
    }
}

impl Pat {
    /// Combinators that change meaning under repetition instead of looping.
    fn custom_rep(&self) -> bool {
        matches!(
            self,
            Pat::Inside(_) | Pat::Start | Pat::End | Pat::Pred(_) | Pat::NegPred(_) | Pat::Rep(_)
        )
    }

    fn matches(&self, forest: &Forest, cur: &mut Cursor, m: &mut Match) -> bool {
        match self {
            Pat::Any => {
                if cur.at_end() {
                    return false;
                }
                cur.pos += 1;
                true
            }
            Pat::Start => cur.pos == 0,
            Pat::End => cur.at_end(),
            Pat::Kind(token) => {
                if cur.at_end() || forest.kind(forest.child(cur.parent, cur.pos)) != *token {
                    return false;
                }
                cur.pos += 1;
                true
            }
            Pat::KindRe(token, regex) => {
                if cur.at_end() {
                    return false;
                }
                let child = forest.child(cur.parent, cur.pos);
                if forest.kind(child) != *token || !regex.is_match(forest.location(child).view()) {
                    return false;
                }
                cur.pos += 1;
                true
            }
            Pat::Inside(kinds) => match_inside(forest, cur, kinds, false),
            Pat::Seq(first, second) => {
                let begin = *cur;
                let mut sub = m.clone();
                if !first.matches(forest, cur, &mut sub) {
                    return false;
                }
                if !second.matches(forest, cur, &mut sub) {
                    *cur = begin;
                    return false;
                }
                m.merge(sub);
                true
            }
            Pat::Choice(first, second) => {
                let mut sub = m.clone();
                if first.matches(forest, cur, &mut sub) {
                    m.merge(sub);
                    return true;
                }
                let mut sub = m.clone();
                if second.matches(forest, cur, &mut sub) {
                    m.merge(sub);
                    return true;
                }
                false
            }
            Pat::Opt(inner) => {
                let mut sub = m.clone();
                if inner.matches(forest, cur, &mut sub) {
                    m.merge(sub);
                }
                true
            }
            Pat::Rep(inner) => {
                if inner.custom_rep() {
                    if let Pat::Inside(kinds) = &**inner {
                        return match_inside(forest, cur, kinds, true);
                    }
                    return inner.matches(forest, cur, m);
                }
                while !cur.at_end() && inner.matches(forest, cur, m) {}
                true
            }
            Pat::Not(inner) => {
                if cur.at_end() {
                    return false;
                }
                let begin = *cur;
                let mut sub = m.clone();
                if inner.matches(forest, cur, &mut sub) {
                    *cur = begin;
                    return false;
                }
                *cur = begin;
                cur.pos += 1;
                true
            }
            Pat::Pred(inner) => {
                let begin = *cur;
                let mut sub = m.clone();
                let ok = inner.matches(forest, cur, &mut sub);
                *cur = begin;
                ok
            }
            Pat::NegPred(inner) => {
                let begin = *cur;
                let mut sub = m.clone();
                let ok = inner.matches(forest, cur, &mut sub);
                *cur = begin;
                !ok
            }
            Pat::Cap(name, inner) => {
                let begin = cur.pos;
                let mut sub = m.clone();
                if !inner.matches(forest, cur, &mut sub) {
                    return false;
                }
                m.merge(sub);
                m.set(
                    *name,
                    SmallVec::from_slice(&forest.children(cur.parent)[begin..cur.pos]),
                );
                true
            }
            Pat::Children(outer, sub_pattern) => {
                let begin = *cur;
                let mut sub = m.clone();
                if !outer.matches(forest, cur, &mut sub) {
                    return false;
                }
                if begin.pos >= forest.num_children(begin.parent) {
                    *cur = begin;
                    return false;
                }
                let first = forest.child(begin.parent, begin.pos);
                let mut inner_cur = Cursor::over(forest, first);
                if !sub_pattern.matches(forest, &mut inner_cur, &mut sub) {
                    *cur = begin;
                    return false;
                }
                m.merge(sub);
                true
            }
            Pat::Guard(f, inner) => {
                let begin = *cur;
                let mut sub = m.clone();
                if !inner.matches(forest, cur, &mut sub) {
                    return false;
                }
                if !f(forest, &forest.children(cur.parent)[begin.pos..cur.pos]) {
                    *cur = begin;
                    return false;
                }
                m.merge(sub);
                true
            }
        }
    }
}

fn match_inside(forest: &Forest, cur: &Cursor, kinds: &[Token], any_ancestor: bool) -> bool {
    let mut curr = Some(cur.parent);
    while let Some(n) = curr {
        if forest.kind(n).in_list(kinds) {
            return true;
        }
        if !any_ancestor {
            break;
        }
        curr = forest.parent(n);
    }
    false
}
