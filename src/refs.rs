//! Entity references for arena-based tree storage.

use cranelift_entity::entity_impl;

/// Reference to a node in the forest arena.
///
/// A thin `u32` providing type-safe indexing into the `Forest`'s
/// `PrimaryMap` storage. Non-owning: holding a `NodeRef` keeps nothing
/// alive and never forms a cycle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u32);
entity_impl!(NodeRef, "n");
