//! Trellis: a term-rewriting engine over typed trees.
//!
//! Compilation stages are expressed as ordered sets of pattern → effect
//! rules; a pass sweeps a tree, edits sibling ranges in place, resolves
//! `Lift` markers, and iterates to a fixed point. Trees carry parent
//! back-references and per-scope symbol tables with shadowing,
//! def-before-use, and include-list lookup.
//!
//! A front end (parser) produces the initial `Top` tree; this crate owns
//! everything after that.

// === Tree infrastructure ===
pub mod forest;
pub mod location;
pub mod printer;
pub mod refs;
pub mod symtab;
pub mod token;
pub mod walk;

// === Rewriting ===
pub mod driver;
pub mod rewrite;

pub use driver::{Driver, PassOutcome, Report};
pub use forest::{Forest, ForestError, MarkerFlags, NodeBuilder, NodeData};
pub use location::{Location, Source, SourceDef, Span};
pub use printer::print_node;
pub use refs::NodeRef;
pub use symtab::SymbolTable;
pub use token::{
    flag, Symbol, Token, TokenFlags, ERROR, ERROR_AST, ERROR_MSG, FILE, GROUP, INVALID, LIFT,
    NO_CHANGE, SEQ, TOP,
};
pub use walk::{walk, walk_mut, walk_pre, WalkAction};
