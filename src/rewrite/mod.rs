//! Pattern matching and rewriting.

pub mod pass;
pub mod pattern;

pub use pass::{dir, Effect, Pass, PassReport, Rule};
pub use pattern::{any, end, inside, kind, kind_re, start, Cursor, Match, Pattern};
