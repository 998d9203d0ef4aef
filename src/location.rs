//! Source buffers and location spans.
//!
//! A `Location` is a view into a shared source buffer. Locations compare by
//! the text they denote, so they double as name keys for symbol tables.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A span of source code, represented as byte offsets.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn len(self) -> usize {
        self.end - self.start
    }

    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Smallest span containing both.
    pub fn union(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn contains(self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A source buffer. Shared by every location into it; the buffer owner is
/// whoever produced the tree (normally a parser).
#[derive(Debug)]
pub struct SourceDef {
    path: Option<PathBuf>,
    contents: String,
}

/// Shared handle to a source buffer.
pub type Source = Arc<SourceDef>;

impl SourceDef {
    /// A buffer with no backing file, e.g. for fresh names and tests.
    pub fn synthetic(contents: impl Into<String>) -> Source {
        Arc::new(SourceDef {
            path: None,
            contents: contents.into(),
        })
    }

    /// A buffer with a backing path; the caller does the reading.
    pub fn with_path(path: impl Into<PathBuf>, contents: impl Into<String>) -> Source {
        Arc::new(SourceDef {
            path: Some(path.into()),
            contents: contents.into(),
        })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn view(&self) -> &str {
        &self.contents
    }
}

/// A range of a source buffer, or nothing at all for synthesized nodes.
#[derive(Clone, Default)]
pub struct Location {
    pub source: Option<Source>,
    pub span: Span,
}

impl Location {
    pub fn new(source: Source, span: Span) -> Self {
        Self {
            source: Some(source),
            span,
        }
    }

    /// A location covering a whole synthetic buffer holding `text`.
    pub fn synthetic(text: impl Into<String>) -> Self {
        let source = SourceDef::synthetic(text);
        let span = Span::new(0, source.view().len());
        Self::new(source, span)
    }

    /// The text this location denotes; empty when there is no source.
    pub fn view(&self) -> &str {
        match &self.source {
            Some(source) => &source.view()[self.span.start..self.span.end],
            None => "",
        }
    }

    /// Smallest range containing both locations.
    ///
    /// A location without a source yields the other side; locations into
    /// different buffers keep the left side.
    pub fn union(&self, other: &Location) -> Location {
        let Some(source) = &self.source else {
            return other.clone();
        };
        match &other.source {
            Some(other_source) if Arc::ptr_eq(source, other_source) => Location {
                source: Some(source.clone()),
                span: self.span.union(other.span),
            },
            _ => self.clone(),
        }
    }

    /// Whether `other` denotes a sub-range of the same buffer.
    pub fn contains(&self, other: &Location) -> bool {
        match (&self.source, &other.source) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) && self.span.contains(other.span),
            _ => false,
        }
    }
}

// Locations compare and hash by the text they denote.
impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.view() == other.view()
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.view().hash(state);
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}..{}", self.view(), self.span.start, self.span.end)
    }
}
