//! Token catalog and string interning.
//!
//! A `Token` names a node kind and carries the behavior flags that drive
//! scoping and lookup. Registering the same name twice yields two distinct
//! tokens: identity is the registry slot, not the text.

use std::fmt;
use std::sync::LazyLock;

use lasso::{Rodeo, Spur};
use parking_lot::RwLock;

// ============================================================================
// Behavior flags
// ============================================================================

/// Bitset of per-kind behavior flags.
pub type TokenFlags = u8;

pub mod flag {
    use super::TokenFlags;

    /// The location view is part of the node's meaning: it participates in
    /// structural equality and is printed.
    pub const PRINT: TokenFlags = 1 << 0;
    /// Nodes of this kind own a symbol table and define a scope.
    pub const SYMTAB: TokenFlags = 1 << 1;
    /// Bindings of this kind are visible to outward lookup.
    pub const LOOKUP: TokenFlags = 1 << 2;
    /// Bindings of this kind are visible to scoped lookdown.
    pub const LOOKDOWN: TokenFlags = 1 << 3;
    /// A binding of this kind stops outward lookup at its scope.
    pub const SHADOWING: TokenFlags = 1 << 4;
    /// In scopes of this kind, only bindings defined before the use site are
    /// visible to outward lookup.
    pub const DEFBEFOREUSE: TokenFlags = 1 << 5;
}

// ============================================================================
// Registry
// ============================================================================

struct TokenDef {
    name: String,
    flags: TokenFlags,
}

static REGISTRY: LazyLock<RwLock<Vec<TokenDef>>> = LazyLock::new(|| RwLock::new(Vec::new()));

/// A node kind: an index into the global token registry.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(u32);

impl Token {
    /// Register a new token with no flags.
    pub fn new(name: &str) -> Self {
        Self::with_flags(name, 0)
    }

    /// Register a new token with the given behavior flags.
    pub fn with_flags(name: &str, flags: TokenFlags) -> Self {
        let mut registry = REGISTRY.write();
        let id = u32::try_from(registry.len()).expect("token registry overflow");
        registry.push(TokenDef {
            name: name.to_owned(),
            flags,
        });
        Token(id)
    }

    /// The token's behavior flags.
    pub fn flags(self) -> TokenFlags {
        REGISTRY.read()[self.0 as usize].flags
    }

    /// Check a single behavior flag.
    pub fn has(self, f: TokenFlags) -> bool {
        self.flags() & f != 0
    }

    /// Membership test against a kind list.
    pub fn in_list(self, list: &[Token]) -> bool {
        list.contains(&self)
    }

    /// Access the token's name with zero-copy.
    ///
    /// Do not register tokens from within the closure; the registry lock is
    /// held for its duration.
    fn with_str<R>(self, f: impl FnOnce(&str) -> R) -> R {
        let registry = REGISTRY.read();
        f(&registry[self.0 as usize].name)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| write!(f, "{}", s))
    }
}

// Debug defers to Display: the slot index alone is useless in test failures.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool {
        self.with_str(|s| s == other)
    }
}

impl PartialEq<&str> for Token {
    fn eq(&self, other: &&str) -> bool {
        self.with_str(|s| s == *other)
    }
}

/// Declare `LazyLock<Token>` statics.
///
/// # Example
/// ```
/// use trellis::{tokens, flag};
///
/// tokens! {
///     IDENT => "Ident", flag::LOOKUP;
///     COMMA => "Comma";
/// }
/// ```
#[macro_export]
macro_rules! tokens {
    ($($(#[$attr:meta])* $vis:vis $name:ident => $text:expr $(, $flags:expr)?);* $(;)?) => {
        $(
            $(#[$attr])*
            $vis static $name: std::sync::LazyLock<$crate::Token> =
                std::sync::LazyLock::new(|| $crate::Token::with_flags($text, 0 $(| $flags)?));
        )*
    };
}

// ============================================================================
// Built-in tokens
// ============================================================================

tokens! {
    /// Root kind; always owns the tree-wide symbol table.
    pub TOP => "Top", flag::SYMTAB;
    /// Generic grouping produced by parsers.
    pub GROUP => "Group";
    /// A parsed file.
    pub FILE => "File";
    /// An embedded diagnostic; inert during passes.
    pub ERROR => "Error";
    /// Human-readable message child of an `Error`.
    pub ERROR_MSG => "ErrorMsg", flag::PRINT;
    /// Offending-subtree child of an `Error`.
    pub ERROR_AST => "ErrorAst";
    /// Marker moving its payload to a named ancestor kind; inert during
    /// passes, resolved by the lift phase.
    pub LIFT => "Lift";
    /// A returned `Seq` node's children are spliced in place of the match.
    pub SEQ => "Seq";
    /// Sentinel return kind: the rule fired but made no effective change.
    pub NO_CHANGE => "NoChange";
    /// Placeholder kind for default-constructed values.
    pub INVALID => "Invalid";
}

// ============================================================================
// Symbols
// ============================================================================

/// Global string interner for names.
static INTERNER: LazyLock<RwLock<Rodeo>> = LazyLock::new(|| RwLock::new(Rodeo::default()));

/// Interned string used as a symbol-table key and for fresh names.
///
/// Unlike `Token`, two `Symbol`s with the same text are equal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(Spur);

impl Symbol {
    /// Intern a string and return its symbol.
    pub fn new(text: &str) -> Self {
        Symbol(INTERNER.write().get_or_intern(text))
    }

    /// Access the symbol's text with zero-copy.
    ///
    /// Do not call any Symbol methods from within the closure; the interner
    /// lock is held for its duration.
    fn with_str<R>(self, f: impl FnOnce(&str) -> R) -> R {
        let interner = INTERNER.read();
        f(interner.resolve(&self.0))
    }
}

impl From<&str> for Symbol {
    fn from(text: &str) -> Self {
        Symbol::new(text)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| write!(f, "{}", s))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        self.with_str(|s| s == other)
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.with_str(|s| s == *other)
    }
}
