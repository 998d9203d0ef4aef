//! Per-scope symbol tables and the name lookup protocol.
//!
//! A scope is a node whose kind carries the `SYMTAB` flag. Its table maps a
//! name to the nodes defining it, in binding order, plus an include list of
//! wildcard contributors consulted by outward lookup only.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::forest::{Forest, ForestError};
use crate::refs::NodeRef;
use crate::token::{flag, Symbol, TOP};

/// Symbol table owned by a scope-bearing node.
#[derive(Default)]
pub struct SymbolTable {
    symbols: BTreeMap<Symbol, SmallVec<[NodeRef; 1]>>,
    includes: Vec<NodeRef>,
    next_id: usize,
}

impl SymbolTable {
    /// Mint a unique name of the form `prefix$N`.
    pub fn fresh(&mut self, prefix: &str) -> Symbol {
        let name = Symbol::new(&format!("{}${}", prefix, self.next_id));
        self.next_id += 1;
        name
    }

    /// Drop all bindings and includes. The fresh-name counter is kept so
    /// identifiers are never reused.
    pub fn clear(&mut self) {
        self.symbols.clear();
        self.includes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.includes.is_empty()
    }

    /// Bindings in name order, for printing.
    pub fn entries(&self) -> impl Iterator<Item = (Symbol, &[NodeRef])> {
        self.symbols.iter().map(|(name, nodes)| (*name, &nodes[..]))
    }

    pub fn includes(&self) -> &[NodeRef] {
        &self.includes
    }

    fn get(&self, name: Symbol) -> &[NodeRef] {
        self.symbols.get(&name).map(|v| &v[..]).unwrap_or(&[])
    }
}

impl Forest {
    /// Nearest enclosing scope: the closest ancestor owning a symbol table.
    pub fn scope(&self, n: NodeRef) -> Option<NodeRef> {
        let mut curr = self.parent(n);
        while let Some(p) = curr {
            if self.get(p).symtab.is_some() {
                return Some(p);
            }
            curr = self.parent(p);
        }
        None
    }

    /// The name a node answers to: its location view, interned.
    pub fn name_of(&self, n: NodeRef) -> Symbol {
        Symbol::new(self.location(n).view())
    }

    fn symtab(&self, scope: NodeRef) -> &SymbolTable {
        self.get(scope)
            .symtab
            .as_ref()
            .expect("node is not a scope")
    }

    fn symtab_mut(&mut self, scope: NodeRef) -> &mut SymbolTable {
        self.nodes_mut(scope)
            .symtab
            .as_mut()
            .expect("node is not a scope")
    }

    /// Bind `name` to `n` in the nearest enclosing scope.
    ///
    /// Returns `Ok(false)` when the binding is rejected: the name now has
    /// several definitions and at least one carries the `SHADOWING` flag.
    /// The caller decides whether that becomes an `Error` node.
    pub fn bind(&mut self, n: NodeRef, name: Symbol) -> Result<bool, ForestError> {
        let scope = self.scope(n).ok_or(ForestError::NoEnclosingScope(n))?;
        let table = self.symtab_mut(scope);
        let entry = table.symbols.entry(name).or_default();
        entry.push(n);

        if entry.len() == 1 {
            return Ok(true);
        }
        let entry: SmallVec<[NodeRef; 1]> = entry.clone();
        Ok(!entry.iter().any(|&d| self.kind(d).has(flag::SHADOWING)))
    }

    /// Add `n` to the enclosing scope's include list.
    pub fn include(&mut self, n: NodeRef) -> Result<(), ForestError> {
        let scope = self.scope(n).ok_or(ForestError::NoEnclosingScope(n))?;
        self.symtab_mut(scope).includes.push(n);
        Ok(())
    }

    /// Outward lookup from `n`, keyed by `n`'s own name.
    ///
    /// Walks enclosing scopes outward. In each scope, bindings for the name
    /// whose kind carries `LOOKUP` contribute; in a `DEFBEFOREUSE` scope only
    /// those defined before `n`. The scope's includes are then appended
    /// unconditionally. The walk stops at `until`, or as soon as any result
    /// carries the `SHADOWING` flag.
    pub fn lookup(&self, n: NodeRef, until: Option<NodeRef>) -> Vec<NodeRef> {
        let name = self.name_of(n);
        let mut result = Vec::new();
        let mut scope = self.scope(n);

        while let Some(st) = scope {
            let def_before_use = self.kind(st).has(flag::DEFBEFOREUSE);
            for &def in self.symtab(st).get(name) {
                if !self.kind(def).has(flag::LOOKUP) {
                    continue;
                }
                if def_before_use && !self.precedes(def, n) {
                    continue;
                }
                result.push(def);
            }
            result.extend_from_slice(&self.symtab(st).includes);

            let shadowed = result.iter().any(|&d| self.kind(d).has(flag::SHADOWING));
            if until == Some(st) || shadowed {
                break;
            }
            scope = self.scope(st);
        }

        result
    }

    /// Scoped lookdown: `scope`'s own entries for `name` whose kind carries
    /// `LOOKDOWN`. Includes are for outward lookup only and are ignored.
    pub fn lookdown(&self, scope: NodeRef, name: Symbol) -> Vec<NodeRef> {
        self.symtab(scope)
            .get(name)
            .iter()
            .copied()
            .filter(|&d| self.kind(d).has(flag::LOOKDOWN))
            .collect()
    }

    /// Raw look: `scope`'s entries for `name`, unfiltered.
    pub fn look(&self, scope: NodeRef, name: Symbol) -> Vec<NodeRef> {
        self.symtab(scope).get(name).to_vec()
    }

    /// Mint a unique name from the tree-wide counter on the nearest `Top`
    /// ancestor (or `n` itself, when it is the `Top`).
    pub fn fresh(&mut self, n: NodeRef, prefix: &str) -> Result<Symbol, ForestError> {
        let top = if self.kind(n) == *TOP {
            n
        } else {
            self.ancestor_with_kind(n, &[*TOP])
                .ok_or(ForestError::NoTopScope(n))?
        };
        Ok(self.symtab_mut(top).fresh(prefix))
    }

    /// Drop all bindings in `n`'s own table, keeping the fresh-name counter.
    pub fn clear_symbols(&mut self, n: NodeRef) {
        if let Some(table) = self.nodes_mut(n).symtab.as_mut() {
            table.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::token::Token;

    fn scoped() -> Token {
        Token::with_flags("Scope", flag::SYMTAB)
    }

    fn def_kind() -> Token {
        Token::with_flags("Def", flag::LOOKUP | flag::LOOKDOWN)
    }

    fn ident(f: &mut Forest, name: &str) -> NodeRef {
        f.node_at(def_kind(), Location::synthetic(name))
    }

    #[test]
    fn bind_then_lookup_finds_the_binding() {
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let def = ident(&mut f, "x");
        let site = f.node_at(Token::new("Use"), Location::synthetic("x"));
        f.push_back(top, def);
        f.push_back(top, site);

        assert!(f.bind(def, Symbol::new("x")).unwrap());
        assert_eq!(f.lookup(site, None), vec![def]);
    }

    #[test]
    fn bind_without_scope_is_an_error() {
        let mut f = Forest::new();
        let orphan = ident(&mut f, "x");
        assert!(f.bind(orphan, Symbol::new("x")).is_err());
        assert!(f.include(orphan).is_err());
    }

    #[test]
    fn shadowing_binding_must_be_unique() {
        let shadow = Token::with_flags("ShadowDef", flag::LOOKUP | flag::SHADOWING);
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let first = f.node_at(shadow, Location::synthetic("x"));
        let second = ident(&mut f, "x");
        f.push_back(top, first);
        f.push_back(top, second);

        assert!(f.bind(first, Symbol::new("x")).unwrap());
        assert!(!f.bind(second, Symbol::new("x")).unwrap());
    }

    #[test]
    fn shadowing_stops_outward_lookup() {
        let shadow = Token::with_flags("ShadowDef", flag::LOOKUP | flag::SHADOWING);
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let inner = f.node(scoped());
        f.push_back(top, inner);

        let outer_def = ident(&mut f, "x");
        f.push_back(top, outer_def);
        f.bind(outer_def, Symbol::new("x")).unwrap();

        let inner_def = f.node_at(shadow, Location::synthetic("x"));
        let site = f.node_at(Token::new("Use"), Location::synthetic("x"));
        f.push_back(inner, inner_def);
        f.push_back(inner, site);
        f.bind(inner_def, Symbol::new("x")).unwrap();

        assert_eq!(f.lookup(site, None), vec![inner_def]);
    }

    #[test]
    fn lookup_ascends_without_shadowing() {
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let inner = f.node(scoped());
        f.push_back(top, inner);

        let outer_def = ident(&mut f, "x");
        f.push_back(top, outer_def);
        f.bind(outer_def, Symbol::new("x")).unwrap();

        let site = f.node_at(Token::new("Use"), Location::synthetic("x"));
        f.push_back(inner, site);

        assert_eq!(f.lookup(site, None), vec![outer_def]);
        // A scope limit stops the ascent early.
        assert!(f.lookup(site, Some(inner)).is_empty());
    }

    #[test]
    fn def_before_use_filters_by_position() {
        let dbu = Token::with_flags("Body", flag::SYMTAB | flag::DEFBEFOREUSE);
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let body = f.node(dbu);
        f.push_back(top, body);

        let early_site = f.node_at(Token::new("Use"), Location::synthetic("x"));
        let def = ident(&mut f, "x");
        let late_site = f.node_at(Token::new("Use"), Location::synthetic("x"));
        f.push_back(body, early_site);
        f.push_back(body, def);
        f.push_back(body, late_site);
        f.bind(def, Symbol::new("x")).unwrap();

        assert!(f.lookup(early_site, None).is_empty());
        assert_eq!(f.lookup(late_site, None), vec![def]);
    }

    #[test]
    fn includes_feed_lookup_but_not_lookdown() {
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let module = ident(&mut f, "m");
        let site = f.node_at(Token::new("Use"), Location::synthetic("y"));
        f.push_back(top, module);
        f.push_back(top, site);

        f.include(module).unwrap();
        assert_eq!(f.lookup(site, None), vec![module]);
        assert!(f.lookdown(top, Symbol::new("m")).is_empty());
    }

    #[test]
    fn lookdown_filters_by_flag() {
        let lookup_only = Token::with_flags("ImportDef", flag::LOOKUP);
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let visible = ident(&mut f, "x");
        let hidden = f.node_at(lookup_only, Location::synthetic("x"));
        f.push_back(top, visible);
        f.push_back(top, hidden);
        f.bind(visible, Symbol::new("x")).unwrap();
        f.bind(hidden, Symbol::new("x")).unwrap();

        assert_eq!(f.lookdown(top, Symbol::new("x")), vec![visible]);
        assert_eq!(f.look(top, Symbol::new("x")), vec![visible, hidden]);
    }

    #[test]
    fn fresh_names_never_repeat() {
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let child = f.node(Token::new("Leaf"));
        f.push_back(top, child);

        let a = f.fresh(child, "tmp").unwrap();
        let b = f.fresh(top, "tmp").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, "tmp$0");
        assert_eq!(b, "tmp$1");

        // Clearing bindings does not reset the counter.
        f.clear_symbols(top);
        let c = f.fresh(top, "tmp").unwrap();
        assert_eq!(c, "tmp$2");
    }
}
