//! Textual tree form for debugging and test output.
//!
//! A node prints as `(kind location-view? symtab? children…)`, one node per
//! line, two-space indentation. Test suites compare trees structurally with
//! [`Forest::equals`]; this form is for humans reading failures.

use std::fmt;

use crate::forest::Forest;
use crate::refs::NodeRef;
use crate::symtab::SymbolTable;
use crate::token::flag;

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn write_symtab(forest: &Forest, out: &mut String, table: &SymbolTable, level: usize) {
    indent(out, level);
    out.push('{');
    for (name, defs) in table.entries() {
        out.push('\n');
        indent(out, level + 1);
        out.push_str(&format!("{} =", name));
        if let [def] = defs {
            out.push_str(&format!(" {}", forest.kind(*def)));
        } else {
            for &def in defs {
                out.push('\n');
                indent(out, level + 2);
                out.push_str(&format!("{}", forest.kind(def)));
            }
        }
    }
    for &inc in table.includes() {
        out.push('\n');
        indent(out, level + 1);
        out.push_str(&format!("include {}", forest.location(inc).view()));
    }
    out.push('}');
}

enum Step {
    Open(NodeRef),
    Close,
}

/// Render a subtree as indented text.
pub fn print_node(forest: &Forest, root: NodeRef) -> String {
    let mut out = String::new();
    let mut level = 0usize;
    let mut work: Vec<Step> = vec![Step::Open(root)];

    while let Some(step) = work.pop() {
        match step {
            Step::Open(n) => {
                if level != 0 {
                    out.push('\n');
                }
                indent(&mut out, level);
                let data = forest.get(n);
                out.push('(');
                out.push_str(&format!("{}", data.kind));
                if data.kind.has(flag::PRINT) {
                    let view = data.location.view();
                    out.push_str(&format!(" {}:{}", view.len(), view));
                }
                if let Some(table) = &data.symtab {
                    out.push('\n');
                    write_symtab(forest, &mut out, table, level + 1);
                }
                level += 1;
                work.push(Step::Close);
                for &child in forest.children(n).iter().rev() {
                    work.push(Step::Open(child));
                }
            }
            Step::Close => {
                out.push(')');
                level -= 1;
            }
        }
    }

    out
}

impl Forest {
    /// Display adapter for a subtree.
    pub fn display(&self, root: NodeRef) -> impl fmt::Display + '_ {
        DisplayNode { forest: self, root }
    }
}

struct DisplayNode<'a> {
    forest: &'a Forest,
    root: NodeRef,
}

impl fmt::Display for DisplayNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_node(self.forest, self.root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::token::{Symbol, Token, GROUP, TOP};

    #[test]
    fn prints_nested_structure() {
        let mut f = Forest::new();
        let a = f.node(Token::new("A"));
        let group = f.build(*GROUP).child(a).finish();
        let file = f.build(Token::new("File2")).child(group).finish();

        let text = print_node(&f, file);
        assert_eq!(text, "(File2\n  (Group\n    (A)))");
    }

    #[test]
    fn prints_location_for_print_kinds() {
        let mut f = Forest::new();
        let name = Token::with_flags("Name", flag::PRINT);
        let n = f.node_at(name, Location::synthetic("hello"));
        assert_eq!(print_node(&f, n), "(Name 5:hello)");
    }

    #[test]
    fn prints_symbol_table() {
        let def = Token::with_flags("Def", flag::LOOKUP);
        let mut f = Forest::new();
        let top = f.node(*TOP);
        let d = f.node_at(def, Location::synthetic("x"));
        f.push_back(top, d);
        f.bind(d, Symbol::new("x")).unwrap();

        let text = print_node(&f, top);
        assert!(text.starts_with("(Top\n  {"), "got: {}", text);
        assert!(text.contains("x = Def"), "got: {}", text);
    }

    #[test]
    fn display_matches_print() {
        let mut f = Forest::new();
        let n = f.node(*GROUP);
        assert_eq!(format!("{}", f.display(n)), print_node(&f, n));
    }
}
