//! Sequences named passes over a tree and collects diagnostics.
//!
//! The driver runs passes in order, recording per-pass iteration and change
//! counts. After each pass it collects the tree's outermost `Error` nodes;
//! once any exist, later passes are skipped and the errors become the run's
//! diagnostics.

use tracing::debug;

use crate::forest::{Forest, ForestError};
use crate::refs::NodeRef;
use crate::rewrite::pass::Pass;

/// Per-pass statistics from a driver run.
#[derive(Debug)]
pub struct PassOutcome {
    pub name: String,
    pub iterations: usize,
    pub changes: usize,
}

/// Results of a driver run.
#[derive(Debug)]
pub struct Report {
    /// Outcomes of the passes that ran, in order.
    pub outcomes: Vec<PassOutcome>,
    /// Outermost `Error` nodes found after the last pass that ran.
    pub errors: Vec<NodeRef>,
}

impl Report {
    /// Whether every pass ran without leaving diagnostics.
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// An ordered sequence of named passes.
pub struct Driver {
    language: String,
    passes: Vec<(String, Pass)>,
}

impl Driver {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            passes: Vec::new(),
        }
    }

    /// Append a named pass.
    pub fn pass(mut self, name: impl Into<String>, pass: Pass) -> Self {
        self.passes.push((name.into(), pass));
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Names of the registered passes, in run order.
    pub fn pass_names(&self) -> impl Iterator<Item = &str> {
        self.passes.iter().map(|(name, _)| name.as_str())
    }

    /// Run every pass in sequence over the tree rooted at `root`.
    ///
    /// Embedded `Error` nodes never abort the run early by themselves; they
    /// stop the *sequence* after the pass that produced them, and are
    /// returned in the report. A thrown error (`Err`) means the pass
    /// definition itself is broken.
    pub fn run(&self, forest: &mut Forest, root: NodeRef) -> Result<Report, ForestError> {
        let mut outcomes = Vec::new();

        for (name, pass) in &self.passes {
            let report = pass.run(forest, root)?;
            debug!(
                language = self.language.as_str(),
                pass = name.as_str(),
                iterations = report.iterations,
                changes = report.changes,
                "pass complete"
            );
            outcomes.push(PassOutcome {
                name: name.clone(),
                iterations: report.iterations,
                changes: report.changes,
            });

            let errors = forest.get_errors(root);
            if !errors.is_empty() {
                debug!(
                    language = self.language.as_str(),
                    pass = name.as_str(),
                    count = errors.len(),
                    "stopping on diagnostics"
                );
                return Ok(Report { outcomes, errors });
            }
        }

        Ok(Report {
            outcomes,
            errors: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::pass::dir;
    use crate::rewrite::pattern::kind;
    use crate::token::{Token, GROUP, TOP};

    #[test]
    fn runs_passes_in_order() {
        let a = Token::new("A");
        let b = Token::new("B");
        let c = Token::new("C");
        let mut f = Forest::new();
        let g = f.build(*GROUP).leaf(a).finish();
        let top = f.build(*TOP).child(g).finish();

        let driver = Driver::new("test")
            .pass(
                "a_to_b",
                Pass::new(dir::TOPDOWN).rule(kind(a), move |f, _| Some(f.node(b))),
            )
            .pass(
                "b_to_c",
                Pass::new(dir::TOPDOWN).rule(kind(b), move |f, _| Some(f.node(c))),
            );

        let report = driver.run(&mut f, top).unwrap();
        assert!(report.ok());
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].name, "a_to_b");
        assert_eq!(f.kind(f.child(g, 0)), c);
    }

    #[test]
    fn diagnostics_stop_the_sequence() {
        let a = Token::new("A");
        let b = Token::new("B");
        let mut f = Forest::new();
        let g = f.build(*GROUP).leaf(a).finish();
        let top = f.build(*TOP).child(g).finish();

        let driver = Driver::new("test")
            .pass(
                "reject_a",
                Pass::new(dir::TOPDOWN)
                    .rule(kind(a), |f, _| Some(f.error("A is not allowed here", None))),
            )
            .pass(
                "never_runs",
                Pass::new(dir::TOPDOWN).rule(kind(b), |f, _| Some(f.node(*GROUP))),
            );

        let report = driver.run(&mut f, top).unwrap();
        assert!(!report.ok());
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(f.kind(report.errors[0]), *crate::token::ERROR);
    }
}
