#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::components::Component;

/// `sum(coef * x_var) = rhs` over dense unknown indices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Equation {
    terms: BTreeMap<usize, i64>,
    rhs: i64,
}

impl Equation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `coef * x_var`, merging with an existing term for the same unknown.
    pub fn add_term(&mut self, var: usize, coef: i64) {
        let merged = self.terms.get(&var).copied().unwrap_or(0) + coef;
        if merged == 0 {
            self.terms.remove(&var);
        } else {
            self.terms.insert(var, merged);
        }
    }

    pub fn add_rhs(&mut self, value: i64) {
        self.rhs += value;
    }

    pub fn terms(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.terms.iter().map(|(v, c)| (*v, *c))
    }

    pub fn rhs(&self) -> i64 {
        self.rhs
    }

    /// No unknowns left: either `0 = 0` or a contradiction.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }
}

/// `0:1 3:-1 = 2`
impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (var, coef) in &self.terms {
            write!(f, "{var}:{coef} ")?;
        }
        write!(f, "= {}", self.rhs)
    }
}

/// The linear system for one serialized component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSystem {
    pub component: Component,
    pub variables: usize,
    /// Rendered equations; the set keeps them deduplicated and sorted.
    pub equations: BTreeSet<String>,
}

impl GroupSystem {
    pub fn new(component: Component, variables: usize) -> Self {
        Self {
            component,
            variables,
            equations: BTreeSet::new(),
        }
    }

    pub fn push(&mut self, equation: &Equation) {
        self.equations.insert(equation.to_string());
    }

    pub fn file_name(&self) -> String {
        format!("gjeConstraints_{}.gje", self.component)
    }

    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n{}\n", self.variables, self.equations.len());
        for line in &self.equations {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_terms_cancel() {
        let mut e = Equation::new();
        e.add_term(2, 1);
        e.add_term(0, -1);
        e.add_term(2, -1);
        assert_eq!(e.to_string(), "0:-1 = 0");
    }

    #[test]
    fn system_text_has_counts_then_sorted_lines() {
        let mut g = GroupSystem::new(Component::Dimension("m".into()), 3);
        let mut a = Equation::new();
        a.add_term(1, 1);
        a.add_rhs(1);
        let mut b = Equation::new();
        b.add_term(0, 1);
        b.add_term(2, -1);
        g.push(&a);
        g.push(&b);
        g.push(&b);
        assert_eq!(g.to_text(), "3\n2\n0:1 2:-1 = 0\n1:1 = 1\n");
        assert_eq!(g.file_name(), "gjeConstraints_m.gje");
    }
}
