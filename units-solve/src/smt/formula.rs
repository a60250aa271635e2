#![forbid(unsafe_code)]

//! Quantifier-free Bool/Int formulas, enough for the unit encoding.
//!
//! Constructors fold literals eagerly, so constraints over constant slots
//! usually collapse to `True` or `False` before they reach an engine.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sort {
    Bool,
    Int,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => f.write_str("Bool"),
            Sort::Int => f.write_str("Int"),
        }
    }
}

/// Integer-valued term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    Var(String),
    Lit(i64),
    Add(Box<Term>, Box<Term>),
    Sub(Box<Term>, Box<Term>),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    pub fn lit(n: i64) -> Self {
        Term::Lit(n)
    }

    pub fn add(self, other: Term) -> Self {
        match (self, other) {
            (Term::Lit(a), Term::Lit(b)) => Term::Lit(a + b),
            (t, Term::Lit(0)) | (Term::Lit(0), t) => t,
            (a, b) => Term::Add(Box::new(a), Box::new(b)),
        }
    }

    pub fn sub(self, other: Term) -> Self {
        match (self, other) {
            (Term::Lit(a), Term::Lit(b)) => Term::Lit(a - b),
            (t, Term::Lit(0)) => t,
            (a, b) => Term::Sub(Box::new(a), Box::new(b)),
        }
    }

    pub fn to_smtlib(&self) -> String {
        match self {
            Term::Var(name) => quote(name),
            Term::Lit(n) if *n < 0 => format!("(- {})", n.unsigned_abs()),
            Term::Lit(n) => n.to_string(),
            Term::Add(a, b) => format!("(+ {} {})", a.to_smtlib(), b.to_smtlib()),
            Term::Sub(a, b) => format!("(- {} {})", a.to_smtlib(), b.to_smtlib()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Formula {
    True,
    False,
    Var(String),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
    IntEq(Term, Term),
}

impl Formula {
    pub fn var(name: impl Into<String>) -> Self {
        Formula::Var(name.into())
    }

    pub fn lit(b: bool) -> Self {
        if b { Formula::True } else { Formula::False }
    }

    pub fn not(self) -> Self {
        match self {
            Formula::True => Formula::False,
            Formula::False => Formula::True,
            Formula::Not(inner) => *inner,
            other => Formula::Not(Box::new(other)),
        }
    }

    pub fn and(formulas: impl IntoIterator<Item = Formula>) -> Self {
        let mut out = Vec::new();
        for f in formulas {
            match f {
                Formula::True => {}
                Formula::False => return Formula::False,
                Formula::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Formula::True,
            1 => out.pop().unwrap_or(Formula::True),
            _ => Formula::And(out),
        }
    }

    pub fn or(formulas: impl IntoIterator<Item = Formula>) -> Self {
        let mut out = Vec::new();
        for f in formulas {
            match f {
                Formula::False => {}
                Formula::True => return Formula::True,
                Formula::Or(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Formula::False,
            1 => out.pop().unwrap_or(Formula::False),
            _ => Formula::Or(out),
        }
    }

    pub fn implies(antecedent: Formula, consequent: Formula) -> Self {
        match (antecedent, consequent) {
            (Formula::False, _) | (_, Formula::True) => Formula::True,
            (Formula::True, c) => c,
            (a, Formula::False) => a.not(),
            (a, c) => Formula::Implies(Box::new(a), Box::new(c)),
        }
    }

    pub fn iff(a: Formula, b: Formula) -> Self {
        match (a, b) {
            (Formula::True, x) | (x, Formula::True) => x,
            (Formula::False, x) | (x, Formula::False) => x.not(),
            (a, b) if a == b => Formula::True,
            (a, b) => Formula::Iff(Box::new(a), Box::new(b)),
        }
    }

    pub fn int_eq(a: Term, b: Term) -> Self {
        match (a, b) {
            (Term::Lit(x), Term::Lit(y)) => Formula::lit(x == y),
            (a, b) if a == b => Formula::True,
            (a, b) => Formula::IntEq(a, b),
        }
    }

    pub fn to_smtlib(&self) -> String {
        match self {
            Formula::True => "true".to_string(),
            Formula::False => "false".to_string(),
            Formula::Var(name) => quote(name),
            Formula::Not(f) => format!("(not {})", f.to_smtlib()),
            Formula::And(fs) => nary("and", fs),
            Formula::Or(fs) => nary("or", fs),
            Formula::Implies(a, b) => format!("(=> {} {})", a.to_smtlib(), b.to_smtlib()),
            Formula::Iff(a, b) => format!("(= {} {})", a.to_smtlib(), b.to_smtlib()),
            Formula::IntEq(a, b) => format!("(= {} {})", a.to_smtlib(), b.to_smtlib()),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_smtlib())
    }
}

fn nary(op: &str, fs: &[Formula]) -> String {
    let parts: Vec<String> = fs.iter().map(Formula::to_smtlib).collect();
    format!("({op} {})", parts.join(" "))
}

/// Variable names like `3-Prefix` are not simple SMT-LIB symbols.
fn quote(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("|{name}|")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedAssertion {
    pub label: String,
    /// Human-readable origin, reported when the assertion is in an unsat core.
    pub origin: String,
    pub formula: Formula,
}

/// Declarations plus hard and soft assertions for one solve.
#[derive(Clone, Debug, Default)]
pub struct SmtProblem {
    declarations: Vec<(String, Sort)>,
    hard: Vec<NamedAssertion>,
    soft: Vec<(Formula, u32)>,
}

impl SmtProblem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, sort: Sort) {
        self.declarations.push((name.into(), sort));
    }

    /// Adds a hard assertion. Trivially true formulas are dropped.
    pub fn assert(
        &mut self,
        label: impl Into<String>,
        origin: impl Into<String>,
        formula: Formula,
    ) {
        if formula == Formula::True {
            return;
        }
        self.hard.push(NamedAssertion {
            label: label.into(),
            origin: origin.into(),
            formula,
        });
    }

    pub fn assert_soft(&mut self, formula: Formula, weight: u32) {
        if formula != Formula::True {
            self.soft.push((formula, weight));
        }
    }

    pub fn declarations(&self) -> &[(String, Sort)] {
        &self.declarations
    }

    pub fn hard(&self) -> &[NamedAssertion] {
        &self.hard
    }

    pub fn soft(&self) -> &[(Formula, u32)] {
        &self.soft
    }

    pub fn origin_of(&self, label: &str) -> Option<&str> {
        self.hard
            .iter()
            .find(|a| a.label == label)
            .map(|a| a.origin.as_str())
    }

    /// SMT-LIB2 script for this problem (with `assert-soft`, as z3 accepts it).
    pub fn to_smtlib(&self) -> String {
        let mut lines = vec![
            "(set-option :produce-models true)".to_string(),
            "(set-option :produce-unsat-cores true)".to_string(),
            "(set-logic QF_LIA)".to_string(),
        ];
        for (name, sort) in &self.declarations {
            lines.push(format!("(declare-const {} {sort})", quote(name)));
        }
        for a in &self.hard {
            lines.push(format!("; {}", a.origin));
            lines.push(format!(
                "(assert (! {} :named {}))",
                a.formula.to_smtlib(),
                a.label
            ));
        }
        for (f, weight) in &self.soft {
            lines.push(format!("(assert-soft {} :weight {weight})", f.to_smtlib()));
        }
        lines.push("(check-sat)".to_string());
        lines.push("(get-model)".to_string());
        lines.join("\n") + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_equalities_fold() {
        assert_eq!(Formula::int_eq(Term::lit(1), Term::lit(2)), Formula::False);
        assert_eq!(Formula::int_eq(Term::lit(3), Term::lit(3)), Formula::True);
        assert_eq!(
            Formula::and([Formula::True, Formula::var("a"), Formula::True]),
            Formula::var("a")
        );
        assert_eq!(
            Formula::or([Formula::False, Formula::var("a"), Formula::True]),
            Formula::True
        );
    }

    #[test]
    fn terms_fold_constants() {
        assert_eq!(Term::lit(2).add(Term::lit(-3)), Term::lit(-1));
        assert_eq!(Term::var("x").sub(Term::lit(0)), Term::var("x"));
    }

    #[test]
    fn slot_names_are_quoted() {
        let f = Formula::int_eq(Term::var("0-Prefix"), Term::lit(-3));
        assert_eq!(f.to_smtlib(), "(= |0-Prefix| (- 3))");
        assert_eq!(Formula::var("flag").not().to_smtlib(), "(not flag)");
    }

    #[test]
    fn script_names_hard_assertions() {
        let mut p = SmtProblem::new();
        p.declare("0-UnknownUnits", Sort::Bool);
        p.assert("wf0", "slot #0", Formula::var("0-UnknownUnits").not());
        p.assert("c0", "#0 == #0", Formula::True);
        p.assert_soft(Formula::var("0-UnknownUnits").not(), 1);

        let script = p.to_smtlib();
        assert!(script.contains("(declare-const |0-UnknownUnits| Bool)"));
        assert!(script.contains("(assert (! (not |0-UnknownUnits|) :named wf0))"));
        assert!(script.contains("(assert-soft (not |0-UnknownUnits|) :weight 1)"));
        assert!(!script.contains("c0"));
        assert_eq!(p.origin_of("wf0"), Some("slot #0"));
    }
}
