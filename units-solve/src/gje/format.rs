#![forbid(unsafe_code)]

//! Text exchanged with an elimination tool.
//!
//! System: line 1 is the unknown count, line 2 the equation count, then one
//! equation per line (`<var>:<coef> ... = <rhs>`).
//!
//! Results: `sat` or `unsat`, then `<var> <value>` lines where the value is an
//! integer or a rational `p/q`. Unknowns without a line are zero.

use num_rational::BigRational;

use super::equation::Equation;
use crate::solver::SolveError;

pub struct ParsedSystem {
    pub variables: usize,
    pub equations: Vec<Equation>,
}

pub fn parse_system(text: &str) -> Result<ParsedSystem, SolveError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let variables = parse_count(lines.next(), "variable count")?;
    let expected = parse_count(lines.next(), "equation count")?;

    let mut equations = Vec::with_capacity(expected);
    for line in lines {
        equations.push(parse_equation(line, variables)?);
    }
    if equations.len() != expected {
        return Err(SolveError::malformed(format!(
            "system declares {expected} equations but contains {}",
            equations.len()
        )));
    }

    Ok(ParsedSystem {
        variables,
        equations,
    })
}

fn parse_count(line: Option<&str>, what: &str) -> Result<usize, SolveError> {
    let line = line.ok_or_else(|| SolveError::malformed(format!("missing {what}")))?;
    line.parse()
        .map_err(|_| SolveError::malformed(format!("bad {what} `{line}`")))
}

fn parse_equation(line: &str, variables: usize) -> Result<Equation, SolveError> {
    let bad = || SolveError::malformed(format!("bad equation `{line}`"));

    let (lhs, rhs) = line.split_once('=').ok_or_else(bad)?;
    let mut eq = Equation::new();
    eq.add_rhs(rhs.trim().parse().map_err(|_| bad())?);

    for term in lhs.split_whitespace() {
        let (var, coef) = term.split_once(':').ok_or_else(bad)?;
        let var: usize = var.parse().map_err(|_| bad())?;
        let coef: i64 = coef.parse().map_err(|_| bad())?;
        if var >= variables {
            return Err(SolveError::malformed(format!(
                "unknown {var} out of range in `{line}`"
            )));
        }
        eq.add_term(var, coef);
    }
    Ok(eq)
}

#[derive(Clone, Debug, PartialEq)]
pub enum Results {
    Sat(Vec<(usize, BigRational)>),
    Unsat,
}

pub fn render_results(results: &Results) -> String {
    match results {
        Results::Unsat => "unsat\n".to_string(),
        Results::Sat(values) => {
            let mut out = String::from("sat\n");
            for (var, value) in values {
                out.push_str(&format!("{var} {value}\n"));
            }
            out
        }
    }
}

pub fn parse_results(text: &str) -> Result<Results, SolveError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    match lines.next() {
        Some("unsat") => Ok(Results::Unsat),
        Some("sat") => {
            let mut values = Vec::new();
            for line in lines {
                let bad = || SolveError::malformed(format!("bad result line `{line}`"));
                let (var, value) = line.split_once(char::is_whitespace).ok_or_else(bad)?;
                let var: usize = var.parse().map_err(|_| bad())?;
                let value: BigRational = value.trim().parse().map_err(|_| bad())?;
                values.push((var, value));
            }
            Ok(Results::Sat(values))
        }
        Some(other) => Err(SolveError::malformed(format!(
            "results must start with `sat` or `unsat`, found `{other}`"
        ))),
        None => Err(SolveError::malformed("empty results stream")),
    }
}

#[cfg(test)]
pub(crate) fn rational(n: i64) -> BigRational {
    BigRational::from_integer(num_bigint::BigInt::from(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_what_group_systems_render() {
        let sys = parse_system("3\n2\n0:1 2:-1 = 0\n1:1 = 1\n").unwrap();
        assert_eq!(sys.variables, 3);
        assert_eq!(sys.equations.len(), 2);
        assert_eq!(sys.equations[1].rhs(), 1);
        assert_eq!(sys.equations[0].terms().collect::<Vec<_>>(), vec![(0, 1), (2, -1)]);
    }

    #[test]
    fn rejects_count_mismatch_and_out_of_range_unknowns() {
        assert!(parse_system("1\n2\n0:1 = 0\n").is_err());
        assert!(parse_system("1\n1\n4:1 = 0\n").is_err());
        assert!(parse_system("x\n").is_err());
    }

    #[test]
    fn results_accept_rationals() {
        let r = parse_results("sat\n0 3\n1 -1/2\n").unwrap();
        let half: BigRational = "-1/2".parse().unwrap();
        assert_eq!(r, Results::Sat(vec![(0, rational(3)), (1, half)]));
        assert_eq!(parse_results("unsat\n").unwrap(), Results::Unsat);
        assert!(parse_results("maybe\n").is_err());
    }

    #[test]
    fn rendered_results_parse_back() {
        let r = Results::Sat(vec![(2, rational(-4))]);
        assert_eq!(render_results(&r), "sat\n2 -4\n");
        assert_eq!(parse_results(&render_results(&r)).unwrap(), r);
    }
}
