#![forbid(unsafe_code)]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use super::format::{parse_system, render_results, ParsedSystem, Results};
use crate::solver::SolveError;

/// Consumes a serialized system and returns a results stream.
pub trait Eliminator: Send + Sync {
    fn name(&self) -> String;

    fn eliminate(&self, system: &str) -> Result<String, SolveError>;
}

/// Exact elimination. Rational Gauss-Jordan first, with free unknowns at zero;
/// when a pivot comes out fractional, an integral solution is searched for
/// with unimodular column operations before the group is declared unsat.
#[derive(Clone, Copy, Debug, Default)]
pub struct InProcessEliminator;

impl InProcessEliminator {
    /// `rows` are augmented: `variables` coefficients followed by the right-hand side.
    pub fn solve(variables: usize, rows: &[Vec<BigInt>]) -> Results {
        match rational_solution(variables, rows) {
            Results::Sat(values) if values.iter().any(|(_, v)| !v.is_integer()) => {
                tracing::debug!(variables, "fractional pivot, searching for an integral solution");
                integral_solution(variables, rows)
            }
            other => other,
        }
    }

    pub fn solve_system(system: &ParsedSystem) -> Results {
        let rows: Vec<Vec<BigInt>> = system
            .equations
            .iter()
            .map(|eq| {
                let mut row = vec![BigInt::zero(); system.variables + 1];
                for (var, coef) in eq.terms() {
                    row[var] = BigInt::from(coef);
                }
                row[system.variables] = BigInt::from(eq.rhs());
                row
            })
            .collect();
        Self::solve(system.variables, &rows)
    }
}

fn rational_solution(variables: usize, rows: &[Vec<BigInt>]) -> Results {
    let mut m: Vec<Vec<BigRational>> = rows
        .iter()
        .map(|row| row.iter().cloned().map(BigRational::from_integer).collect())
        .collect();
    let width = variables + 1;
    let mut pivots: Vec<(usize, usize)> = Vec::new();
    let mut next = 0;

    for col in 0..variables {
        let Some(found) = (next..m.len()).find(|&r| !m[r][col].is_zero()) else {
            continue;
        };
        m.swap(next, found);

        let p = m[next][col].clone();
        for k in 0..width {
            m[next][k] = &m[next][k] / &p;
        }

        let pivot_row = m[next].clone();
        for (r, row) in m.iter_mut().enumerate() {
            if r == next || row[col].is_zero() {
                continue;
            }
            let factor = row[col].clone();
            for k in 0..width {
                row[k] = &row[k] - &factor * &pivot_row[k];
            }
        }

        pivots.push((next, col));
        next += 1;
    }

    // Rows below the last pivot have no coefficients left.
    if m[next..].iter().any(|row| !row[variables].is_zero()) {
        return Results::Unsat;
    }

    Results::Sat(
        pivots
            .into_iter()
            .map(|(row, col)| (col, m[row][variables].clone()))
            .collect(),
    )
}

/// Decides `A x = b` over the integers.
///
/// Column operations reduce `A` to a lower echelon form `H = A U` with `U`
/// unimodular, so `H y = b` is integrally solvable exactly when `A x = b` is,
/// and `x = U y`. Rows are processed top to bottom; earlier rows are already
/// zero to the right of their pivot, so later column operations leave them alone.
fn integral_solution(variables: usize, rows: &[Vec<BigInt>]) -> Results {
    let mut h: Vec<Vec<BigInt>> = rows.iter().map(|row| row[..variables].to_vec()).collect();
    let mut u: Vec<Vec<BigInt>> = (0..variables)
        .map(|i| {
            (0..variables)
                .map(|j| if i == j { BigInt::one() } else { BigInt::zero() })
                .collect()
        })
        .collect();
    let mut y = vec![BigInt::zero(); variables];
    let mut pivot = 0;

    for (i, row) in rows.iter().enumerate() {
        if pivot < variables {
            for j in pivot + 1..variables {
                if h[i][j].is_zero() {
                    continue;
                }
                let (g, s, t) = extended_gcd(&h[i][pivot], &h[i][j]);
                let p = &h[i][j] / &g;
                let q = &h[i][pivot] / &g;
                for m in [&mut h, &mut u] {
                    for r in m.iter_mut() {
                        let (a, c) = (r[pivot].clone(), r[j].clone());
                        r[pivot] = &s * &a + &t * &c;
                        r[j] = &q * &c - &p * &a;
                    }
                }
            }
        }

        let mut residual = row[variables].clone();
        for (coef, value) in h[i].iter().zip(&y).take(pivot) {
            residual -= coef * value;
        }

        if pivot < variables && !h[i][pivot].is_zero() {
            if !(&residual % &h[i][pivot]).is_zero() {
                return Results::Unsat;
            }
            y[pivot] = &residual / &h[i][pivot];
            pivot += 1;
        } else if !residual.is_zero() {
            return Results::Unsat;
        }
    }

    Results::Sat(
        u.iter()
            .enumerate()
            .filter_map(|(var, urow)| {
                let value: BigInt = urow.iter().zip(&y).map(|(a, b)| a * b).sum();
                (!value.is_zero()).then(|| (var, BigRational::from_integer(value)))
            })
            .collect(),
    )
}

/// `(g, s, t)` with `g = gcd(a, b) >= 0` and `s * a + t * b = g`.
fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());
    while !r.is_zero() {
        let quotient = &old_r / &r;
        let next_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, next_s);
        let next_t = &old_t - &quotient * &t;
        old_t = std::mem::replace(&mut t, next_t);
    }
    if old_r.is_negative() {
        (-old_r, -old_s, -old_t)
    } else {
        (old_r, old_s, old_t)
    }
}

impl Eliminator for InProcessEliminator {
    fn name(&self) -> String {
        "in-process".to_string()
    }

    fn eliminate(&self, system: &str) -> Result<String, SolveError> {
        let parsed = parse_system(system)?;
        Ok(render_results(&Self::solve_system(&parsed)))
    }
}

/// Runs an external program: the system goes to stdin, results come from stdout.
#[derive(Clone, Debug)]
pub struct ExternalEliminator {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalEliminator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl Eliminator for ExternalEliminator {
    fn name(&self) -> String {
        self.program.display().to_string()
    }

    fn eliminate(&self, system: &str) -> Result<String, SolveError> {
        let program = self.program.display();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SolveError::unavailable(format!("cannot start `{program}`: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(system.as_bytes())
                .map_err(|e| SolveError::unavailable(format!("writing to `{program}`: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| SolveError::unavailable(format!("waiting for `{program}`: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SolveError::unavailable(format!(
                "`{program}` exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| SolveError::malformed(format!("`{program}` wrote non-UTF-8 output")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gje::format::{parse_results, rational};

    fn run(system: &str) -> Results {
        parse_results(&InProcessEliminator.eliminate(system).unwrap()).unwrap()
    }

    #[test]
    fn solves_a_determined_system() {
        // x0 - x1 = 0, x1 = 2
        assert_eq!(
            run("2\n2\n0:1 1:-1 = 0\n1:1 = 2\n"),
            Results::Sat(vec![(0, rational(2)), (1, rational(2))])
        );
    }

    #[test]
    fn free_unknowns_are_zero() {
        // x0 + x1 = 3 leaves x1 free.
        assert_eq!(
            run("2\n1\n0:1 1:1 = 3\n"),
            Results::Sat(vec![(0, rational(3))])
        );
    }

    #[test]
    fn inconsistent_rows_are_unsat() {
        assert_eq!(run("1\n2\n0:1 = 1\n0:1 = 2\n"), Results::Unsat);
    }

    #[test]
    fn odd_multiple_of_two_is_unsat() {
        assert_eq!(run("1\n1\n0:2 = 1\n"), Results::Unsat);
        // 2 x0 + 4 x1 = 3 has rational but no integral solutions.
        assert_eq!(run("2\n1\n0:2 1:4 = 3\n"), Results::Unsat);
    }

    #[test]
    fn free_unknowns_are_moved_off_zero_when_needed() {
        // 2 x0 - x1 = 1: leaving x1 at zero would need x0 = 1/2.
        let Results::Sat(values) = run("2\n1\n0:2 1:-1 = 1\n") else {
            panic!("expected an integral solution");
        };
        let get = |var: usize| {
            values
                .iter()
                .find(|(v, _)| *v == var)
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| rational(0))
        };
        assert!(values.iter().all(|(_, v)| v.is_integer()));
        assert_eq!(rational(2) * get(0) - get(1), rational(1));
    }

    #[test]
    fn integral_solution_satisfies_every_row() {
        // t - 2 x = 0, r - t = 1 over (x, t, r).
        let rows = vec![
            vec![BigInt::from(-2), BigInt::from(1), BigInt::from(0), BigInt::from(0)],
            vec![BigInt::from(0), BigInt::from(-1), BigInt::from(1), BigInt::from(1)],
        ];
        let Results::Sat(values) = integral_solution(3, &rows) else {
            panic!("expected an integral solution");
        };
        let mut x = vec![BigInt::zero(); 3];
        for (var, value) in values {
            assert!(value.is_integer());
            x[var] = value.to_integer();
        }
        for row in &rows {
            let lhs: BigInt = row[..3].iter().zip(&x).map(|(a, b)| a * b).sum();
            assert_eq!(lhs, row[3]);
        }
    }

    #[test]
    fn extended_gcd_is_normalized() {
        let (g, s, t) = extended_gcd(&BigInt::from(-4), &BigInt::from(6));
        assert_eq!(g, BigInt::from(2));
        assert_eq!(s * BigInt::from(-4) + t * BigInt::from(6), g);
        let (g, _, t) = extended_gcd(&BigInt::zero(), &BigInt::from(-3));
        assert_eq!((g, t), (BigInt::from(3), BigInt::from(-1)));
    }

    #[test]
    fn missing_program_is_unavailable() {
        let e = ExternalEliminator::new("/nonexistent/units-gje-solver");
        assert!(matches!(
            e.eliminate("1\n1\n0:1 = 0\n"),
            Err(SolveError::Unavailable { .. })
        ));
    }
}
