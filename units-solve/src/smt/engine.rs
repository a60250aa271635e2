#![forbid(unsafe_code)]

use super::formula::SmtProblem;
use crate::solver::SolveError;

/// What an engine reports for one [`SmtProblem`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineOutcome {
    /// `model` is `<variable-name> <value>` lines, one per declaration.
    Sat { model: String },
    /// Labels of the hard assertions in the unsat core (possibly empty).
    Unsat { core: Vec<String> },
    Unknown { reason: String },
}

pub trait SmtEngine {
    fn name(&self) -> &'static str;

    fn check(
        &self,
        problem: &SmtProblem,
        timeout_ms: Option<u32>,
    ) -> Result<EngineOutcome, SolveError>;
}

/// Fallback engine when compiled without `--features units-solve/z3`.
///
/// This keeps the workspace buildable on machines without Z3.
pub struct NoZ3Engine;

impl SmtEngine for NoZ3Engine {
    fn name(&self) -> &'static str {
        "none"
    }

    fn check(
        &self,
        _problem: &SmtProblem,
        _timeout_ms: Option<u32>,
    ) -> Result<EngineOutcome, SolveError> {
        Err(SolveError::unavailable(
            "Z3 engine is not enabled. Rebuild with `--features units-solve/z3` or use the `gje` backend.",
        ))
    }
}
