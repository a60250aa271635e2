#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use units_core::{ArithmeticUnitError, ConstraintModel, Solution};

use crate::gje::GjeSolver;
use crate::smt::SmtSolver;

#[derive(Debug, Error, Diagnostic)]
pub enum SolveError {
    #[error("constraints are unsatisfiable: {}", .reasons.join("; "))]
    #[diagnostic(
        code(units::solve::unsat),
        help("the listed constraints cannot all hold for any assignment of units")
    )]
    Unsatisfiable { reasons: Vec<String> },

    #[error("solver unavailable: {reason}")]
    #[diagnostic(code(units::solve::unavailable))]
    Unavailable { reason: String },

    #[error("solver gave up after {limit_ms} ms")]
    #[diagnostic(code(units::solve::timeout))]
    Timeout { limit_ms: u32 },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Arithmetic(#[from] ArithmeticUnitError),

    #[error("malformed solver output: {message}")]
    #[diagnostic(code(units::solve::model))]
    MalformedOutput { message: String },
}

impl SolveError {
    pub fn unsatisfiable(reason: impl Into<String>) -> Self {
        SolveError::Unsatisfiable {
            reasons: vec![reason.into()],
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        SolveError::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        SolveError::MalformedOutput {
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Smt,
    Gje,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Smt => f.write_str("smt"),
            BackendKind::Gje => f.write_str("gje"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smt" => Ok(BackendKind::Smt),
            "gje" => Ok(BackendKind::Gje),
            other => Err(format!("unknown backend `{other}` (expected `smt` or `gje`)")),
        }
    }
}

/// Size and timing of one solve.
///
/// For the SMT backend `equations` counts hard assertions and `soft` the
/// preference assertions; for GJE `equations` counts rows over all groups.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SolveStatistics {
    pub backend: BackendKind,
    pub serialization_ms: u64,
    pub solving_ms: u64,
    pub variables: usize,
    pub equations: usize,
    pub soft: usize,
    pub groups: usize,
}

impl SolveStatistics {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    pub(crate) fn log(&self) {
        tracing::info!(
            backend = %self.backend,
            serialization_ms = self.serialization_ms,
            solving_ms = self.solving_ms,
            variables = self.variables,
            equations = self.equations,
            soft = self.soft,
            groups = self.groups,
            "solve finished"
        );
    }
}

pub(crate) fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

#[derive(Clone, Debug)]
pub struct Solved {
    pub solution: Solution,
    pub statistics: SolveStatistics,
}

/// A backend that turns a constraint model into units for its variable slots.
///
/// Implementations never panic on solver failures; everything comes back as a
/// [`SolveError`] so the caller can still report partial results.
pub trait UnitsSolver {
    fn kind(&self) -> BackendKind;

    fn solve(&self, model: &ConstraintModel) -> Result<Solved, SolveError>;
}

/// The backend selected for a session.
pub enum Backend {
    Smt(SmtSolver),
    Gje(GjeSolver),
}

impl UnitsSolver for Backend {
    fn kind(&self) -> BackendKind {
        match self {
            Backend::Smt(s) => s.kind(),
            Backend::Gje(s) => s.kind(),
        }
    }

    fn solve(&self, model: &ConstraintModel) -> Result<Solved, SolveError> {
        let span = tracing::debug_span!("solve", backend = %self.kind());
        let _enter = span.enter();
        match self {
            Backend::Smt(s) => s.solve(model),
            Backend::Gje(s) => s.solve(model),
        }
    }
}
