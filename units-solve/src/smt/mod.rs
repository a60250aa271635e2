#![forbid(unsafe_code)]

//! SMT backend: every slot becomes two flags plus one integer per serialized
//! component, and an engine searches for a model preferring concrete units.

pub mod decode;
pub mod encode;
pub mod engine;
pub mod formula;
#[cfg(feature = "z3")]
pub mod z3_engine;

use std::time::Instant;

use units_core::ConstraintModel;

pub use engine::{EngineOutcome, NoZ3Engine, SmtEngine};
pub use formula::SmtProblem;

use crate::components::SerializedComponents;
use crate::solver::{elapsed_ms, BackendKind, SolveError, SolveStatistics, Solved, UnitsSolver};

pub struct SmtSolver {
    engine: Box<dyn SmtEngine>,
    timeout_ms: Option<u32>,
}

impl SmtSolver {
    pub fn new(engine: Box<dyn SmtEngine>) -> Self {
        Self {
            engine,
            timeout_ms: None,
        }
    }

    /// Z3 when the `z3` feature is on, otherwise the always-unavailable fallback.
    pub fn with_default_engine() -> Self {
        #[cfg(feature = "z3")]
        let engine: Box<dyn SmtEngine> = Box::new(z3_engine::Z3Engine::new());
        #[cfg(not(feature = "z3"))]
        let engine: Box<dyn SmtEngine> = Box::new(NoZ3Engine);
        Self::new(engine)
    }

    pub fn with_timeout(mut self, timeout_ms: Option<u32>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// The problem `solve` would hand to the engine.
    pub fn problem(&self, model: &ConstraintModel) -> Result<SmtProblem, SolveError> {
        encode::encode(model, &SerializedComponents::of(model))
    }
}

impl UnitsSolver for SmtSolver {
    fn kind(&self) -> BackendKind {
        BackendKind::Smt
    }

    fn solve(&self, model: &ConstraintModel) -> Result<Solved, SolveError> {
        let mut stats = SolveStatistics::new(BackendKind::Smt);

        let started = Instant::now();
        let components = SerializedComponents::of(model);
        let problem = encode::encode(model, &components)?;
        stats.serialization_ms = elapsed_ms(started);
        stats.variables = problem.declarations().len();
        stats.equations = problem.hard().len();
        stats.soft = problem.soft().len();
        stats.groups = 1;

        let started = Instant::now();
        let outcome = self.engine.check(&problem, self.timeout_ms)?;
        stats.solving_ms = elapsed_ms(started);
        stats.log();

        match outcome {
            EngineOutcome::Sat { model: text } => {
                let solution = decode::decode(model, &components, &text)?;
                Ok(Solved {
                    solution,
                    statistics: stats,
                })
            }
            EngineOutcome::Unsat { core } => {
                let mut reasons: Vec<String> = core
                    .iter()
                    .map(|label| {
                        problem
                            .origin_of(label)
                            .map(str::to_owned)
                            .unwrap_or_else(|| label.clone())
                    })
                    .collect();
                if reasons.is_empty() {
                    reasons.push("no unsat core reported".to_string());
                }
                tracing::debug!(?reasons, "unsat core");
                Err(SolveError::Unsatisfiable { reasons })
            }
            EngineOutcome::Unknown { reason } => match self.timeout_ms {
                Some(limit_ms) => Err(SolveError::Timeout { limit_ms }),
                None => Err(SolveError::Unavailable { reason }),
            },
        }
    }
}
