#![forbid(unsafe_code)]

pub mod components;
pub mod gje;
pub mod smt;
mod solver;

pub use components::{Component, SerializedComponents};
pub use gje::{Eliminator, ExternalEliminator, GjeSolver, InProcessEliminator};
pub use smt::{NoZ3Engine, SmtEngine, SmtSolver};
#[cfg(feature = "z3")]
pub use smt::z3_engine::Z3Engine;
pub use solver::{Backend, BackendKind, SolveError, SolveStatistics, Solved, UnitsSolver};
