#![forbid(unsafe_code)]

//! Linear-algebra backend.
//!
//! Each serialized component (the prefix or one dimension) gets its own
//! system; unknowns never interact across components, so the groups are
//! eliminated independently and in parallel.

pub mod decode;
pub mod eliminate;
pub mod encode;
pub mod equation;
pub mod format;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use rayon::prelude::*;
use units_core::ConstraintModel;

pub use eliminate::{Eliminator, ExternalEliminator, InProcessEliminator};
pub use equation::GroupSystem;

use crate::components::SerializedComponents;
use crate::solver::{elapsed_ms, BackendKind, SolveError, SolveStatistics, Solved, UnitsSolver};

pub struct GjeSolver {
    eliminator: Box<dyn Eliminator>,
    dump_dir: Option<PathBuf>,
}

impl GjeSolver {
    pub fn new(eliminator: Box<dyn Eliminator>) -> Self {
        Self {
            eliminator,
            dump_dir: None,
        }
    }

    pub fn in_process() -> Self {
        Self::new(Box::new(InProcessEliminator))
    }

    /// Also write every group system to `dir` as `gjeConstraints_<component>.gje`.
    pub fn with_dump_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dump_dir = dir;
        self
    }

    pub fn eliminator_name(&self) -> String {
        self.eliminator.name()
    }

    /// The group systems `solve` would eliminate.
    pub fn systems(&self, model: &ConstraintModel) -> Result<Vec<GroupSystem>, SolveError> {
        Ok(encode::encode(model, &SerializedComponents::of(model))?.groups)
    }

    fn dump(&self, groups: &[GroupSystem]) {
        let Some(dir) = &self.dump_dir else {
            return;
        };
        if let Err(e) = fs::create_dir_all(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot create dump directory");
            return;
        }
        for g in groups {
            let path = dir.join(g.file_name());
            if let Err(e) = fs::write(&path, g.to_text()) {
                tracing::warn!(path = %path.display(), error = %e, "cannot write equation group");
            }
        }
    }
}

impl UnitsSolver for GjeSolver {
    fn kind(&self) -> BackendKind {
        BackendKind::Gje
    }

    fn solve(&self, model: &ConstraintModel) -> Result<Solved, SolveError> {
        let mut stats = SolveStatistics::new(BackendKind::Gje);

        let started = Instant::now();
        let components = SerializedComponents::of(model);
        let encoding = encode::encode(model, &components)?;
        self.dump(&encoding.groups);
        stats.serialization_ms = elapsed_ms(started);
        stats.variables = encoding.unknowns.len();
        stats.equations = encoding.groups.iter().map(|g| g.equations.len()).sum();
        stats.groups = encoding.groups.len();

        let started = Instant::now();
        let results: Vec<Result<decode::GroupValues, SolveError>> = encoding
            .groups
            .par_iter()
            .map(|g| {
                let text = self.eliminator.eliminate(&g.to_text())?;
                decode::decode_group(g, &encoding.unknowns, &text)
            })
            .collect();
        stats.solving_ms = elapsed_ms(started);
        stats.log();

        let mut solved = Vec::with_capacity(results.len());
        let mut reasons = Vec::new();
        for (group, result) in encoding.groups.iter().zip(results) {
            match result {
                Ok(values) => solved.push((&group.component, values)),
                Err(SolveError::Unsatisfiable { reasons: r }) => reasons.extend(r),
                Err(other) => return Err(other),
            }
        }
        if !reasons.is_empty() {
            return Err(SolveError::Unsatisfiable { reasons });
        }

        Ok(Solved {
            solution: decode::assemble(model, &encoding, &solved),
            statistics: stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use units_core::{Unit, UnitVector};

    /// Always answers with the same stream.
    struct Canned(&'static str);

    impl Eliminator for Canned {
        fn name(&self) -> String {
            "canned".into()
        }

        fn eliminate(&self, _system: &str) -> Result<String, SolveError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn area_of_two_lengths() {
        let mut m = ConstraintModel::new();
        let a = m.new_constant_slot(Unit::Concrete(UnitVector::with_prefix(3).with("m", 1)));
        let b = m.new_variable_slot("b");
        let area = m.new_variable_slot("area");
        m.equal(b, a);
        m.arithmetic_product(a, b, area);

        let solved = GjeSolver::in_process().solve(&m).unwrap();
        assert_eq!(
            solved.solution.get(area),
            Some(&Unit::Concrete(UnitVector::with_prefix(6).with("m", 2)))
        );
        assert_eq!(solved.statistics.groups, 2);
        assert_eq!(solved.statistics.variables, 2);
    }

    #[test]
    fn unsat_groups_are_collected() {
        let mut m = ConstraintModel::new();
        let a = m.new_constant_slot(Unit::base("m"));
        let x = m.new_variable_slot("x");
        m.equal(x, a);

        let solver = GjeSolver::new(Box::new(Canned("unsat\n")));
        match solver.solve(&m) {
            Err(SolveError::Unsatisfiable { reasons }) => assert_eq!(reasons.len(), 2),
            other => panic!("expected unsat, got {other:?}"),
        }
    }

    #[test]
    fn unreferenced_variables_are_dimensionless() {
        let mut m = ConstraintModel::new();
        let lonely = m.new_variable_slot("lonely");
        let solved = GjeSolver::in_process().solve(&m).unwrap();
        assert_eq!(solved.solution.get(lonely), Some(&Unit::dimensionless()));
    }
}
