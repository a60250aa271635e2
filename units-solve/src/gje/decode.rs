#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use num_traits::ToPrimitive;
use units_core::{ConstraintModel, SlotId, Solution, Unit, UnitVector};

use super::eliminate::InProcessEliminator;
use super::encode::GjeEncoding;
use super::equation::GroupSystem;
use super::format::{parse_results, parse_system, Results};
use crate::components::Component;
use crate::solver::SolveError;

/// Integral values for one group, keyed by unknown index.
pub type GroupValues = BTreeMap<usize, i32>;

/// Reads one group's results stream.
///
/// A tool that leaves free unknowns at zero may report fractional values for a
/// system that still has integral solutions, so such an answer is re-decided
/// exactly before the group counts as unsatisfiable.
pub fn decode_group(
    group: &GroupSystem,
    unknowns: &[SlotId],
    text: &str,
) -> Result<GroupValues, SolveError> {
    let component = &group.component;
    let inconsistent = || {
        SolveError::unsatisfiable(format!("equations over `{component}` are inconsistent"))
    };
    let mut values = match parse_results(text)? {
        Results::Unsat => return Err(inconsistent()),
        Results::Sat(values) => values,
    };

    if values.iter().any(|(_, value)| !value.is_integer()) {
        tracing::debug!(%component, "fractional result, re-deciding over the integers");
        values = match InProcessEliminator::solve_system(&parse_system(&group.to_text())?) {
            Results::Sat(values) => values,
            Results::Unsat => {
                return Err(SolveError::unsatisfiable(format!(
                    "equations over `{component}` have no integral solution"
                )));
            }
        };
    }

    let mut out = GroupValues::new();
    for (var, value) in values {
        let slot = unknowns.get(var).ok_or_else(|| {
            SolveError::malformed(format!("result for unknown {var}, which does not exist"))
        })?;
        let n = value
            .is_integer()
            .then(|| value.to_integer().to_i32())
            .flatten()
            .ok_or_else(|| {
                SolveError::malformed(format!("exponent {value} for slot #{slot} is out of range"))
            })?;
        out.insert(var, n);
    }
    Ok(out)
}

/// Assembles units for every variable slot.
///
/// Unknowns missing from a group's results, and components with no group at
/// all, read as zero.
pub fn assemble(
    model: &ConstraintModel,
    encoding: &GjeEncoding,
    solved: &[(&Component, GroupValues)],
) -> Solution {
    let index_of: BTreeMap<SlotId, usize> = encoding
        .unknowns
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();

    let mut solution = Solution::new();
    for (id, _) in model.variables() {
        if let Some(unit) = encoding.categorical.get(&id) {
            solution.insert(id, unit.clone());
            continue;
        }
        let mut vector = UnitVector::dimensionless();
        if let Some(&var) = index_of.get(&id) {
            for (component, values) in solved {
                if let Some(&n) = values.get(&var) {
                    component.assign(&mut vector, n);
                }
            }
        }
        solution.insert(id, Unit::Concrete(vector));
    }
    solution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gje::equation::Equation;

    fn group() -> GroupSystem {
        GroupSystem::new(Component::Dimension("m".into()), 2)
    }

    #[test]
    fn integral_values_are_kept() {
        let unknowns = [SlotId::new(4), SlotId::new(7)];
        let values = decode_group(&group(), &unknowns, "sat\n1 -2\n").unwrap();
        assert_eq!(values.get(&1), Some(&-2));
        assert_eq!(values.get(&0), None);
    }

    fn system(terms: &[(usize, i64)], rhs: i64) -> GroupSystem {
        let mut g = group();
        let mut eq = Equation::new();
        for &(var, coef) in terms {
            eq.add_term(var, coef);
        }
        eq.add_rhs(rhs);
        g.push(&eq);
        g
    }

    #[test]
    fn fractional_answer_is_replaced_by_an_integral_one() {
        // 2 x0 - x1 = 1; the tool fixed x1 at zero.
        let g = system(&[(0, 2), (1, -1)], 1);
        let unknowns = [SlotId::new(4), SlotId::new(7)];
        let values = decode_group(&g, &unknowns, "sat\n0 1/2\n").unwrap();
        let get = |var| values.get(&var).copied().unwrap_or(0);
        assert_eq!(2 * get(0) - get(1), 1);
    }

    #[test]
    fn no_integral_solution_is_unsatisfiable() {
        let g = system(&[(0, 2)], 1);
        let unknowns = [SlotId::new(4), SlotId::new(7)];
        match decode_group(&g, &unknowns, "sat\n0 1/2\n") {
            Err(SolveError::Unsatisfiable { reasons }) => {
                assert_eq!(
                    reasons,
                    vec!["equations over `m` have no integral solution".to_string()]
                );
            }
            other => panic!("expected unsat, got {other:?}"),
        }
    }

    #[test]
    fn unknown_index_out_of_range_is_malformed() {
        assert!(matches!(
            decode_group(&group(), &[SlotId::new(0)], "sat\n3 1\n"),
            Err(SolveError::MalformedOutput { .. })
        ));
    }
}
