#![forbid(unsafe_code)]

//! Checks a fully assigned [`Solution`] against a [`ConstraintModel`].
//!
//! Used in checking mode, where annotations already fix every unit and the
//! solver output (or a hand-written assignment) only has to be validated.

use crate::algebra;
use crate::model::{Constraint, ConstraintModel, Slot, SlotId, Solution};
use crate::unit::Unit;

/// A constraint the assignment does not satisfy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub constraint: Constraint,
    pub message: String,
}

/// Returns every violated constraint, in model order.
///
/// Variable slots missing from `solution` are reported once per constraint that
/// mentions them.
pub fn check_solution(model: &ConstraintModel, solution: &Solution) -> Vec<Violation> {
    let mut violations = Vec::new();

    for constraint in model.constraints() {
        let found = check_one(model, solution, constraint).unwrap_or_else(Some);
        if let Some(message) = found {
            tracing::debug!(constraint = %constraint, %message, "constraint violated");
            violations.push(Violation {
                constraint: *constraint,
                message,
            });
        }
    }

    violations
}

/// `Ok(Some(msg))` when violated, `Err(msg)` when a slot has no unit at all.
fn check_one(
    model: &ConstraintModel,
    solution: &Solution,
    constraint: &Constraint,
) -> Result<Option<String>, String> {
    let unit = |id: SlotId| -> Result<Unit, String> {
        solution.resolve(model, id).ok_or_else(|| {
            let loc = match model.slot(id) {
                Slot::Variable(loc) => loc.to_string(),
                Slot::Constant(_) => String::new(),
            };
            format!("slot #{id} ({loc}) has no unit assigned")
        })
    };

    Ok(match *constraint {
        Constraint::Subtype { sub, sup } => {
            let (a, b) = (unit(sub)?, unit(sup)?);
            (!algebra::is_subtype(&a, &b)).then(|| format!("{a} is not a subtype of {b}"))
        }
        Constraint::Equality { lhs, rhs } => {
            let (a, b) = (unit(lhs)?, unit(rhs)?);
            (a != b).then(|| format!("{a} differs from {b}"))
        }
        Constraint::LeastUpperBound { lhs, rhs, result } => {
            let (a, b, r) = (unit(lhs)?, unit(rhs)?, unit(result)?);
            let want = algebra::least_upper_bound(&a, &b);
            (want != r).then(|| format!("lub({a}, {b}) is {want}, found {r}"))
        }
        Constraint::Product { lhs, rhs, result } => {
            let (a, b, r) = (unit(lhs)?, unit(rhs)?, unit(result)?);
            let want = algebra::multiply(&a, &b);
            (want != r).then(|| format!("{a} * {b} is {want}, found {r}"))
        }
        Constraint::Quotient { lhs, rhs, result } => {
            let (a, b, r) = (unit(lhs)?, unit(rhs)?, unit(result)?);
            match algebra::divide(&a, &b) {
                Ok(want) => (want != r).then(|| format!("{a} / {b} is {want}, found {r}")),
                Err(err) => Some(err.to_string()),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitVector;

    fn velocity() -> Unit {
        Unit::Concrete(UnitVector::base("m").with("s", -1))
    }

    #[test]
    fn correct_assignment_has_no_violations() {
        let mut m = ConstraintModel::new();
        let dist = m.new_constant_slot(Unit::base("m"));
        let time = m.new_constant_slot(Unit::base("s"));
        let speed = m.new_variable_slot("speed");
        m.arithmetic_quotient(dist, time, speed);

        let sol: Solution = [(speed, velocity())].into_iter().collect();
        assert!(check_solution(&m, &sol).is_empty());
    }

    #[test]
    fn wrong_product_is_reported() {
        let mut m = ConstraintModel::new();
        let a = m.new_constant_slot(Unit::base("m"));
        let b = m.new_constant_slot(Unit::base("m"));
        let area = m.new_variable_slot("area");
        m.arithmetic_product(a, b, area);

        let sol: Solution = [(area, Unit::base("m"))].into_iter().collect();
        let v = check_solution(&m, &sol);
        assert_eq!(v.len(), 1);
        assert!(v[0].message.contains("found m"));
    }

    #[test]
    fn dividing_by_bottom_is_a_violation() {
        let mut m = ConstraintModel::new();
        let a = m.new_constant_slot(Unit::base("m"));
        let null = m.new_constant_slot(Unit::Bottom);
        let r = m.new_variable_slot("r");
        m.arithmetic_quotient(a, null, r);

        let sol: Solution = [(r, Unit::Top)].into_iter().collect();
        let v = check_solution(&m, &sol);
        assert_eq!(v.len(), 1);
        assert!(v[0].message.contains("cannot divide"));
    }

    #[test]
    fn unassigned_variables_are_violations() {
        let mut m = ConstraintModel::new();
        let a = m.new_variable_slot("Demo.java:4");
        let b = m.new_constant_slot(Unit::base("s"));
        m.subtype(a, b);

        let v = check_solution(&m, &Solution::new());
        assert_eq!(v.len(), 1);
        assert!(v[0].message.contains("Demo.java:4"));
    }

    #[test]
    fn top_result_is_accepted_as_supertype() {
        let mut m = ConstraintModel::new();
        let a = m.new_constant_slot(Unit::base("m"));
        let top = m.new_variable_slot("t");
        m.subtype(a, top);
        let sol: Solution = [(top, Unit::Top)].into_iter().collect();
        assert!(check_solution(&m, &sol).is_empty());
    }

    #[test]
    fn extreme_prefixes_are_checked_without_overflow() {
        let mut m = ConstraintModel::new();
        let huge = m.new_constant_slot(Unit::Concrete(UnitVector::with_prefix(i32::MAX)));
        let kilo = m.new_constant_slot(Unit::Concrete(UnitVector::with_prefix(3)));
        let r = m.new_variable_slot("r");
        m.arithmetic_product(huge, kilo, r);

        let sol: Solution = [(r, Unit::dimensionless())].into_iter().collect();
        let v = check_solution(&m, &sol);
        assert_eq!(v.len(), 1);
        assert!(v[0].message.contains("is UnknownUnits"));
    }
}
