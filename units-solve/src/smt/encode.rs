#![forbid(unsafe_code)]

use units_core::{ArithmeticUnitError, Constraint, ConstraintModel, Slot, SlotId, Unit};

use super::formula::{Formula, SmtProblem, Sort, Term};
use crate::components::SerializedComponents;
use crate::solver::SolveError;

pub const TOP_MARKER: &str = "UnknownUnits";
pub const BOTTOM_MARKER: &str = "UnitsBottom";

/// `<slotId>-<component>`.
pub fn var_name(slot: SlotId, component: &str) -> String {
    format!("{slot}-{component}")
}

/// A slot seen through the encoding: two flags plus one integer per component.
#[derive(Clone, Debug)]
struct SlotTerms {
    top: Formula,
    bottom: Formula,
    components: Vec<Term>,
}

impl SlotTerms {
    fn concrete(&self) -> Formula {
        Formula::and([self.top.clone().not(), self.bottom.clone().not()])
    }
}

struct Encoder<'a> {
    model: &'a ConstraintModel,
    components: &'a SerializedComponents,
}

impl Encoder<'_> {
    fn terms(&self, id: SlotId) -> SlotTerms {
        match self.model.slot(id) {
            Slot::Variable(_) => SlotTerms {
                top: Formula::var(var_name(id, TOP_MARKER)),
                bottom: Formula::var(var_name(id, BOTTOM_MARKER)),
                components: self
                    .components
                    .iter()
                    .map(|c| Term::var(var_name(id, c.name())))
                    .collect(),
            },
            Slot::Constant(unit) => self.literal(unit),
        }
    }

    fn literal(&self, unit: &Unit) -> SlotTerms {
        let zeros = || -> Vec<Term> {
            self.components.iter().map(|_| Term::lit(0)).collect()
        };
        match unit {
            // Polymorphic constants are placeholders; they behave like Top here.
            Unit::Top | Unit::Polymorphic => SlotTerms {
                top: Formula::True,
                bottom: Formula::False,
                components: zeros(),
            },
            Unit::Bottom => SlotTerms {
                top: Formula::False,
                bottom: Formula::True,
                components: zeros(),
            },
            Unit::Concrete(v) => SlotTerms {
                top: Formula::False,
                bottom: Formula::False,
                components: self
                    .components
                    .iter()
                    .map(|c| Term::lit(i64::from(c.value_of(v))))
                    .collect(),
            },
        }
    }

    fn same(a: &SlotTerms, b: &SlotTerms) -> Formula {
        let mut parts = vec![
            Formula::iff(a.top.clone(), b.top.clone()),
            Formula::iff(a.bottom.clone(), b.bottom.clone()),
        ];
        parts.extend(
            a.components
                .iter()
                .zip(&b.components)
                .map(|(x, y)| Formula::int_eq(x.clone(), y.clone())),
        );
        Formula::and(parts)
    }

    /// `Top` if either operand is `Top`, else `Bottom` if either is `Bottom`,
    /// else the component-wise sum (`sign = 1`) or difference (`sign = -1`).
    fn arithmetic(l: &SlotTerms, r: &SlotTerms, res: &SlotTerms, sign: i64) -> Formula {
        let any_top = Formula::or([l.top.clone(), r.top.clone()]);
        let any_bottom = Formula::or([l.bottom.clone(), r.bottom.clone()]);

        let combined = l
            .components
            .iter()
            .zip(&r.components)
            .zip(&res.components)
            .map(|((x, y), z)| {
                let value = if sign > 0 {
                    x.clone().add(y.clone())
                } else {
                    x.clone().sub(y.clone())
                };
                Formula::int_eq(z.clone(), value)
            });

        Formula::and([
            Formula::implies(any_top.clone(), res.top.clone()),
            Formula::implies(
                Formula::and([any_top.not(), any_bottom]),
                res.bottom.clone(),
            ),
            Formula::implies(
                Formula::and([l.concrete(), r.concrete()]),
                Formula::and(std::iter::once(res.concrete()).chain(combined)),
            ),
        ])
    }

    fn lub(l: &SlotTerms, r: &SlotTerms, res: &SlotTerms) -> Formula {
        let any_top = Formula::or([l.top.clone(), r.top.clone()]);
        let no_top = any_top.clone().not();
        let both_concrete = Formula::and([l.concrete(), r.concrete()]);
        let equal = Self::same(l, r);

        Formula::and([
            Formula::implies(any_top, res.top.clone()),
            Formula::implies(
                Formula::and([no_top.clone(), l.bottom.clone()]),
                Self::same(res, r),
            ),
            Formula::implies(
                Formula::and([no_top, r.bottom.clone()]),
                Self::same(res, l),
            ),
            Formula::implies(
                Formula::and([both_concrete.clone(), equal.clone()]),
                Self::same(res, l),
            ),
            Formula::implies(Formula::and([both_concrete, equal.not()]), res.top.clone()),
        ])
    }

    fn constraint(&self, c: &Constraint) -> Result<Formula, SolveError> {
        Ok(match *c {
            Constraint::Subtype { sub, sup } => {
                let (a, b) = (self.terms(sub), self.terms(sup));
                Formula::or([b.top.clone(), a.bottom.clone(), Self::same(&a, &b)])
            }
            Constraint::Equality { lhs, rhs } => Self::same(&self.terms(lhs), &self.terms(rhs)),
            Constraint::LeastUpperBound { lhs, rhs, result } => Self::lub(
                &self.terms(lhs),
                &self.terms(rhs),
                &self.terms(result),
            ),
            Constraint::Product { lhs, rhs, result } => Self::arithmetic(
                &self.terms(lhs),
                &self.terms(rhs),
                &self.terms(result),
                1,
            ),
            Constraint::Quotient { lhs, rhs, result } => {
                if let Slot::Constant(Unit::Bottom) = self.model.slot(rhs) {
                    return Err(ArithmeticUnitError {
                        dividend: self.model.slot(lhs).constant().cloned().unwrap_or(Unit::Top),
                        divisor: Unit::Bottom,
                    }
                    .into());
                }
                let divisor = self.terms(rhs);
                Formula::and([
                    divisor.bottom.clone().not(),
                    Self::arithmetic(&self.terms(lhs), &divisor, &self.terms(result), -1),
                ])
            }
        })
    }

    fn well_formed(&self, id: SlotId) -> Formula {
        let t = self.terms(id);
        let zero = |terms: &[Term]| {
            Formula::and(terms.iter().map(|x| Formula::int_eq(x.clone(), Term::lit(0))))
        };
        Formula::and([
            Formula::and([t.top.clone(), t.bottom.clone()]).not(),
            Formula::implies(t.top.clone(), zero(&t.components)),
            Formula::implies(t.bottom.clone(), zero(&t.components)),
        ])
    }
}

/// Builds the SMT problem for `model` over the given components.
pub fn encode(
    model: &ConstraintModel,
    components: &SerializedComponents,
) -> Result<SmtProblem, SolveError> {
    let enc = Encoder { model, components };
    let mut problem = SmtProblem::new();

    for (id, location) in model.variables() {
        problem.declare(var_name(id, TOP_MARKER), Sort::Bool);
        problem.declare(var_name(id, BOTTOM_MARKER), Sort::Bool);
        for c in components.iter() {
            problem.declare(var_name(id, c.name()), Sort::Int);
        }

        problem.assert(
            format!("wf{id}"),
            format!("slot #{id} ({location}) is well-formed"),
            enc.well_formed(id),
        );
        problem.assert_soft(enc.terms(id).concrete(), 1);
    }

    for (index, constraint) in model.constraints().iter().enumerate() {
        let formula = enc.constraint(constraint)?;
        tracing::debug!(%constraint, formula = %formula, "encoded constraint");
        problem.assert(format!("c{index}"), constraint.to_string(), formula);
    }

    Ok(problem)
}
