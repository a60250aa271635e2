#![forbid(unsafe_code)]

//! Turns a constraint model into one linear system per serialized component.
//!
//! `Top` and `Bottom` never become rows. They are propagated to variable slots
//! first; a constraint that still mentions a categorical unit afterwards is
//! either trivially satisfied or a contradiction.

use std::collections::{BTreeMap, BTreeSet};

use units_core::{ArithmeticUnitError, Constraint, ConstraintModel, Slot, SlotId, Unit};

use super::equation::{Equation, GroupSystem};
use crate::components::SerializedComponents;
use crate::solver::SolveError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Category {
    Top,
    Bottom,
}

impl Category {
    fn unit(self) -> Unit {
        match self {
            Category::Top => Unit::Top,
            Category::Bottom => Unit::Bottom,
        }
    }
}

/// Exponent relation `sum(coef * slot) = 0`, applied to every component.
struct Relation {
    origin: usize,
    terms: Vec<(SlotId, i64)>,
}

fn equal(origin: usize, a: SlotId, b: SlotId) -> Relation {
    Relation {
        origin,
        terms: vec![(a, 1), (b, -1)],
    }
}

#[derive(Clone, Debug)]
pub struct GjeEncoding {
    /// Slot of each unknown index, ascending.
    pub unknowns: Vec<SlotId>,
    /// Variable slots resolved to `Top` or `Bottom` without linear algebra.
    pub categorical: BTreeMap<SlotId, Unit>,
    pub groups: Vec<GroupSystem>,
}

struct Encoder<'a> {
    model: &'a ConstraintModel,
    categorical: BTreeMap<SlotId, Category>,
}

impl Encoder<'_> {
    fn category(&self, id: SlotId) -> Option<Category> {
        match self.model.slot(id) {
            Slot::Constant(Unit::Top | Unit::Polymorphic) => Some(Category::Top),
            Slot::Constant(Unit::Bottom) => Some(Category::Bottom),
            Slot::Constant(Unit::Concrete(_)) => None,
            Slot::Variable(_) => self.categorical.get(&id).copied(),
        }
    }

    fn is_top(&self, id: SlotId) -> bool {
        self.category(id) == Some(Category::Top)
    }

    fn is_bottom(&self, id: SlotId) -> bool {
        self.category(id) == Some(Category::Bottom)
    }

    /// Categories implied for the slots of `c`, given what is known so far.
    fn forced(&self, c: &Constraint) -> Vec<(SlotId, Category)> {
        let equal_pair = |a: SlotId, b: SlotId| {
            let mut out = Vec::new();
            if let Some(k) = self.category(a) {
                out.push((b, k));
            }
            if let Some(k) = self.category(b) {
                out.push((a, k));
            }
            out
        };

        match *c {
            Constraint::Equality { lhs, rhs } => equal_pair(lhs, rhs),
            Constraint::Subtype { sub, sup } => {
                let mut out = Vec::new();
                if self.is_top(sub) {
                    out.push((sup, Category::Top));
                }
                if self.is_bottom(sup) {
                    out.push((sub, Category::Bottom));
                }
                out
            }
            Constraint::LeastUpperBound { lhs, rhs, result } => {
                if self.is_top(lhs) || self.is_top(rhs) {
                    vec![(result, Category::Top)]
                } else if self.is_bottom(lhs) {
                    equal_pair(result, rhs)
                } else if self.is_bottom(rhs) {
                    equal_pair(result, lhs)
                } else {
                    Vec::new()
                }
            }
            Constraint::Product { lhs, rhs, result }
            | Constraint::Quotient { lhs, rhs, result } => {
                if self.is_top(lhs) || self.is_top(rhs) {
                    vec![(result, Category::Top)]
                } else if self.is_bottom(lhs) || self.is_bottom(rhs) {
                    vec![(result, Category::Bottom)]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn propagate(&mut self) {
        loop {
            let mut changed = false;
            for c in self.model.constraints() {
                for (id, k) in self.forced(c) {
                    if matches!(self.model.slot(id), Slot::Variable(_))
                        && !self.categorical.contains_key(&id)
                    {
                        tracing::debug!(
                            slot = %id,
                            category = ?k,
                            constraint = %c,
                            "resolved categorically"
                        );
                        self.categorical.insert(id, k);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// `a` and `b` must be the same unit.
    fn check_equal(&self, origin: usize, a: SlotId, b: SlotId) -> Result<Vec<Relation>, String> {
        match (self.category(a), self.category(b)) {
            (None, None) => Ok(vec![equal(origin, a, b)]),
            (Some(x), Some(y)) if x == y => Ok(Vec::new()),
            (x, y) => Err(format!("{} cannot equal {}", describe(x), describe(y))),
        }
    }

    /// `result` must be exactly `want`.
    fn require(&self, result: SlotId, want: Category) -> Result<Vec<Relation>, String> {
        match self.category(result) {
            Some(k) if k == want => Ok(Vec::new()),
            k => Err(format!(
                "result must be {} but is {}",
                describe(Some(want)),
                describe(k)
            )),
        }
    }

    fn relations(&self, origin: usize, c: &Constraint) -> Result<Vec<Relation>, String> {
        match *c {
            Constraint::Equality { lhs, rhs } => self.check_equal(origin, lhs, rhs),
            Constraint::Subtype { sub, sup } => {
                if self.is_top(sup) || self.is_bottom(sub) {
                    Ok(Vec::new())
                } else {
                    self.check_equal(origin, sub, sup)
                }
            }
            Constraint::LeastUpperBound { lhs, rhs, result } => {
                if self.is_top(lhs) || self.is_top(rhs) {
                    self.require(result, Category::Top)
                } else if self.is_bottom(lhs) {
                    self.check_equal(origin, result, rhs)
                } else if self.is_bottom(rhs) {
                    self.check_equal(origin, result, lhs)
                } else {
                    match self.category(result) {
                        None => Ok(vec![equal(origin, lhs, rhs), equal(origin, rhs, result)]),
                        // Only distinct constants get here; see `needs_disequality`.
                        Some(Category::Top) => match (self.model.slot(lhs), self.model.slot(rhs)) {
                            (Slot::Constant(a), Slot::Constant(b)) if a == b => {
                                Err(format!("join of {a} with itself cannot be UnknownUnits"))
                            }
                            _ => Ok(Vec::new()),
                        },
                        Some(Category::Bottom) => {
                            Err("join of two concrete units cannot be Bottom".to_string())
                        }
                    }
                }
            }
            Constraint::Product { lhs, rhs, result } => {
                self.arithmetic(origin, lhs, rhs, result, -1)
            }
            Constraint::Quotient { lhs, rhs, result } => {
                self.arithmetic(origin, lhs, rhs, result, 1)
            }
        }
    }

    /// `result - lhs + rhs_sign * rhs = 0` once categories are ruled out.
    fn arithmetic(
        &self,
        origin: usize,
        lhs: SlotId,
        rhs: SlotId,
        result: SlotId,
        rhs_sign: i64,
    ) -> Result<Vec<Relation>, String> {
        if self.is_top(lhs) || self.is_top(rhs) {
            return self.require(result, Category::Top);
        }
        if self.is_bottom(lhs) || self.is_bottom(rhs) {
            return self.require(result, Category::Bottom);
        }
        match self.category(result) {
            None => Ok(vec![Relation {
                origin,
                terms: vec![(result, 1), (lhs, -1), (rhs, rhs_sign)],
            }]),
            k => Err(format!(
                "arithmetic on concrete units cannot be {}",
                describe(k)
            )),
        }
    }

    /// A join forced to `Top` whose operands are concrete but not both
    /// constants holds only if the operands differ. Linear rows cannot say that.
    fn needs_disequality(&self, c: &Constraint) -> bool {
        let Constraint::LeastUpperBound { lhs, rhs, result } = *c else {
            return false;
        };
        self.is_top(result)
            && self.category(lhs).is_none()
            && self.category(rhs).is_none()
            && !(self.model.slot(lhs).is_constant() && self.model.slot(rhs).is_constant())
    }

    fn divisor_check(&self, c: &Constraint) -> Result<(), ArithmeticUnitError> {
        if let Constraint::Quotient { lhs, rhs, .. } = *c {
            if self.is_bottom(rhs) {
                let dividend = match self.model.slot(lhs) {
                    Slot::Constant(u) => u.clone(),
                    Slot::Variable(_) => self
                        .category(lhs)
                        .map(Category::unit)
                        .unwrap_or(Unit::Top),
                };
                return Err(ArithmeticUnitError {
                    dividend,
                    divisor: Unit::Bottom,
                });
            }
        }
        Ok(())
    }
}

fn describe(k: Option<Category>) -> &'static str {
    match k {
        Some(Category::Top) => "UnknownUnits",
        Some(Category::Bottom) => "UnitsBottom",
        None => "a concrete unit",
    }
}

pub fn encode(
    model: &ConstraintModel,
    components: &SerializedComponents,
) -> Result<GjeEncoding, SolveError> {
    let mut enc = Encoder {
        model,
        categorical: BTreeMap::new(),
    };
    enc.propagate();

    let mut relations = Vec::new();
    let mut reasons = Vec::new();
    for (index, c) in model.constraints().iter().enumerate() {
        enc.divisor_check(c)?;
        if enc.needs_disequality(c) {
            return Err(SolveError::unavailable(format!(
                "{c}: operands must differ, which the linear-algebra backend cannot express"
            )));
        }
        match enc.relations(index, c) {
            Ok(rs) => relations.extend(rs),
            Err(why) => reasons.push(format!("{c}: {why}")),
        }
    }
    if !reasons.is_empty() {
        return Err(SolveError::Unsatisfiable { reasons });
    }

    let unknowns: Vec<SlotId> = relations
        .iter()
        .flat_map(|r| r.terms.iter().map(|(id, _)| *id))
        .filter(|id| !model.slot(*id).is_constant())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let index_of: BTreeMap<SlotId, usize> =
        unknowns.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut groups = Vec::new();
    for component in components.iter() {
        let mut group = GroupSystem::new(component.clone(), unknowns.len());
        for relation in &relations {
            let mut eq = Equation::new();
            for &(id, coef) in &relation.terms {
                match (index_of.get(&id), model.slot(id)) {
                    (Some(&var), _) => eq.add_term(var, coef),
                    (None, Slot::Constant(Unit::Concrete(v))) => {
                        eq.add_rhs(-coef * i64::from(component.value_of(v)));
                    }
                    // Categorical slots never reach a relation.
                    (None, _) => {}
                }
            }
            if eq.is_constant() {
                if eq.rhs() != 0 {
                    let c = &model.constraints()[relation.origin];
                    reasons.push(format!("{c}: constants disagree in `{component}`"));
                }
                continue;
            }
            group.push(&eq);
        }
        if !group.equations.is_empty() {
            tracing::debug!(
                component = %group.component,
                equations = group.equations.len(),
                "built equation group"
            );
            groups.push(group);
        }
    }
    if !reasons.is_empty() {
        return Err(SolveError::Unsatisfiable { reasons });
    }

    Ok(GjeEncoding {
        unknowns,
        categorical: enc
            .categorical
            .into_iter()
            .map(|(id, k)| (id, k.unit()))
            .collect(),
        groups,
    })
}
