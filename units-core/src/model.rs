#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use crate::unit::Unit;

/// Index of a slot in its [`ConstraintModel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

impl SlotId {
    pub fn new(raw: u32) -> Self {
        SlotId(raw)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Program location a variable slot stands for (e.g. `Demo.java:12:8`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location(String);

impl Location {
    pub fn new(text: impl Into<String>) -> Self {
        Location(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Location {
    fn from(s: &str) -> Self {
        Location::new(s)
    }
}

impl From<String> for Location {
    fn from(s: String) -> Self {
        Location(s)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Fixed unit; never resolved by a solver.
    Constant(Unit),
    /// Unknown unit at a program location.
    Variable(Location),
}

impl Slot {
    pub fn is_constant(&self) -> bool {
        matches!(self, Slot::Constant(_))
    }

    pub fn constant(&self) -> Option<&Unit> {
        match self {
            Slot::Constant(u) => Some(u),
            Slot::Variable(_) => None,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            Slot::Variable(loc) => Some(loc),
            Slot::Constant(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Constraint {
    Subtype { sub: SlotId, sup: SlotId },
    Equality { lhs: SlotId, rhs: SlotId },
    /// `result = lub(lhs, rhs)`; produced for `+`, `-` and merges.
    LeastUpperBound { lhs: SlotId, rhs: SlotId, result: SlotId },
    /// `result = lhs * rhs`.
    Product { lhs: SlotId, rhs: SlotId, result: SlotId },
    /// `result = lhs / rhs`.
    Quotient { lhs: SlotId, rhs: SlotId, result: SlotId },
}

impl Constraint {
    pub fn slots(&self) -> Vec<SlotId> {
        match *self {
            Constraint::Subtype { sub, sup } => vec![sub, sup],
            Constraint::Equality { lhs, rhs } => vec![lhs, rhs],
            Constraint::LeastUpperBound { lhs, rhs, result }
            | Constraint::Product { lhs, rhs, result }
            | Constraint::Quotient { lhs, rhs, result } => vec![lhs, rhs, result],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::Subtype { .. } => "subtype",
            Constraint::Equality { .. } => "equal",
            Constraint::LeastUpperBound { .. } => "lub",
            Constraint::Product { .. } => "product",
            Constraint::Quotient { .. } => "quotient",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Subtype { sub, sup } => write!(f, "#{sub} <: #{sup}"),
            Constraint::Equality { lhs, rhs } => write!(f, "#{lhs} == #{rhs}"),
            Constraint::LeastUpperBound { lhs, rhs, result } => {
                write!(f, "#{result} = lub(#{lhs}, #{rhs})")
            }
            Constraint::Product { lhs, rhs, result } => write!(f, "#{result} = #{lhs} * #{rhs}"),
            Constraint::Quotient { lhs, rhs, result } => write!(f, "#{result} = #{lhs} / #{rhs}"),
        }
    }
}

/// Binary operators the front end hands to [`ConstraintModel::binary_operation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    /// String concatenation spelled with `+`.
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralKind {
    Null,
    String,
    Char,
    Bool,
    Number,
}

/// Arena of slots plus the constraints over them.
///
/// Slot ids are dense and allocated in creation order. The model performs no
/// solving; backends read it and produce a [`Solution`].
#[derive(Clone, Debug, Default)]
pub struct ConstraintModel {
    slots: Vec<Slot>,
    constraints: Vec<Constraint>,
}

impl ConstraintModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_constant_slot(&mut self, value: Unit) -> SlotId {
        self.push_slot(Slot::Constant(value))
    }

    /// Constant for a unit annotation that was never canonicalized.
    ///
    /// Well-formed front ends never produce one; it is kept as dimensionless.
    pub fn new_raw_constant_slot(&mut self) -> SlotId {
        let id = self.push_slot(Slot::Constant(Unit::dimensionless()));
        tracing::warn!(slot = %id, "raw unit marker treated as dimensionless");
        id
    }

    pub fn new_variable_slot(&mut self, location: impl Into<Location>) -> SlotId {
        self.push_slot(Slot::Variable(location.into()))
    }

    pub fn subtype(&mut self, sub: SlotId, sup: SlotId) {
        self.push_constraint(Constraint::Subtype { sub, sup });
    }

    pub fn equal(&mut self, lhs: SlotId, rhs: SlotId) {
        self.push_constraint(Constraint::Equality { lhs, rhs });
    }

    pub fn lub(&mut self, lhs: SlotId, rhs: SlotId, result: SlotId) {
        self.push_constraint(Constraint::LeastUpperBound { lhs, rhs, result });
    }

    pub fn arithmetic_product(&mut self, lhs: SlotId, rhs: SlotId, result: SlotId) {
        self.push_constraint(Constraint::Product { lhs, rhs, result });
    }

    pub fn arithmetic_quotient(&mut self, lhs: SlotId, rhs: SlotId, result: SlotId) {
        self.push_constraint(Constraint::Quotient { lhs, rhs, result });
    }

    /// Creates the slot for the value of `lhs op rhs` and constrains it.
    pub fn binary_operation(
        &mut self,
        op: BinaryOp,
        lhs: SlotId,
        rhs: SlotId,
        location: impl Into<Location>,
    ) -> SlotId {
        match op {
            BinaryOp::Add | BinaryOp::Sub => {
                let result = self.new_variable_slot(location);
                self.lub(lhs, rhs, result);
                result
            }
            BinaryOp::Mul => {
                let result = self.new_variable_slot(location);
                self.arithmetic_product(lhs, rhs, result);
                result
            }
            BinaryOp::Div => {
                let result = self.new_variable_slot(location);
                self.arithmetic_quotient(lhs, rhs, result);
                result
            }
            BinaryOp::Rem => {
                let result = self.new_variable_slot(location);
                self.equal(result, lhs);
                result
            }
            BinaryOp::Concat
            | BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::And
            | BinaryOp::Or => {
                self.check_slot(lhs);
                self.check_slot(rhs);
                self.new_constant_slot(Unit::dimensionless())
            }
        }
    }

    /// Slot for a literal expression.
    pub fn literal(&mut self, kind: LiteralKind, location: impl Into<Location>) -> SlotId {
        match kind {
            LiteralKind::Null => self.new_constant_slot(Unit::Bottom),
            LiteralKind::String | LiteralKind::Char | LiteralKind::Bool => {
                self.new_constant_slot(Unit::dimensionless())
            }
            LiteralKind::Number => self.new_variable_slot(location),
        }
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        self.check_slot(id);
        &self.slots[id.index()]
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(id.index())
    }

    pub fn slots(&self) -> impl Iterator<Item = (SlotId, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, s)| (SlotId(i as u32), s))
    }

    pub fn variables(&self) -> impl Iterator<Item = (SlotId, &Location)> {
        self.slots().filter_map(|(id, s)| s.location().map(|l| (id, l)))
    }

    pub fn constants(&self) -> impl Iterator<Item = (SlotId, &Unit)> {
        self.slots().filter_map(|(id, s)| s.constant().map(|u| (id, u)))
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn push_slot(&mut self, slot: Slot) -> SlotId {
        let id = SlotId(self.slots.len() as u32);
        self.slots.push(slot);
        id
    }

    fn push_constraint(&mut self, constraint: Constraint) {
        for id in constraint.slots() {
            self.check_slot(id);
        }
        self.constraints.push(constraint);
    }

    fn check_slot(&self, id: SlotId) {
        assert!(
            id.index() < self.slots.len(),
            "slot #{id} was not created by this constraint model (front-end bug)"
        );
    }
}

/// Units assigned to variable slots by a solver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Solution {
    units: BTreeMap<SlotId, Unit>,
}

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: SlotId, unit: Unit) {
        self.units.insert(id, unit);
    }

    pub fn get(&self, id: SlotId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Unit)> {
        self.units.iter().map(|(id, u)| (*id, u))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit of `id`: the constant's value, or whatever this solution assigned.
    pub fn resolve(&self, model: &ConstraintModel, id: SlotId) -> Option<Unit> {
        match model.slot(id) {
            Slot::Constant(u) => Some(u.clone()),
            Slot::Variable(_) => self.get(id).cloned(),
        }
    }
}

impl FromIterator<(SlotId, Unit)> for Solution {
    fn from_iter<T: IntoIterator<Item = (SlotId, Unit)>>(iter: T) -> Self {
        Solution {
            units: iter.into_iter().collect(),
        }
    }
}
