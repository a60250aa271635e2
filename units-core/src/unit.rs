#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dimension::BaseDimensions;

/// Exponent vector of a concrete unit, scaled by a power of ten.
///
/// Zero exponents are never stored, so the derived `PartialEq` is structural
/// equality over the non-zero entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "VectorRepr", into = "VectorRepr")]
pub struct UnitVector {
    prefix: i32,
    exponents: BTreeMap<String, i32>,
}

#[derive(Serialize, Deserialize)]
struct VectorRepr {
    #[serde(default)]
    prefix: i32,
    #[serde(default)]
    exponents: BTreeMap<String, i32>,
}

impl From<VectorRepr> for UnitVector {
    fn from(repr: VectorRepr) -> Self {
        let mut v = UnitVector::with_prefix(repr.prefix);
        for (dim, exp) in repr.exponents {
            v.set(dim, exp);
        }
        v
    }
}

impl From<UnitVector> for VectorRepr {
    fn from(v: UnitVector) -> Self {
        VectorRepr {
            prefix: v.prefix,
            exponents: v.exponents,
        }
    }
}

impl UnitVector {
    pub fn dimensionless() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: i32) -> Self {
        Self {
            prefix,
            exponents: BTreeMap::new(),
        }
    }

    /// A single base dimension raised to the first power (e.g. `m`).
    pub fn base(dim: impl Into<String>) -> Self {
        Self::dimensionless().with(dim, 1)
    }

    pub fn with(mut self, dim: impl Into<String>, exponent: i32) -> Self {
        self.set(dim, exponent);
        self
    }

    pub fn set(&mut self, dim: impl Into<String>, exponent: i32) {
        let dim = dim.into();
        if exponent == 0 {
            self.exponents.remove(&dim);
        } else {
            self.exponents.insert(dim, exponent);
        }
    }

    pub fn set_prefix(&mut self, prefix: i32) {
        self.prefix = prefix;
    }

    pub fn prefix(&self) -> i32 {
        self.prefix
    }

    /// Exponent of `dim`; absent dimensions read as zero.
    pub fn exponent(&self, dim: &str) -> i32 {
        self.exponents.get(dim).copied().unwrap_or(0)
    }

    pub fn exponents(&self) -> impl Iterator<Item = (&str, i32)> {
        self.exponents.iter().map(|(d, e)| (d.as_str(), *e))
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.exponents.keys().map(String::as_str)
    }

    /// True when every exponent is zero. The prefix may still be non-zero.
    pub fn is_dimensionless(&self) -> bool {
        self.exponents.is_empty()
    }

    /// First dimension of this vector that is not part of `dims`, if any.
    pub fn undeclared_dimension(&self, dims: &BaseDimensions) -> Option<&str> {
        self.dimensions().find(|d| !dims.contains(d))
    }

    /// `self + other` (`subtract == false`) or `self - other`, component-wise,
    /// prefix included. `None` when a component leaves the `i32` range.
    pub(crate) fn combine(&self, other: &UnitVector, subtract: bool) -> Option<UnitVector> {
        let op = |a: i32, b: i32| {
            if subtract {
                a.checked_sub(b)
            } else {
                a.checked_add(b)
            }
        };
        let mut out = UnitVector::with_prefix(op(self.prefix, other.prefix)?);
        out.exponents = self.exponents.clone();
        for (dim, exp) in &other.exponents {
            out.set(dim.clone(), op(self.exponent(dim), *exp)?);
        }
        Some(out)
    }
}

impl fmt::Display for UnitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.prefix != 0 {
            parts.push(format!("10^{}", self.prefix));
        }
        for (dim, exp) in &self.exponents {
            if *exp == 1 {
                parts.push(dim.clone());
            } else {
                parts.push(format!("{dim}{exp}"));
            }
        }
        if parts.is_empty() {
            return write!(f, "1");
        }
        write!(f, "{}", parts.join("."))
    }
}

/// A physical unit as seen by the checker.
///
/// Only `Concrete` carries a payload, so a value can never be "both Top and Bottom".
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Unit {
    /// Unknown units; supertype of everything.
    Top,
    /// Uninhabited; subtype of everything. Types null-like values.
    Bottom,
    /// Placeholder bound per call site.
    Polymorphic,
    Concrete(UnitVector),
}

impl Unit {
    pub fn dimensionless() -> Self {
        Unit::Concrete(UnitVector::dimensionless())
    }

    pub fn base(dim: impl Into<String>) -> Self {
        Unit::Concrete(UnitVector::base(dim))
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Unit::Top)
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, Unit::Bottom)
    }

    pub fn as_concrete(&self) -> Option<&UnitVector> {
        match self {
            Unit::Concrete(v) => Some(v),
            _ => None,
        }
    }
}

impl From<UnitVector> for Unit {
    fn from(v: UnitVector) -> Self {
        Unit::Concrete(v)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Top => write!(f, "UnknownUnits"),
            Unit::Bottom => write!(f, "UnitsBottom"),
            Unit::Polymorphic => write!(f, "PolyUnit"),
            Unit::Concrete(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_exponents_are_not_stored() {
        let v = UnitVector::base("m").with("s", 0).with("m", 0);
        assert!(v.is_dimensionless());
        assert_eq!(v, UnitVector::dimensionless());
    }

    #[test]
    fn display_renders_prefix_and_exponents() {
        let newton = UnitVector::with_prefix(3)
            .with("g", 1)
            .with("m", 1)
            .with("s", -2);
        assert_eq!(newton.to_string(), "10^3.g.m.s-2");
        assert_eq!(UnitVector::dimensionless().to_string(), "1");
        assert_eq!(Unit::Top.to_string(), "UnknownUnits");
    }

    #[test]
    fn deserialization_drops_zero_entries() {
        let v: UnitVector =
            serde_json::from_str(r#"{ "prefix": 3, "exponents": { "m": 1, "s": 0 } }"#).unwrap();
        assert_eq!(v, UnitVector::with_prefix(3).with("m", 1));
    }

    #[test]
    fn combine_reports_overflow() {
        let big = UnitVector::with_prefix(i32::MAX);
        let kilo = UnitVector::with_prefix(3);
        assert_eq!(big.combine(&kilo, false), None);
        assert_eq!(big.combine(&kilo, true), Some(UnitVector::with_prefix(i32::MAX - 3)));

        let deep = UnitVector::dimensionless().with("m", i32::MIN);
        assert_eq!(deep.combine(&UnitVector::base("m"), true), None);
    }

    #[test]
    fn undeclared_dimension_is_reported() {
        let dims = BaseDimensions::new(["m", "s"]).unwrap();
        let v = UnitVector::base("m").with("K", -1);
        assert_eq!(v.undeclared_dimension(&dims), Some("K"));
    }
}
