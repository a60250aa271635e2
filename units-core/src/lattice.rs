#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use crate::algebra;
use crate::dimension::BaseDimensions;
use crate::error::ConfigurationError;
use crate::unit::{Unit, UnitVector};

/// Builds the session's [`UnitLattice`].
///
/// The qualifier set is `Top`, `Bottom`, `Polymorphic`, the dimensionless unit, each
/// base dimension, and any extra concrete units (aliases) registered on the builder.
pub struct LatticeBuilder {
    dimensions: BaseDimensions,
    extra: Vec<UnitVector>,
}

impl LatticeBuilder {
    pub fn new(dimensions: BaseDimensions) -> Self {
        Self {
            dimensions,
            extra: Vec::new(),
        }
    }

    /// Validates `names` before starting; an empty list is a configuration error.
    pub fn from_names<I, S>(names: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(BaseDimensions::new(names)?))
    }

    pub fn with_concrete(mut self, unit: UnitVector) -> Self {
        self.extra.push(unit);
        self
    }

    pub fn build(self) -> Result<UnitLattice, ConfigurationError> {
        let mut supertypes: BTreeMap<Unit, BTreeSet<Unit>> = BTreeMap::new();

        supertypes.insert(Unit::Top, BTreeSet::new());
        supertypes.insert(Unit::Polymorphic, BTreeSet::from([Unit::Top]));
        supertypes.insert(
            Unit::Bottom,
            BTreeSet::from([Unit::Polymorphic, Unit::Top]),
        );

        let mut concrete = vec![UnitVector::dimensionless()];
        concrete.extend(self.dimensions.iter().map(UnitVector::base));
        for v in self.extra {
            if let Some(dim) = v.undeclared_dimension(&self.dimensions) {
                return Err(ConfigurationError::new(format!(
                    "unit {v} uses `{dim}`, which is not a configured base dimension"
                )));
            }
            concrete.push(v);
        }

        for v in concrete {
            supertypes
                .entry(Unit::Concrete(v))
                .or_insert_with(|| BTreeSet::from([Unit::Top]));
        }

        tracing::debug!(
            dimensions = %self.dimensions,
            qualifiers = supertypes.len(),
            "built unit lattice"
        );

        Ok(UnitLattice {
            dimensions: self.dimensions,
            supertypes,
        })
    }
}

/// Immutable subtype graph; safe to share across threads once built.
#[derive(Clone, Debug)]
pub struct UnitLattice {
    dimensions: BaseDimensions,
    supertypes: BTreeMap<Unit, BTreeSet<Unit>>,
}

impl UnitLattice {
    pub fn dimensions(&self) -> &BaseDimensions {
        &self.dimensions
    }

    pub fn top(&self) -> Unit {
        Unit::Top
    }

    pub fn bottom(&self) -> Unit {
        Unit::Bottom
    }

    pub fn polymorphic(&self) -> Unit {
        Unit::Polymorphic
    }

    pub fn qualifiers(&self) -> impl Iterator<Item = &Unit> {
        self.supertypes.keys()
    }

    pub fn contains(&self, unit: &Unit) -> bool {
        self.supertypes.contains_key(unit)
    }

    /// Direct supertypes of `unit`. Concrete units outside the qualifier set
    /// behave like the registered ones: their only direct supertype is `Top`.
    pub fn direct_supertypes(&self, unit: &Unit) -> Vec<Unit> {
        match self.supertypes.get(unit) {
            Some(sups) => sups.iter().cloned().collect(),
            None => vec![Unit::Top],
        }
    }

    pub fn is_subtype(&self, sub: &Unit, sup: &Unit) -> bool {
        algebra::is_subtype(sub, sup)
    }

    pub fn least_upper_bound(&self, a: &Unit, b: &Unit) -> Unit {
        algebra::least_upper_bound(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice() -> UnitLattice {
        LatticeBuilder::from_names(["m", "s"])
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn empty_dimension_set_fails_fast() {
        assert!(LatticeBuilder::from_names(Vec::<&str>::new()).is_err());
    }

    #[test]
    fn bottom_sits_under_poly_and_top() {
        let l = lattice();
        assert_eq!(
            l.direct_supertypes(&Unit::Bottom),
            vec![Unit::Top, Unit::Polymorphic]
        );
        assert_eq!(l.direct_supertypes(&Unit::Polymorphic), vec![Unit::Top]);
        assert!(l.direct_supertypes(&Unit::Top).is_empty());
    }

    #[test]
    fn base_dimensions_and_dimensionless_are_qualifiers() {
        let l = lattice();
        assert!(l.contains(&Unit::base("m")));
        assert!(l.contains(&Unit::base("s")));
        assert!(l.contains(&Unit::dimensionless()));
        assert_eq!(l.qualifiers().count(), 6);
        assert_eq!(l.direct_supertypes(&Unit::base("m")), vec![Unit::Top]);
    }

    #[test]
    fn extra_units_must_use_configured_dimensions() {
        let err = LatticeBuilder::from_names(["m"])
            .unwrap()
            .with_concrete(UnitVector::base("s"))
            .build()
            .unwrap_err();
        assert!(err.message.contains("`s`"));
    }

    #[test]
    fn unregistered_concrete_units_still_reach_top() {
        let l = lattice();
        let velocity = Unit::Concrete(UnitVector::base("m").with("s", -1));
        assert!(!l.contains(&velocity));
        assert_eq!(l.direct_supertypes(&velocity), vec![Unit::Top]);
        assert!(l.is_subtype(&velocity, &l.top()));
    }
}
