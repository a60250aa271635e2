#![forbid(unsafe_code)]

//! Canonical display forms for resolved units.

use std::collections::HashMap;
use std::fmt;

use crate::dimension::BaseDimensions;
use crate::error::ConfigurationError;
use crate::unit::{Unit, UnitVector};

const SI_PREFIXES: [(&str, i32); 8] = [
    ("G", 9),
    ("M", 6),
    ("k", 3),
    ("h", 2),
    ("c", -2),
    ("m", -3),
    ("u", -6),
    ("n", -9),
];

/// Derived aliases: (name, prefix, exponents).
const DERIVED: &[(&str, i32, &[(&str, i32)])] = &[
    ("mPERs", 0, &[("m", 1), ("s", -1)]),
    ("mPERs2", 0, &[("m", 1), ("s", -2)]),
    ("m2", 0, &[("m", 2)]),
    ("m3", 0, &[("m", 3)]),
    ("m3PERhr", 0, &[("m", 3), ("hr", -1)]),
    ("PERm2s2", 0, &[("m", -2), ("s", -2)]),
    ("Hz", 0, &[("s", -1)]),
    ("N", 3, &[("g", 1), ("m", 1), ("s", -2)]),
    ("MJ", 9, &[("g", 1), ("m", 2), ("s", -2)]),
    ("WPERm2K", 3, &[("g", 1), ("s", -3), ("K", -1)]),
    ("kmol", 3, &[("mol", 1)]),
];

/// Name → vector table, also indexed by vector.
///
/// When two names share a vector the one registered first is what
/// [`AliasTable::lookup_vector`] returns.
#[derive(Clone, Debug, Default)]
pub struct AliasTable {
    entries: Vec<(String, UnitVector)>,
    by_name: HashMap<String, usize>,
    by_vector: HashMap<UnitVector, usize>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Dimensionless`, every base dimension, the SI-prefixed base units and the
    /// derived aliases whose dimensions are all configured.
    pub fn standard(dims: &BaseDimensions) -> Self {
        let mut table = Self::new();
        table.extend_standard(dims);
        table
    }

    /// Adds the standard aliases after whatever is already registered.
    pub fn extend_standard(&mut self, dims: &BaseDimensions) {
        self.insert("Dimensionless", UnitVector::dimensionless());

        for dim in dims.iter() {
            self.insert(dim, UnitVector::base(dim));
        }

        for &(name, prefix, exps) in DERIVED {
            if exps.iter().all(|(d, _)| dims.contains(d)) {
                let v = exps
                    .iter()
                    .fold(UnitVector::with_prefix(prefix), |v, &(d, e)| v.with(d, e));
                self.insert(name, v);
            }
        }

        for dim in dims.iter() {
            for (symbol, power) in SI_PREFIXES {
                self.insert(
                    format!("{symbol}{dim}"),
                    UnitVector::with_prefix(power).with(dim, 1),
                );
            }
        }
    }

    /// Registers a user alias. Returns `Ok(false)` when `name` is already taken.
    pub fn register(
        &mut self,
        dims: &BaseDimensions,
        name: impl Into<String>,
        vector: UnitVector,
    ) -> Result<bool, ConfigurationError> {
        let name = name.into();
        if let Some(dim) = vector.undeclared_dimension(dims) {
            return Err(ConfigurationError::new(format!(
                "alias `{name}` uses `{dim}`, which is not a configured base dimension"
            )));
        }
        Ok(self.insert(name, vector))
    }

    pub fn lookup_name(&self, name: &str) -> Option<&UnitVector> {
        self.by_name.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn lookup_vector(&self, vector: &UnitVector) -> Option<&str> {
        self.by_vector
            .get(vector)
            .map(|&i| self.entries[i].0.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UnitVector)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, name: impl Into<String>, vector: UnitVector) -> bool {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return false;
        }
        let index = self.entries.len();
        self.by_vector.entry(vector.clone()).or_insert(index);
        self.by_name.insert(name.clone(), index);
        self.entries.push((name, vector));
        true
    }
}

/// What the front end writes back for a resolved unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceUnit {
    Top,
    Bottom,
    Polymorphic,
    Alias(String),
    Raw(UnitVector),
}

impl fmt::Display for SurfaceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceUnit::Top => f.write_str("@UnknownUnits"),
            SurfaceUnit::Bottom => f.write_str("@UnitsBottom"),
            SurfaceUnit::Polymorphic => f.write_str("@PolyUnit"),
            SurfaceUnit::Alias(name) => write!(f, "@{name}"),
            SurfaceUnit::Raw(v) => write!(f, "@UnitsRep({v})"),
        }
    }
}

pub struct SurfaceMapper {
    aliases: AliasTable,
}

impl SurfaceMapper {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn map(&self, unit: &Unit) -> SurfaceUnit {
        match unit {
            Unit::Top => SurfaceUnit::Top,
            Unit::Bottom => SurfaceUnit::Bottom,
            Unit::Polymorphic => SurfaceUnit::Polymorphic,
            Unit::Concrete(v) => match self.aliases.lookup_vector(v) {
                Some(name) => SurfaceUnit::Alias(name.to_owned()),
                None => SurfaceUnit::Raw(v.clone()),
            },
        }
    }
}
