#![forbid(unsafe_code)]

//! Which unit components a backend actually serializes.
//!
//! A dimension that never occurs with a non-zero exponent in a concrete
//! constant only ever appears in homogeneous equations, so the all-zero
//! assignment satisfies it. Backends skip such dimensions and decode them as 0.

use std::collections::BTreeSet;
use std::fmt;

use units_core::{ConstraintModel, Unit, UnitVector};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Prefix,
    Dimension(String),
}

impl Component {
    pub fn name(&self) -> &str {
        match self {
            Component::Prefix => "Prefix",
            Component::Dimension(d) => d,
        }
    }

    pub fn value_of(&self, v: &UnitVector) -> i32 {
        match self {
            Component::Prefix => v.prefix(),
            Component::Dimension(d) => v.exponent(d),
        }
    }

    /// Writes `value` into the matching field of `v`.
    pub fn assign(&self, v: &mut UnitVector, value: i32) {
        match self {
            Component::Prefix => v.set_prefix(value),
            Component::Dimension(d) => v.set(d.clone(), value),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The prefix followed by the used dimensions in name order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializedComponents {
    components: Vec<Component>,
}

impl SerializedComponents {
    pub fn of(model: &ConstraintModel) -> Self {
        let used: BTreeSet<&str> = model
            .constants()
            .filter_map(|(_, u)| match u {
                Unit::Concrete(v) => Some(v),
                _ => None,
            })
            .flat_map(|v| v.dimensions())
            .collect();

        let mut components = vec![Component::Prefix];
        components.extend(used.into_iter().map(|d| Component::Dimension(d.to_owned())));

        tracing::debug!(
            components = ?components.iter().map(Component::name).collect::<Vec<_>>(),
            "serialized components"
        );

        Self { components }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
