#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use crate::error::ConfigurationError;

/// Component markers used in solver variable names (`<slot>-<component>`).
///
/// A base dimension may not reuse one of them.
pub const RESERVED_COMPONENTS: [&str; 3] = ["Prefix", "UnknownUnits", "UnitsBottom"];

/// The fixed set of base dimensions for one checking session.
///
/// Clones share the same immutable name list, so a session can hand copies to the
/// lattice, the model loader and the solver backends without re-validating.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseDimensions {
    names: Arc<[String]>,
}

impl BaseDimensions {
    pub fn new<I, S>(names: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '-') {
                return Err(ConfigurationError::new(format!(
                    "invalid base dimension name `{name}`"
                )));
            }
            if RESERVED_COMPONENTS.contains(&name.as_str()) {
                return Err(ConfigurationError::new(format!(
                    "`{name}` is reserved and cannot name a base dimension"
                )));
            }
            if out.contains(&name) {
                return Err(ConfigurationError::new(format!(
                    "base dimension `{name}` is declared twice"
                )));
            }
            out.push(name);
        }

        if out.is_empty() {
            return Err(ConfigurationError::new(
                "at least one base dimension must be supplied",
            ));
        }

        Ok(Self { names: out.into() })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Display for BaseDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names.join(", "))
    }
}
