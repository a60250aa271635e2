#![forbid(unsafe_code)]
#![allow(unused_assignments)]

//! The constraint document: what a front end extracted from a program, as JSON.
//!
//! ```json
//! {
//!   "slots": [
//!     { "name": "dist", "constant": { "exponents": { "m": 1 } } },
//!     { "name": "speed", "location": "Demo.java:12" }
//!   ],
//!   "constraints": [
//!     { "kind": "subtype", "lhs": "dist", "rhs": "speed" }
//!   ]
//! }
//! ```
//!
//! Units are `"top"`, `"bottom"`, `"polymorphic"`, `"raw"`, an alias name such
//! as `"km"`, or a `{ "prefix": .., "exponents": { .. } }` object.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;
use units_core::{AliasTable, BaseDimensions, ConstraintModel, SlotId, Solution, Unit, UnitVector};

#[derive(Debug, Error, Diagnostic)]
#[error("constraint file error: {message}")]
#[diagnostic(code(units::input))]
pub struct InputError {
    pub message: String,
}

impl InputError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum UnitSpec {
    Named(String),
    Vector(UnitVector),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotDecl {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub constant: Option<UnitSpec>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    Subtype,
    Equal,
    Lub,
    Product,
    Quotient,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintDecl {
    pub kind: ConstraintKind,
    pub lhs: String,
    pub rhs: String,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintDocument {
    #[serde(default)]
    pub slots: Vec<SlotDecl>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDecl>,
}

/// A built model plus the document's slot names.
#[derive(Clone, Debug)]
pub struct LoadedModel {
    pub model: ConstraintModel,
    names: Vec<String>,
    by_name: BTreeMap<String, SlotId>,
}

impl LoadedModel {
    pub fn name_of(&self, id: SlotId) -> &str {
        &self.names[id.index()]
    }

    pub fn slot_named(&self, name: &str) -> Option<SlotId> {
        self.by_name.get(name).copied()
    }

    /// Reads a `{ "<slot name>": <unit>, .. }` assignment for variable slots.
    pub fn solution_from_str(
        &self,
        text: &str,
        dims: &BaseDimensions,
        aliases: &AliasTable,
    ) -> Result<Solution, InputError> {
        let raw: BTreeMap<String, UnitSpec> = serde_json::from_str(text)
            .map_err(|e| InputError::new(format!("invalid solution: {e}")))?;

        let mut solution = Solution::new();
        for (name, written) in &raw {
            let id = self
                .slot_named(name)
                .ok_or_else(|| InputError::new(format!("solution names unknown slot `{name}`")))?;
            if self.model.slot(id).is_constant() {
                return Err(InputError::new(format!(
                    "slot `{name}` is a constant and cannot be assigned"
                )));
            }
            match resolve_unit(written, dims, aliases)? {
                Some(unit) => solution.insert(id, unit),
                None => {
                    return Err(InputError::new(format!(
                        "slot `{name}` cannot be assigned the raw marker"
                    )));
                }
            }
        }
        Ok(solution)
    }
}

pub fn load_document(path: &Path) -> Result<ConstraintDocument, InputError> {
    let text = fs::read_to_string(path)
        .map_err(|e| InputError::new(format!("failed to read {}: {e}", path.display())))?;
    parse_document(&text).map_err(|e| InputError::new(format!("{}: {}", path.display(), e.message)))
}

pub fn parse_document(text: &str) -> Result<ConstraintDocument, InputError> {
    serde_json::from_str(text).map_err(|e| InputError::new(format!("invalid JSON: {e}")))
}

/// `Ok(None)` stands for the raw marker.
fn resolve_unit(
    written: &UnitSpec,
    dims: &BaseDimensions,
    aliases: &AliasTable,
) -> Result<Option<Unit>, InputError> {
    let vector = match written {
        UnitSpec::Named(name) => match name.as_str() {
            "top" => return Ok(Some(Unit::Top)),
            "bottom" => return Ok(Some(Unit::Bottom)),
            "polymorphic" => return Ok(Some(Unit::Polymorphic)),
            "raw" => return Ok(None),
            alias => aliases
                .lookup_name(alias)
                .cloned()
                .ok_or_else(|| InputError::new(format!("unknown unit `{alias}`")))?,
        },
        UnitSpec::Vector(v) => v.clone(),
    };
    if let Some(dim) = vector.undeclared_dimension(dims) {
        return Err(InputError::new(format!(
            "unit {vector} uses `{dim}`, which is not a configured base dimension"
        )));
    }
    Ok(Some(Unit::Concrete(vector)))
}

impl ConstraintDocument {
    pub fn build(
        &self,
        dims: &BaseDimensions,
        aliases: &AliasTable,
    ) -> Result<LoadedModel, InputError> {
        let mut model = ConstraintModel::new();
        let mut names = Vec::with_capacity(self.slots.len());
        let mut by_name = BTreeMap::new();

        for decl in &self.slots {
            if by_name.contains_key(&decl.name) {
                return Err(InputError::new(format!("slot `{}` is declared twice", decl.name)));
            }
            let id = match (&decl.location, &decl.constant) {
                (Some(_), Some(_)) => {
                    return Err(InputError::new(format!(
                        "slot `{}` has both a location and a constant",
                        decl.name
                    )));
                }
                (_, Some(written)) => match resolve_unit(written, dims, aliases)? {
                    Some(unit) => model.new_constant_slot(unit),
                    None => model.new_raw_constant_slot(),
                },
                (Some(loc), None) => model.new_variable_slot(loc.as_str()),
                (None, None) => model.new_variable_slot(decl.name.as_str()),
            };
            names.push(decl.name.clone());
            by_name.insert(decl.name.clone(), id);
        }

        let lookup = |name: &str| {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| InputError::new(format!("constraint names unknown slot `{name}`")))
        };

        for (index, decl) in self.constraints.iter().enumerate() {
            let lhs = lookup(&decl.lhs)?;
            let rhs = lookup(&decl.rhs)?;
            match (decl.kind, decl.result.as_deref()) {
                (ConstraintKind::Subtype, None) => model.subtype(lhs, rhs),
                (ConstraintKind::Equal, None) => model.equal(lhs, rhs),
                (ConstraintKind::Lub, Some(r)) => model.lub(lhs, rhs, lookup(r)?),
                (ConstraintKind::Product, Some(r)) => {
                    model.arithmetic_product(lhs, rhs, lookup(r)?)
                }
                (ConstraintKind::Quotient, Some(r)) => {
                    model.arithmetic_quotient(lhs, rhs, lookup(r)?)
                }
                (kind @ (ConstraintKind::Subtype | ConstraintKind::Equal), Some(_)) => {
                    return Err(InputError::new(format!(
                        "constraint {index} ({kind:?}) takes no result"
                    )));
                }
                (kind, None) => {
                    return Err(InputError::new(format!(
                        "constraint {index} ({kind:?}) needs a result slot"
                    )));
                }
            }
        }

        tracing::debug!(
            slots = model.slot_count(),
            constraints = model.constraints().len(),
            "loaded constraint document"
        );
        Ok(LoadedModel {
            model,
            names,
            by_name,
        })
    }
}
