#![forbid(unsafe_code)]

use std::collections::HashMap;

use units_core::{ConstraintModel, SlotId, Solution, Unit, UnitVector};

use super::encode::{var_name, BOTTOM_MARKER, TOP_MARKER};
use crate::components::SerializedComponents;
use crate::solver::SolveError;

/// Parsed `<variable-name> <value>` lines.
struct ModelText<'a> {
    values: HashMap<&'a str, &'a str>,
}

impl<'a> ModelText<'a> {
    fn parse(text: &'a str) -> Result<Self, SolveError> {
        let mut values = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(name), Some(value), None) => {
                    values.insert(name, value);
                }
                _ => {
                    return Err(SolveError::malformed(format!(
                        "line {}: expected `<name> <value>`, found `{line}`",
                        lineno + 1
                    )));
                }
            }
        }
        Ok(Self { values })
    }

    fn flag(&self, name: &str) -> Result<bool, SolveError> {
        match self.values.get(name) {
            None | Some(&"false") => Ok(false),
            Some(&"true") => Ok(true),
            Some(other) => Err(SolveError::malformed(format!(
                "`{name}` should be a boolean, found `{other}`"
            ))),
        }
    }

    /// Absent components read as zero.
    fn int(&self, name: &str) -> Result<i32, SolveError> {
        match self.values.get(name) {
            None => Ok(0),
            Some(raw) => raw.parse::<i32>().map_err(|_| {
                SolveError::malformed(format!("`{name}` should be an integer, found `{raw}`"))
            }),
        }
    }
}

/// Reads the unit of every variable slot from an engine's model text.
///
/// A model that sets both flags for one slot is a solver artifact; `Top` wins.
pub fn decode(
    model: &ConstraintModel,
    components: &SerializedComponents,
    text: &str,
) -> Result<Solution, SolveError> {
    let parsed = ModelText::parse(text)?;
    let mut solution = Solution::new();

    for (id, _) in model.variables() {
        solution.insert(id, decode_slot(&parsed, components, id)?);
    }

    Ok(solution)
}

fn decode_slot(
    parsed: &ModelText<'_>,
    components: &SerializedComponents,
    id: SlotId,
) -> Result<Unit, SolveError> {
    let top = parsed.flag(&var_name(id, TOP_MARKER))?;
    let bottom = parsed.flag(&var_name(id, BOTTOM_MARKER))?;

    if top && bottom {
        tracing::warn!(slot = %id, "model sets both Top and Bottom; using Top");
    }
    if top {
        return Ok(Unit::Top);
    }
    if bottom {
        return Ok(Unit::Bottom);
    }

    let mut vector = UnitVector::dimensionless();
    for c in components.iter() {
        c.assign(&mut vector, parsed.int(&var_name(id, c.name()))?);
    }
    Ok(Unit::Concrete(vector))
}
