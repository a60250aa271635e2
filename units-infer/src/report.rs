#![forbid(unsafe_code)]

use std::fmt;

use serde::Serialize;
use units_core::{SurfaceMapper, Unit, UnitLattice, Violation};
use units_solve::{BackendKind, SolveStatistics};

pub const INFER_SCHEMA: &str = "units-infer.infer.v1";
pub const CHECK_SCHEMA: &str = "units-infer.check.v1";
pub const LATTICE_SCHEMA: &str = "units-infer.lattice.v1";

#[derive(Debug, Clone, Serialize)]
pub struct SlotReport {
    pub name: String,
    pub location: String,
    pub unit: String,
    pub surface: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViolationReport {
    pub constraint: String,
    pub message: String,
}

impl From<&Violation> for ViolationReport {
    fn from(v: &Violation) -> Self {
        Self {
            constraint: v.constraint.to_string(),
            message: v.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InferReport {
    pub schema: &'static str,
    pub input: String,
    pub ok: bool,
    pub backend: BackendKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub slots: Vec<SlotReport>,
    /// Constraints the returned solution still violates; empty for a sound backend.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<ViolationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<SolveStatistics>,
}

impl fmt::Display for InferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            writeln!(f, "{}: could not infer units ({}): {error}", self.input, self.backend)?;
            return Ok(());
        }
        for slot in &self.slots {
            writeln!(f, "{} ({}): {}", slot.location, slot.name, slot.surface)?;
        }
        for v in &self.violations {
            writeln!(f, "warning: solution violates {}: {}", v.constraint, v.message)?;
        }
        if let Some(stats) = &self.statistics {
            writeln!(
                f,
                "solved {} variable(s) with {} in {} ms ({} ms serialization)",
                stats.variables, stats.backend, stats.solving_ms, stats.serialization_ms
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub schema: &'static str,
    pub input: String,
    pub ok: bool,
    pub constraints: usize,
    pub violations: Vec<ViolationReport>,
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in &self.violations {
            writeln!(f, "{}: violated {}: {}", self.input, v.constraint, v.message)?;
        }
        writeln!(
            f,
            "{}: {} constraint(s), {} violated",
            self.input,
            self.constraints,
            self.violations.len()
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QualifierReport {
    pub unit: String,
    pub surface: String,
    pub supertypes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatticeReport {
    pub schema: &'static str,
    pub dimensions: Vec<String>,
    pub qualifiers: Vec<QualifierReport>,
}

impl LatticeReport {
    pub fn new(lattice: &UnitLattice, mapper: &SurfaceMapper) -> Self {
        let surface = |u: &Unit| mapper.map(u).to_string();
        Self {
            schema: LATTICE_SCHEMA,
            dimensions: lattice.dimensions().iter().map(str::to_string).collect(),
            qualifiers: lattice
                .qualifiers()
                .map(|q| QualifierReport {
                    unit: q.to_string(),
                    surface: surface(q),
                    supertypes: lattice.direct_supertypes(q).iter().map(surface).collect(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for LatticeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dimensions: [{}]", self.dimensions.join(", "))?;
        for q in &self.qualifiers {
            if q.supertypes.is_empty() {
                writeln!(f, "{}", q.surface)?;
            } else {
                writeln!(f, "{} <: {}", q.surface, q.supertypes.join(", "))?;
            }
        }
        Ok(())
    }
}
