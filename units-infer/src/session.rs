#![forbid(unsafe_code)]

//! One run over one constraint document.

use std::fs;
use std::path::{Path, PathBuf};

use miette::IntoDiagnostic;
use units_core::{check_solution, ConfigurationError, Solution};
use units_solve::UnitsSolver;

use crate::config::SessionConfig;
use crate::input::LoadedModel;
use crate::report::{
    CheckReport, InferReport, LatticeReport, SlotReport, ViolationReport, CHECK_SCHEMA,
    INFER_SCHEMA,
};

pub const SMT_SCRIPT_FILE: &str = "units.smt2";

/// Runs the configured backend. Solver failures end up in the report, not in `Err`.
pub fn infer(config: &SessionConfig, input: &str, loaded: &LoadedModel) -> InferReport {
    let backend = config.backend();
    let mut report = InferReport {
        schema: INFER_SCHEMA,
        input: input.to_string(),
        ok: false,
        backend: backend.kind(),
        error: None,
        slots: Vec::new(),
        violations: Vec::new(),
        statistics: None,
    };

    let solved = match backend.solve(&loaded.model) {
        Ok(solved) => solved,
        Err(e) => {
            tracing::warn!(input, error = %e, "could not infer units");
            report.error = Some(e.to_string());
            return report;
        }
    };

    let mapper = config.surface_mapper();
    for (id, location) in loaded.model.variables() {
        let Some(unit) = solved.solution.get(id) else {
            continue;
        };
        report.slots.push(SlotReport {
            name: loaded.name_of(id).to_string(),
            location: location.to_string(),
            unit: unit.to_string(),
            surface: mapper.map(unit).to_string(),
        });
    }

    report.violations = check_solution(&loaded.model, &solved.solution)
        .iter()
        .map(ViolationReport::from)
        .collect();
    if !report.violations.is_empty() {
        tracing::warn!(count = report.violations.len(), "solution violates constraints");
    }

    report.ok = report.violations.is_empty();
    report.statistics = Some(solved.statistics);
    report
}

/// Validates an assignment (empty when every slot is a constant).
pub fn check(input: &str, loaded: &LoadedModel, solution: &Solution) -> CheckReport {
    let violations: Vec<ViolationReport> = check_solution(&loaded.model, solution)
        .iter()
        .map(ViolationReport::from)
        .collect();
    CheckReport {
        schema: CHECK_SCHEMA,
        input: input.to_string(),
        ok: violations.is_empty(),
        constraints: loaded.model.constraints().len(),
        violations,
    }
}

/// Writes the SMT-LIB script and every linear-algebra group system into `out`.
pub fn emit(config: &SessionConfig, loaded: &LoadedModel, out: &Path) -> miette::Result<Vec<PathBuf>> {
    fs::create_dir_all(out).into_diagnostic()?;
    let mut written = Vec::new();

    let script = config.smt_solver().problem(&loaded.model)?.to_smtlib();
    let path = out.join(SMT_SCRIPT_FILE);
    fs::write(&path, script).into_diagnostic()?;
    written.push(path);

    for group in config.gje_solver().systems(&loaded.model)? {
        let path = out.join(group.file_name());
        fs::write(&path, group.to_text()).into_diagnostic()?;
        written.push(path);
    }

    tracing::info!(out = %out.display(), files = written.len(), "emitted solver inputs");
    Ok(written)
}

pub fn lattice(config: &SessionConfig) -> Result<LatticeReport, ConfigurationError> {
    Ok(LatticeReport::new(&config.lattice()?, &config.surface_mapper()))
}
