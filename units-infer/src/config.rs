#![forbid(unsafe_code)]

use std::path::PathBuf;

use units_core::{
    AliasTable, BaseDimensions, ConfigurationError, LatticeBuilder, SurfaceMapper, UnitLattice,
};
use units_solve::{
    Backend, BackendKind, Eliminator, ExternalEliminator, GjeSolver, InProcessEliminator,
    SmtSolver,
};

use crate::manifest::ResolvedManifest;

/// Command-line values that take precedence over `units.toml`.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub backend: Option<BackendKind>,
    pub dimensions: Vec<String>,
    pub timeout_ms: Option<u32>,
    pub gje_tool: Option<PathBuf>,
}

/// Everything a session needs, fixed before the first constraint is read.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    dimensions: BaseDimensions,
    aliases: AliasTable,
    backend: BackendKind,
    timeout_ms: Option<u32>,
    gje_tool: Option<PathBuf>,
    dump_dir: Option<PathBuf>,
}

impl SessionConfig {
    pub fn resolve(
        manifest: &ResolvedManifest,
        overrides: &Overrides,
    ) -> Result<Self, ConfigurationError> {
        let names = if overrides.dimensions.is_empty() {
            &manifest.dimensions
        } else {
            &overrides.dimensions
        };
        let dimensions = BaseDimensions::new(names.iter().cloned())?;

        // User aliases go in first so their names win over standard ones.
        let mut aliases = AliasTable::new();
        for (name, vector) in &manifest.aliases {
            if !aliases.register(&dimensions, name.clone(), vector.clone())? {
                tracing::warn!(alias = %name, "alias registered twice, keeping the first");
            }
        }
        aliases.extend_standard(&dimensions);

        Ok(Self {
            dimensions,
            aliases,
            backend: overrides.backend.unwrap_or(manifest.backend),
            timeout_ms: overrides.timeout_ms.or(manifest.timeout_ms),
            gje_tool: overrides.gje_tool.clone().or_else(|| manifest.gje_tool.clone()),
            dump_dir: manifest.dump_dir.clone(),
        })
    }

    pub fn dimensions(&self) -> &BaseDimensions {
        &self.dimensions
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend
    }

    pub fn timeout_ms(&self) -> Option<u32> {
        self.timeout_ms
    }

    pub fn lattice(&self) -> Result<UnitLattice, ConfigurationError> {
        self.aliases
            .iter()
            .fold(LatticeBuilder::new(self.dimensions.clone()), |b, (_, v)| {
                b.with_concrete(v.clone())
            })
            .build()
    }

    pub fn surface_mapper(&self) -> SurfaceMapper {
        SurfaceMapper::new(self.aliases.clone())
    }

    pub fn smt_solver(&self) -> SmtSolver {
        SmtSolver::with_default_engine().with_timeout(self.timeout_ms)
    }

    pub fn gje_solver(&self) -> GjeSolver {
        let eliminator: Box<dyn Eliminator> = match &self.gje_tool {
            Some(tool) => Box::new(ExternalEliminator::new(tool)),
            None => Box::new(InProcessEliminator),
        };
        GjeSolver::new(eliminator).with_dump_dir(self.dump_dir.clone())
    }

    pub fn backend(&self) -> Backend {
        match self.backend {
            BackendKind::Smt => Backend::Smt(self.smt_solver()),
            BackendKind::Gje => Backend::Gje(self.gje_solver()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use units_core::{SurfaceUnit, Unit, UnitVector};
    use units_solve::UnitsSolver;

    fn manifest() -> ResolvedManifest {
        let mut m = ResolvedManifest::empty(PathBuf::from("."));
        m.aliases.push(("speed".into(), UnitVector::base("m").with("s", -1)));
        m
    }

    #[test]
    fn user_aliases_win_over_standard_names() {
        let config = SessionConfig::resolve(&manifest(), &Overrides::default()).unwrap();
        let velocity = Unit::Concrete(UnitVector::base("m").with("s", -1));
        assert_eq!(
            config.surface_mapper().map(&velocity),
            SurfaceUnit::Alias("speed".into())
        );
    }

    #[test]
    fn overrides_take_precedence() {
        let overrides = Overrides {
            backend: Some(BackendKind::Gje),
            dimensions: vec!["m".into(), "s".into()],
            timeout_ms: Some(10),
            gje_tool: None,
        };
        let config = SessionConfig::resolve(&manifest(), &overrides).unwrap();
        assert_eq!(config.backend_kind(), BackendKind::Gje);
        assert_eq!(config.dimensions().len(), 2);
        assert_eq!(config.timeout_ms(), Some(10));
        assert_eq!(config.backend().kind(), BackendKind::Gje);
    }

    #[test]
    fn alias_over_unconfigured_dimension_is_rejected() {
        let mut m = ResolvedManifest::empty(PathBuf::from("."));
        m.aliases.push(("kelvin".into(), UnitVector::base("K")));
        assert!(SessionConfig::resolve(&m, &Overrides::default()).is_err());
    }

    #[test]
    fn lattice_contains_aliases() {
        let config = SessionConfig::resolve(&manifest(), &Overrides::default()).unwrap();
        let lattice = config.lattice().unwrap();
        assert!(lattice.contains(&Unit::Concrete(UnitVector::base("m").with("s", -1))));
        assert!(lattice.contains(&Unit::Top));
    }
}
