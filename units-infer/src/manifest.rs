#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use units_core::UnitVector;
use units_solve::BackendKind;

pub const MANIFEST_FILE: &str = "units.toml";

/// Used when no `units.toml` is found.
pub const DEFAULT_DIMENSIONS: [&str; 3] = ["m", "s", "g"];

#[derive(Debug, Error, Diagnostic)]
#[error("manifest error: {message}")]
#[diagnostic(code(units::manifest))]
pub struct ManifestError {
    pub message: String,
}

impl ManifestError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,

    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedManifest {
    pub manifest_path: Option<PathBuf>,
    pub project_root: PathBuf,

    pub dimensions: Vec<String>,
    pub backend: BackendKind,
    pub timeout_ms: Option<u32>,

    /// External elimination program for the linear-algebra backend.
    pub gje_tool: Option<PathBuf>,
    pub dump_dir: Option<PathBuf>,

    /// User aliases in name order.
    pub aliases: Vec<(String, UnitVector)>,

    pub logging: LoggingConfig,
}

impl ResolvedManifest {
    pub fn empty(project_root: PathBuf) -> Self {
        Self {
            manifest_path: None,
            project_root,
            dimensions: DEFAULT_DIMENSIONS.iter().map(|d| d.to_string()).collect(),
            backend: BackendKind::default(),
            timeout_ms: None,
            gje_tool: None,
            dump_dir: None,
            aliases: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    session: Option<Session>,

    #[serde(default)]
    gje: Option<Gje>,

    #[serde(default)]
    aliases: BTreeMap<String, UnitVector>,

    #[serde(default)]
    logging: Option<LoggingConfig>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Session {
    #[serde(default)]
    dimensions: Vec<String>,

    #[serde(default)]
    backend: Option<BackendKind>,

    #[serde(default)]
    timeout_ms: Option<u32>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Gje {
    #[serde(default)]
    tool: Option<String>,

    #[serde(default)]
    dump_dir: Option<String>,
}

/// Walks up from `start` looking for `units.toml`.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        let candidate = cur.join(MANIFEST_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = cur.parent()?.to_path_buf();
    }
}

pub fn load_resolved_manifest(start: &Path) -> Result<ResolvedManifest, ManifestError> {
    let project_root = if start.is_file() {
        start.parent().unwrap_or_else(|| Path::new(".")).to_path_buf()
    } else {
        start.to_path_buf()
    };

    let Some(manifest_path) = find_manifest(&project_root) else {
        tracing::debug!(start = %project_root.display(), "no units.toml found, using defaults");
        return Ok(ResolvedManifest::empty(project_root));
    };

    let raw = fs::read_to_string(&manifest_path).map_err(|e| {
        ManifestError::new(format!("failed to read {}: {e}", manifest_path.display()))
    })?;
    let mut out = parse_manifest(&raw).map_err(|e| {
        ManifestError::new(format!("{}: {}", manifest_path.display(), e.message))
    })?;

    let manifest_dir = manifest_path
        .parent()
        .ok_or_else(|| ManifestError::new("manifest has no parent directory"))?
        .to_path_buf();
    out.gje_tool = out.gje_tool.map(|p| resolve_path(&manifest_dir, &p));
    out.dump_dir = out.dump_dir.map(|p| resolve_path(&manifest_dir, &p));
    out.project_root = manifest_dir;
    out.manifest_path = Some(manifest_path);

    tracing::debug!(
        manifest = ?out.manifest_path,
        dimensions = ?out.dimensions,
        backend = %out.backend,
        "loaded manifest"
    );
    Ok(out)
}

/// Parses manifest text. Relative paths are left as written.
pub fn parse_manifest(raw: &str) -> Result<ResolvedManifest, ManifestError> {
    let parsed: Manifest =
        toml::from_str(raw).map_err(|e| ManifestError::new(format!("failed to parse: {e}")))?;

    let session = parsed.session.unwrap_or_default();
    if session.dimensions.is_empty() {
        return Err(ManifestError::new(
            "`[session] dimensions` must list at least one base dimension",
        ));
    }

    let gje = parsed.gje.unwrap_or_default();
    let mut out = ResolvedManifest::empty(PathBuf::from("."));
    out.dimensions = dedup_strings(session.dimensions);
    out.backend = session.backend.unwrap_or_default();
    out.timeout_ms = session.timeout_ms;
    out.gje_tool = gje.tool.map(PathBuf::from);
    out.dump_dir = gje.dump_dir.map(PathBuf::from);
    out.aliases = parsed.aliases.into_iter().collect();
    out.logging = parsed.logging.unwrap_or_default();
    Ok(out)
}

fn resolve_path(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

fn dedup_strings(v: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(v.len());
    for s in v {
        if !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_manifest() {
        let m = parse_manifest(
            r#"
            [session]
            dimensions = ["m", "s", "g", "K"]
            backend = "gje"
            timeout_ms = 5000

            [gje]
            tool = "bin/gje"
            dump_dir = "out"

            [aliases.furlong]
            prefix = 2
            exponents = { m = 1 }

            [logging]
            filter = "units_solve=debug"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(m.dimensions, ["m", "s", "g", "K"]);
        assert_eq!(m.backend, BackendKind::Gje);
        assert_eq!(m.timeout_ms, Some(5000));
        assert_eq!(m.gje_tool, Some(PathBuf::from("bin/gje")));
        assert_eq!(
            m.aliases,
            vec![("furlong".to_string(), UnitVector::with_prefix(2).with("m", 1))]
        );
        assert!(m.logging.json);
        assert_eq!(m.logging.filter, "units_solve=debug");
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let m = parse_manifest("[session]\ndimensions = [\"m\"]\n").unwrap();
        assert_eq!(m.backend, BackendKind::Smt);
        assert_eq!(m.timeout_ms, None);
        assert!(m.aliases.is_empty());
        assert_eq!(m.logging, LoggingConfig::default());
    }

    #[test]
    fn dimensions_are_required() {
        let e = parse_manifest("[logging]\njson = true\n").unwrap_err();
        assert!(e.message.contains("dimensions"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_manifest("[session]\ndimensions = [\"m\"]\nbackedn = \"gje\"\n").is_err());
    }

    #[test]
    fn duplicate_dimensions_collapse() {
        let m = parse_manifest("[session]\ndimensions = [\"m\", \"s\", \"m\"]\n").unwrap();
        assert_eq!(m.dimensions, ["m", "s"]);
    }
}
