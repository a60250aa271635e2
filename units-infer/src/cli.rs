#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use serde::Serialize;
use units_core::Solution;
use units_solve::BackendKind;

use crate::config::{Overrides, SessionConfig};
use crate::input::{self, LoadedModel};
use crate::logging;
use crate::manifest;
use crate::session;

#[derive(Parser, Debug)]
#[command(name = "units-infer", version, about = "Dimensional-analysis unit checking and inference")]
pub struct Cli {
    /// Solver backend: `smt` or `gje`. Overrides `units.toml`.
    #[arg(long, global = true)]
    pub backend: Option<BackendKind>,

    /// Base dimension (repeatable). Replaces `[session] dimensions`.
    #[arg(long = "dimension", global = true)]
    pub dimensions: Vec<String>,

    /// SMT solve timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u32>,

    /// External Gauss-Jordan elimination program
    #[arg(long, global = true)]
    pub gje_tool: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Infer units for every variable slot
    Infer {
        /// Constraint document (JSON)
        path: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Exit with an error when the constraints cannot be solved
        #[arg(long)]
        deny_unsolved: bool,
    },

    /// Check constant slots (or a given assignment) against the constraints
    Check {
        /// Constraint document (JSON)
        path: PathBuf,

        /// Assignment for the variable slots, as `{ "<slot>": <unit> }`
        #[arg(long)]
        solution: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Write the SMT-LIB script and the Gauss-Jordan systems for a document
    Emit {
        /// Constraint document (JSON)
        path: PathBuf,

        /// Output directory
        #[arg(long)]
        out: PathBuf,
    },

    /// Print the qualifier lattice for the configured dimensions
    Lattice {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            backend: self.backend,
            dimensions: self.dimensions.clone(),
            timeout_ms: self.timeout_ms,
            gje_tool: self.gje_tool.clone(),
        }
    }

    /// Manifest, logging, then the session configuration.
    fn session(&self, start: &Path) -> miette::Result<SessionConfig> {
        let resolved = manifest::load_resolved_manifest(start)?;
        logging::init_logging(&resolved.logging);
        Ok(SessionConfig::resolve(&resolved, &self.overrides())?)
    }
}

fn load(config: &SessionConfig, path: &Path) -> miette::Result<LoadedModel> {
    let doc = input::load_document(path)?;
    Ok(doc.build(config.dimensions(), config.aliases())?)
}

fn print<T: Serialize + std::fmt::Display>(report: &T, format: OutputFormat) -> miette::Result<()> {
    match format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).into_diagnostic()?)
        }
    }
    Ok(())
}

pub fn run(cli: Cli) -> miette::Result<()> {
    match &cli.cmd {
        Cmd::Infer {
            path,
            format,
            deny_unsolved,
        } => {
            let config = cli.session(path)?;
            let loaded = load(&config, path)?;
            let report = session::infer(&config, &path.display().to_string(), &loaded);
            print(&report, *format)?;
            if *deny_unsolved && !report.ok {
                return Err(miette::miette!("could not infer units for {}", path.display()));
            }
            Ok(())
        }
        Cmd::Check {
            path,
            solution,
            format,
        } => {
            let config = cli.session(path)?;
            let loaded = load(&config, path)?;
            let assignment = match solution {
                Some(file) => {
                    let text = fs::read_to_string(file).into_diagnostic()?;
                    loaded.solution_from_str(&text, config.dimensions(), config.aliases())?
                }
                None => {
                    if let Some((id, location)) = loaded.model.variables().next() {
                        return Err(miette::miette!(
                            "slot `{}` ({location}) has no unit; pass --solution or use `infer`",
                            loaded.name_of(id)
                        ));
                    }
                    Solution::new()
                }
            };
            let report = session::check(&path.display().to_string(), &loaded, &assignment);
            print(&report, *format)?;
            if !report.ok {
                return Err(miette::miette!(
                    "{} constraint(s) violated",
                    report.violations.len()
                ));
            }
            Ok(())
        }
        Cmd::Emit { path, out } => {
            let config = cli.session(path)?;
            let loaded = load(&config, path)?;
            for written in session::emit(&config, &loaded, out)? {
                println!("{}", written.display());
            }
            Ok(())
        }
        Cmd::Lattice { format } => {
            let cwd = std::env::current_dir().into_diagnostic()?;
            let config = cli.session(&cwd)?;
            print(&session::lattice(&config)?, *format)
        }
    }
}
