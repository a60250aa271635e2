#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod input;
pub mod logging;
pub mod manifest;
pub mod report;
pub mod session;

pub use cli::{run, Cli, Cmd, OutputFormat};
pub use config::{Overrides, SessionConfig};
pub use input::{ConstraintDocument, InputError, LoadedModel};
pub use manifest::{find_manifest, load_resolved_manifest, ManifestError, ResolvedManifest};
