//! Fatal error taxonomy for a setup run.
//!
//! Every variant aborts the whole run. The binary renders them through
//! [`SetupError::to_diagnostic`] and exits with a non-zero status.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Which external build phase failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Configure,
    Build,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildPhase::Configure => write!(f, "configuring"),
            BuildPhase::Build => write!(f, "building"),
        }
    }
}

/// Errors that abort a setup run.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum SetupError {
    /// Command line could not be understood.
    #[error("{message}")]
    #[diagnostic(code(cmpack::usage))]
    Usage { message: String },

    /// CMake is missing or project parameters are invalid.
    #[error("{message}")]
    #[diagnostic(code(cmpack::configuration))]
    Configuration {
        message: String,
        project_root: PathBuf,
        suggestion: Option<&'static str>,
    },

    /// No candidate generator could compile a trivial project.
    #[error("Could not get working generator for your system. Aborting build.")]
    #[diagnostic(
        code(cmpack::generator),
        help("Pass a generator explicitly with `-G <name>` or set CMAKE_GENERATOR")
    )]
    GeneratorSelection { tried: Vec<String> },

    /// The external configure or build invocation returned non-zero.
    #[error("An error occurred while {phase} with CMake.")]
    #[diagnostic(code(cmpack::build_step))]
    BuildStep {
        phase: BuildPhase,
        command: String,
        source_dir: PathBuf,
        working_dir: PathBuf,
    },

    /// Installed (or to-be-installed) files fall outside the staging directory.
    #[error("CMake-installed files must be within the project root.")]
    #[diagnostic(
        code(cmpack::boundary_violation),
        help("Use relative DESTINATION paths in install() rules")
    )]
    BoundaryViolation {
        install_root: PathBuf,
        paths: Vec<String>,
    },

    /// The build claimed success but left no install manifest behind.
    #[error("no install manifest found in `{}`", .build_dir.display())]
    #[diagnostic(code(cmpack::manifest))]
    Manifest { build_dir: PathBuf },

    /// Module enumeration across the source and install trees failed.
    #[error("error: {message}")]
    #[diagnostic(code(cmpack::module_discovery))]
    ModuleDiscovery { message: String },
}

impl SetupError {
    /// Build a configuration error for a project root.
    pub fn configuration(message: impl Into<String>, project_root: impl Into<PathBuf>) -> Self {
        SetupError::Configuration {
            message: message.into(),
            project_root: project_root.into(),
            suggestion: None,
        }
    }

    /// Attach a suggestion to a configuration error.
    pub fn with_suggestion(self, text: &'static str) -> Self {
        match self {
            SetupError::Configuration {
                message,
                project_root,
                ..
            } => SetupError::Configuration {
                message,
                project_root,
                suggestion: Some(text),
            },
            other => other,
        }
    }

    /// Build a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        SetupError::Usage {
            message: message.into(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            SetupError::Usage { message } => Diagnostic::error(message.clone()),

            SetupError::Configuration {
                message,
                project_root,
                suggestion,
            } => {
                let diag = Diagnostic::error(message.clone())
                    .with_context(format!("Project Root  : {}", project_root.display()));
                match suggestion {
                    Some(text) => diag.with_suggestion(*text),
                    None => diag,
                }
            }

            SetupError::GeneratorSelection { tried } => {
                let mut diag = Diagnostic::error(self.to_string());
                if !tried.is_empty() {
                    diag = diag.with_context(format!("Tried: {}", tried.join(", ")));
                }
                diag.with_suggestion(suggestions::PICK_GENERATOR)
            }

            SetupError::BuildStep {
                command,
                source_dir,
                working_dir,
                ..
            } => Diagnostic::error(self.to_string())
                .with_context("Command:")
                .with_context(format!("  {}", command))
                .with_context("Source directory:")
                .with_context(format!("  {}", source_dir.display()))
                .with_context("Working directory:")
                .with_context(format!("  {}", working_dir.display()))
                .with_suggestion(suggestions::SEE_CMAKE_OUTPUT),

            SetupError::BoundaryViolation {
                install_root,
                paths,
            } => {
                let mut diag = Diagnostic::error(self.to_string())
                    .with_context("Project Root:")
                    .with_context(format!("  {}", install_root.display()))
                    .with_context("Violating Files:");
                for path in paths {
                    diag = diag.with_context(format!("  {}", path));
                }
                diag.with_suggestion(suggestions::RELATIVE_DESTINATIONS)
            }

            SetupError::Manifest { build_dir } => Diagnostic::error(self.to_string())
                .with_location(build_dir.clone())
                .with_suggestion("Make sure the project defines install() rules"),

            SetupError::ModuleDiscovery { message } => Diagnostic::error(message.clone()),
        }
    }
}
