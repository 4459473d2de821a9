//! User-friendly diagnostic messages.
//!
//! Every fatal error is rendered with its root cause, the command and
//! directories involved, and suggested fixes.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no manifest file is found.
    pub const NO_MANIFEST: &str = "Create a `Cmpack.toml` at the project root";

    /// Suggestion when CMake cannot be run.
    pub const INSTALL_CMAKE: &str = "Install CMake (3.5 or newer) and ensure it's in your PATH";

    /// Suggestion when a build step fails.
    pub const SEE_CMAKE_OUTPUT: &str = "Please see CMake's output for more information";

    /// Suggestion when no generator works.
    pub const PICK_GENERATOR: &str =
        "Pass a generator explicitly with `-G <name>` or set CMAKE_GENERATOR";

    /// Suggestion when install rules escape the staging directory.
    pub const RELATIVE_DESTINATIONS: &str =
        "Use relative DESTINATION paths in install() rules so files land under CMAKE_INSTALL_PREFIX";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = match (color, self.severity) {
            (true, Severity::Error) => "\x1b[1;31merror\x1b[0m".to_string(),
            (true, Severity::Warning) => "\x1b[1;33mwarning\x1b[0m".to_string(),
            (false, severity) => severity.to_string(),
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("    {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("An error occurred while configuring with CMake.")
            .with_context("Command:")
            .with_context("  \"cmake\" \"..\"")
            .with_suggestion(suggestions::SEE_CMAKE_OUTPUT);

        let output = diag.format(false);
        assert!(output.starts_with("error: An error occurred while configuring"));
        assert!(output.contains("\"cmake\" \"..\""));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Please see CMake's output"));
    }

    #[test]
    fn test_warning_with_location() {
        let diag = Diagnostic::warning("multiple install manifests").with_location("_cmpack");
        let output = diag.to_string();
        assert!(output.starts_with("warning: multiple install manifests"));
        assert!(output.contains("--> _cmpack"));
    }
}
