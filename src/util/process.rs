//! Subprocess execution utilities.
//!
//! Every external tool runs with an explicit working directory set on the
//! child; the parent process never changes its own current directory.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

use anyhow::{Context, Result};

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
    quiet: bool,
    stdout_to_stderr: bool,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            quiet: false,
            stdout_to_stderr: false,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Discard the child's stdout and stderr when running via [`status`].
    ///
    /// [`status`]: ProcessBuilder::status
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Send the child's stdout to our stderr when running via [`status`].
    ///
    /// [`status`]: ProcessBuilder::status
    pub fn stdout_to_stderr(mut self, redirect: bool) -> Self {
        self.stdout_to_stderr = redirect;
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command capturing its output.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("running {}", self.display_command());
        cmd.output()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))
    }

    /// Execute with inherited stdio (unless quiet) and return the status.
    pub fn status(&self) -> Result<ExitStatus> {
        let mut cmd = self.build_command();
        if self.quiet {
            cmd.stdout(Stdio::null());
            cmd.stderr(Stdio::null());
        } else if self.stdout_to_stderr {
            cmd.stdout(Stdio::from(io::stderr()));
        }

        tracing::debug!("running {}", self.display_command());
        cmd.status()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))
    }

    /// Display the command for log lines.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// Display the command so it can be pasted back into a shell.
    ///
    /// Every argument is wrapped in double quotes.
    pub fn display_quoted(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .map(|arg| format!("\"{}\"", arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find CMake.
pub fn find_cmake() -> Option<PathBuf> {
    find_executable("cmake")
}

/// Split a whitespace-separated option string with shell quoting rules.
///
/// Empty words are dropped. An unbalanced quote yields an empty list and a
/// warning, matching how an unset variable is treated.
pub fn split_shell_words(value: &str) -> Vec<String> {
    match shlex::split(value) {
        Some(words) => words.into_iter().filter(|w| !w.is_empty()).collect(),
        None => {
            tracing::warn!("ignoring malformed option string: {}", value);
            Vec::new()
        }
    }
}

/// Read an environment variable holding extra options and lex it.
pub fn env_options(var: &str) -> Vec<String> {
    std::env::var(var)
        .map(|v| split_shell_words(&v))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("cmake").args(["--build", ".", "--target", "install"]);

        assert_eq!(pb.display_command(), "cmake --build . --target install");
    }

    #[test]
    fn test_display_quoted() {
        let pb = ProcessBuilder::new("cmake").args(["..", "-G", "Unix Makefiles"]);

        assert_eq!(
            pb.display_quoted(),
            "\"cmake\" \"..\" \"-G\" \"Unix Makefiles\""
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_redirect_keeps_exit_status() {
        let status = ProcessBuilder::new("sh")
            .args(["-c", "echo noise; exit 3"])
            .stdout_to_stderr(true)
            .status()
            .unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn test_split_shell_words() {
        assert_eq!(
            split_shell_words("-DA=1  '-DB=two words' \"\""),
            vec!["-DA=1", "-DB=two words"]
        );
        assert!(split_shell_words("").is_empty());
        assert!(split_shell_words("'unterminated").is_empty());
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let result = ProcessBuilder::new("/definitely/not/a/real/program")
            .quiet(true)
            .status();
        assert!(result.is_err());
    }
}
