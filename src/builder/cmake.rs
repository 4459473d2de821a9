//! Driving CMake: configure, build and install into the staging directory.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use regex::Regex;
use semver::Version;
use walkdir::WalkDir;

use crate::builder::generator::CMakePlatform;
use crate::builder::install_manifest;
use crate::builder::python::PythonInfo;
use crate::core::errors::{BuildPhase, SetupError};
use crate::core::layout::ProjectLayout;
use crate::util::diagnostic::suggestions;
use crate::util::fs::{normalize_lexically, read_to_string};
use crate::util::process::{env_options, find_cmake, ProcessBuilder};

/// Oldest CMake we drive.
pub const MIN_CMAKE_VERSION: Version = Version::new(3, 5, 0);

/// Extra configure arguments, shell-lexed.
pub const CONFIGURE_OPTIONS_ENV: &str = "CMPACK_CONFIGURE_OPTIONS";

/// Extra native build tool arguments, shell-lexed.
pub const BUILD_OPTIONS_ENV: &str = "CMPACK_BUILD_OPTIONS";

/// Preferred generator when none is given.
pub const GENERATOR_ENV: &str = "CMAKE_GENERATOR";

const FILE_INSTALL_PATTERN: &str = r#"[ \t]*file\(INSTALL DESTINATION "([^"]+)".*"([^"]+)"\).*"#;

/// Remove every occurrence of option `name` from `args`.
///
/// Accepts `name value`, `name=value` and, for single-dash names, the
/// attached `-Nvalue` form. The last value wins.
pub fn pop_arg(name: &str, args: &[String]) -> (Vec<String>, Option<String>) {
    let short = !name.starts_with("--");
    let mut rest = Vec::with_capacity(args.len());
    let mut value = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == name {
            match iter.next() {
                Some(v) => value = Some(v.clone()),
                None => rest.push(arg.clone()),
            }
        } else if let Some(v) = arg.strip_prefix(name).and_then(|r| r.strip_prefix('=')) {
            value = Some(v.to_string());
        } else if short && arg.len() > name.len() && arg.starts_with(name) {
            value = Some(arg[name.len()..].to_string());
        } else {
            rest.push(arg.clone());
        }
    }

    (rest, value)
}

/// Pull the version out of `cmake --version` output.
pub fn parse_cmake_version(output: &str) -> Option<Version> {
    let word = output
        .lines()
        .next()?
        .split_whitespace()
        .find(|w| w.starts_with(|c: char| c.is_ascii_digit()))?;

    // "3.28.0-rc1" and "3.10" both occur in the wild.
    let core = word.split('-').next()?;
    let mut parts = core.split('.').map(|p| p.parse::<u64>());
    let major = parts.next()?.ok()?;
    let minor = parts.next().unwrap_or(Ok(0)).ok()?;
    let patch = parts.next().unwrap_or(Ok(0)).ok()?;
    Some(Version::new(major, minor, patch))
}

/// Inputs for [`CMaker::configure`].
#[derive(Debug, Clone, Default)]
pub struct ConfigureOptions {
    /// Arguments forwarded to CMake; a `-G` among them selects the generator
    pub clargs: Vec<String>,
    /// Generator from the command line or configuration files
    pub generator: Option<String>,
    /// Native project directory relative to the root
    pub source_dir: String,
    /// Install prefix below the staging directory
    pub install_dir: String,
    /// Languages the generator must support
    pub languages: Vec<String>,
    /// Interpreter facts, if an interpreter was found
    pub python: Option<PythonInfo>,
}

/// A verified CMake installation bound to one project layout.
#[derive(Debug)]
pub struct CMaker {
    cmake: PathBuf,
    version: Version,
    layout: ProjectLayout,
    platform: CMakePlatform,
}

impl CMaker {
    /// Find CMake on PATH and verify it.
    pub fn new(layout: ProjectLayout) -> Result<Self> {
        match find_cmake() {
            Some(cmake) => Self::with_executable(cmake, layout),
            None => Err(cmake_problem(&layout, "CMake was not found in PATH").into()),
        }
    }

    /// Verify a specific CMake executable.
    pub fn with_executable(cmake: impl Into<PathBuf>, layout: ProjectLayout) -> Result<Self> {
        let cmake = cmake.into();

        let output = match ProcessBuilder::new(&cmake).arg("--version").exec() {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                let detail = format!("`cmake --version` exited with {:?}", output.status.code());
                return Err(cmake_problem(&layout, &detail).into());
            }
            Err(e) => return Err(cmake_problem(&layout, &format!("{:#}", e)).into()),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = parse_cmake_version(&stdout).ok_or_else(|| {
            cmake_problem(&layout, &format!("unrecognized version output: {}", stdout.trim()))
        })?;
        if version < MIN_CMAKE_VERSION {
            return Err(cmake_problem(
                &layout,
                &format!("CMake {} is too old, {} or newer is required", version, MIN_CMAKE_VERSION),
            )
            .into());
        }

        tracing::debug!("using cmake {} at {}", version, cmake.display());
        let platform = CMakePlatform::for_host(&cmake);
        Ok(CMaker {
            cmake,
            version,
            layout,
            platform,
        })
    }

    /// Replace the generator platform (candidate list, probe verbosity).
    pub fn with_platform(mut self, platform: CMakePlatform) -> Self {
        self.platform = platform;
        self
    }

    /// Detected CMake version.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Path of the CMake executable.
    pub fn executable(&self) -> &Path {
        &self.cmake
    }

    /// Pick a generator, create the output directories and configure.
    ///
    /// Returns the generator that was used.
    pub fn configure(&self, opts: &ConfigureOptions) -> Result<String> {
        let (clargs, cli_generator) = pop_arg("-G", &opts.clargs);
        let requested = cli_generator
            .or_else(|| opts.generator.clone())
            .or_else(|| std::env::var(GENERATOR_ENV).ok().filter(|g| !g.is_empty()));

        let generator = self.platform.best_generator(
            requested.as_deref(),
            &opts.languages,
            &self.layout.test_compile_dir(),
        )?;

        self.layout.ensure_dirs()?;

        let source_dir = self.layout.source_dir(&opts.source_dir);
        let install_prefix =
            normalize_lexically(&self.layout.install_dir().join(&opts.install_dir));

        let mut cmd = ProcessBuilder::new(&self.cmake)
            .arg(&source_dir)
            .arg("-G")
            .arg(&generator)
            .arg(format!("-DCMAKE_INSTALL_PREFIX:PATH={}", install_prefix.display()));
        if let Some(ref python) = opts.python {
            cmd = cmd.args(python.cmake_defines());
        }
        cmd = cmd
            .arg("-DCMPACK:BOOL=TRUE")
            .args(&clargs)
            .args(env_options(CONFIGURE_OPTIONS_ENV))
            .cwd(self.layout.build_dir())
            .stdout_to_stderr(true);

        tracing::debug!("configuring {} with `{}`", source_dir.display(), generator);
        let status = cmd.status()?;
        if !status.success() {
            return Err(self.step_error(BuildPhase::Configure, &cmd, &source_dir).into());
        }

        self.check_for_bad_installs()?;
        Ok(generator)
    }

    /// Catch install destinations outside the staging directory before the
    /// install runs, by reading CMake's generated `*.cmake` scripts.
    pub fn check_for_bad_installs(&self) -> Result<()> {
        let re = Regex::new(FILE_INSTALL_PATTERN)?;
        let install_root = self.layout.install_dir();
        let prefix = install_root.display().to_string();
        let mut bad_installs = Vec::new();

        for entry in WalkDir::new(self.layout.build_dir()) {
            let entry = entry?;
            if !entry.file_type().is_file()
                || entry.path().extension().and_then(|e| e.to_str()) != Some("cmake")
            {
                continue;
            }

            let contents = read_to_string(entry.path())?;
            for line in contents.lines() {
                let Some(caps) = re.captures(line) else {
                    continue;
                };
                let destination = normalize_lexically(Path::new(
                    &caps[1].replace("${CMAKE_INSTALL_PREFIX}", &prefix),
                ));
                if destination.starts_with(&install_root) {
                    continue;
                }
                let name = Path::new(&caps[2])
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                bad_installs.push(destination.join(name).display().to_string());
            }
        }

        if bad_installs.is_empty() {
            Ok(())
        } else {
            Err(SetupError::BoundaryViolation {
                install_root,
                paths: bad_installs,
            }
            .into())
        }
    }

    /// Build the `install` target.
    ///
    /// A `--config` among `clargs` overrides `config`; everything else is
    /// passed to the native build tool.
    pub fn make(&self, clargs: &[String], config: &str, source_dir: &str) -> Result<()> {
        let (clargs, config_override) = pop_arg("--config", clargs);
        let config = config_override.unwrap_or_else(|| config.to_string());

        let build_dir = self.layout.build_dir();
        if !build_dir.is_dir() {
            bail!(
                "CMake build folder ({}) does not exist. Did you forget to run configure before make?",
                build_dir.display()
            );
        }

        let cmd = ProcessBuilder::new(&self.cmake)
            .args(["--build", ".", "--target", "install", "--config"])
            .arg(&config)
            .arg("--")
            .args(&clargs)
            .args(env_options(BUILD_OPTIONS_ENV))
            .cwd(&build_dir)
            .stdout_to_stderr(true);

        tracing::debug!("building install target ({})", config);
        let status = cmd.status()?;
        if !status.success() {
            let source_dir = self.layout.source_dir(source_dir);
            return Err(self.step_error(BuildPhase::Build, &cmd, &source_dir).into());
        }
        Ok(())
    }

    /// Files the install target produced, relative to the project root.
    pub fn install(&self) -> Result<Vec<PathBuf>> {
        install_manifest::parse_manifests(&self.layout.build_dir(), self.layout.root())
            .context("failed to read the install manifest")
    }

    fn step_error(&self, phase: BuildPhase, cmd: &ProcessBuilder, source_dir: &Path) -> SetupError {
        SetupError::BuildStep {
            phase,
            command: cmd.display_quoted(),
            source_dir: source_dir.to_path_buf(),
            working_dir: self.layout.build_dir(),
        }
    }
}

fn cmake_problem(layout: &ProjectLayout, detail: &str) -> SetupError {
    SetupError::configuration(
        format!(
            "Problem with the CMake installation, aborting build.\n    {}",
            detail
        ),
        layout.root(),
    )
    .with_suggestion(suggestions::INSTALL_CMAKE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pop_arg_separate_value() {
        let (rest, value) = pop_arg("-G", &strings(&["-DA=1", "-G", "Ninja", "-DB=2"]));
        assert_eq!(rest, strings(&["-DA=1", "-DB=2"]));
        assert_eq!(value.as_deref(), Some("Ninja"));
    }

    #[test]
    fn test_pop_arg_attached_and_equals() {
        let (rest, value) = pop_arg("-G", &strings(&["-GNinja"]));
        assert!(rest.is_empty());
        assert_eq!(value.as_deref(), Some("Ninja"));

        let (rest, value) = pop_arg("--config", &strings(&["--config=Debug", "-j4"]));
        assert_eq!(rest, strings(&["-j4"]));
        assert_eq!(value.as_deref(), Some("Debug"));
    }

    #[test]
    fn test_pop_arg_long_option_needs_exact_match() {
        let (rest, value) = pop_arg("--config", &strings(&["--configure"]));
        assert_eq!(rest, strings(&["--configure"]));
        assert!(value.is_none());
    }

    #[test]
    fn test_pop_arg_last_wins() {
        let (_, value) = pop_arg("-G", &strings(&["-G", "Ninja", "-G", "Unix Makefiles"]));
        assert_eq!(value.as_deref(), Some("Unix Makefiles"));
    }

    #[test]
    fn test_parse_cmake_version() {
        assert_eq!(
            parse_cmake_version("cmake version 3.27.4\n\nCMake suite maintained"),
            Some(Version::new(3, 27, 4))
        );
        assert_eq!(parse_cmake_version("cmake version 3.28.0-rc1"), Some(Version::new(3, 28, 0)));
        assert_eq!(parse_cmake_version("cmake3 version 3.10"), Some(Version::new(3, 10, 0)));
        assert_eq!(parse_cmake_version("garbage"), None);
    }

    #[test]
    fn test_missing_cmake_is_configuration_error() {
        let tmp = TempDir::new().unwrap();
        let err = CMaker::with_executable("/definitely/not/cmake", ProjectLayout::new(tmp.path()))
            .unwrap_err();

        let setup_err = err.downcast_ref::<SetupError>().unwrap();
        assert!(matches!(setup_err, SetupError::Configuration { .. }));
        assert!(setup_err.to_string().contains("Problem with the CMake installation"));
    }

    #[cfg(unix)]
    fn fake_cmake(dir: &Path, version: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-cmake");
        std::fs::write(&path, format!("#!/bin/sh\necho 'cmake version {}'\n", version)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_old_cmake_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let cmake = fake_cmake(tmp.path(), "3.4.3");
        let err = CMaker::with_executable(cmake, ProjectLayout::new(tmp.path())).unwrap_err();
        assert!(err.to_string().contains("too old"));
    }

    #[cfg(unix)]
    #[test]
    fn test_bad_install_destinations_are_collected() {
        let tmp = TempDir::new().unwrap();
        let cmake = fake_cmake(tmp.path(), "3.27.4");
        let layout = ProjectLayout::new(tmp.path());
        layout.ensure_dirs().unwrap();

        let script = "\
file(INSTALL DESTINATION \"${CMAKE_INSTALL_PREFIX}/lib\" TYPE FILE FILES \"/src/good.so\")
  file(INSTALL DESTINATION \"/etc/outside\" TYPE FILE FILES \"/src/bad.txt\")
";
        let sub = layout.build_dir().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("cmake_install.cmake"), script).unwrap();
        std::fs::write(layout.build_dir().join("notes.txt"), script).unwrap();

        let cmaker = CMaker::with_executable(cmake, layout.clone()).unwrap();
        let err = cmaker.check_for_bad_installs().unwrap_err();

        match err.downcast_ref::<SetupError>() {
            Some(SetupError::BoundaryViolation { install_root, paths }) => {
                assert_eq!(install_root, &layout.install_dir());
                assert_eq!(paths, &vec!["/etc/outside/bad.txt".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_prefix_relative_installs_accepted_under_dotted_root() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("other")).unwrap();
        let cmake = fake_cmake(tmp.path(), "3.27.4");
        let layout = ProjectLayout::new(tmp.path().join("other/../proj"));
        layout.ensure_dirs().unwrap();
        std::fs::write(
            layout.build_dir().join("cmake_install.cmake"),
            "file(INSTALL DESTINATION \"${CMAKE_INSTALL_PREFIX}/lib\" TYPE FILE FILES \"/src/good.so\")\n",
        )
        .unwrap();

        let cmaker = CMaker::with_executable(cmake, layout).unwrap();
        cmaker.check_for_bad_installs().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_make_requires_build_dir() {
        let tmp = TempDir::new().unwrap();
        let cmake = fake_cmake(tmp.path(), "3.27.4");
        let cmaker = CMaker::with_executable(cmake, ProjectLayout::new(tmp.path())).unwrap();

        let err = cmaker.make(&[], "Release", "").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
