//! Python interpreter discovery.
//!
//! The native build is told which interpreter, headers and library to use.
//! The interpreter is asked for its `sysconfig` variables once; locating the
//! header directory and `libpython` from those is done here so it can be
//! tested without an interpreter.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::util::process::{find_executable, ProcessBuilder};

/// Prints the interpreter facts we need as a single JSON object.
const QUERY_SCRIPT: &str = r#"
import json, sys, sysconfig
keys = ("VERSION", "py_version_short", "INCLUDEPY", "INCLUDEDIR", "LDLIBRARY", "LIBRARY",
        "LIBDIR", "LIBDEST", "MULTIARCH", "multiarchsubdir", "WITH_DYLD")
out = {k.lower(): (None if sysconfig.get_config_var(k) is None else str(sysconfig.get_config_var(k))) for k in keys}
paths = sysconfig.get_paths()
out["include"] = paths.get("include")
out["platinclude"] = paths.get("platinclude")
out["executable"] = sys.executable
out["version_full"] = sys.version.split(" ")[0]
out["version_short"] = "%d.%d" % sys.version_info[:2]
out["abiflags"] = getattr(sys, "abiflags", "")
print(json.dumps(out))
"#;

/// Raw answers from the interpreter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SysconfigVars {
    pub version: Option<String>,
    pub py_version_short: Option<String>,
    pub includepy: Option<String>,
    pub includedir: Option<String>,
    pub ldlibrary: Option<String>,
    pub library: Option<String>,
    pub libdir: Option<String>,
    pub libdest: Option<String>,
    pub multiarch: Option<String>,
    pub multiarchsubdir: Option<String>,
    pub with_dyld: Option<String>,
    pub include: Option<String>,
    pub platinclude: Option<String>,
    pub executable: String,
    pub version_full: String,
    pub version_short: String,
    pub abiflags: String,
}

/// Interpreter facts passed to the CMake configure step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonInfo {
    pub executable: PathBuf,
    pub version: String,
    pub include_dir: Option<PathBuf>,
    pub library: Option<PathBuf>,
}

impl PythonInfo {
    /// `-D` definitions for the configure command line.
    pub fn cmake_defines(&self) -> Vec<String> {
        let mut defines = vec![
            format!("-DPYTHON_EXECUTABLE:FILEPATH={}", self.executable.display()),
            format!("-DPYTHON_VERSION_STRING:STRING={}", self.version),
        ];
        if let Some(ref include_dir) = self.include_dir {
            defines.push(format!("-DPYTHON_INCLUDE_DIR:PATH={}", include_dir.display()));
        }
        if let Some(ref library) = self.library {
            defines.push(format!("-DPYTHON_LIBRARY:FILEPATH={}", library.display()));
        }
        defines
    }
}

/// Locate the interpreter: `$PYTHON`, then `python3`, then `python`.
pub fn find_interpreter() -> Option<PathBuf> {
    if let Ok(python) = std::env::var("PYTHON") {
        if !python.is_empty() {
            let path = PathBuf::from(&python);
            if path.is_file() {
                return Some(path);
            }
            return find_executable(&python);
        }
    }
    find_executable("python3").or_else(|| find_executable("python"))
}

/// Query `interpreter` and resolve headers and library.
pub fn discover(interpreter: &Path) -> Result<PythonInfo> {
    let output = ProcessBuilder::new(interpreter)
        .arg("-c")
        .arg(QUERY_SCRIPT)
        .exec()?;
    if !output.status.success() {
        bail!(
            "`{}` could not report its configuration:\n{}",
            interpreter.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let vars: SysconfigVars = serde_json::from_slice(&output.stdout)
        .with_context(|| format!("unexpected output from `{}`", interpreter.display()))?;
    Ok(resolve(&vars))
}

/// Turn raw sysconfig answers into [`PythonInfo`].
pub fn resolve(vars: &SysconfigVars) -> PythonInfo {
    let version = python_version(vars);
    PythonInfo {
        executable: PathBuf::from(&vars.executable),
        version: vars.version_full.clone(),
        include_dir: include_dir(vars, &version),
        library: library(vars, &version),
    }
}

/// `VERSION`, else `py_version_short`, else `major.minor`.
fn python_version(vars: &SysconfigVars) -> String {
    non_empty(&vars.version)
        .or_else(|| non_empty(&vars.py_version_short))
        .map(str::to_string)
        .unwrap_or_else(|| vars.version_short.clone())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn include_dir(vars: &SysconfigVars, version: &str) -> Option<PathBuf> {
    if let Some(includepy) = non_empty(&vars.includepy) {
        if Path::new(includepy).join("Python.h").exists() {
            return Some(PathBuf::from(includepy));
        }
    }

    let parent = |v: &Option<String>| {
        non_empty(v).and_then(|p| Path::new(p).parent().map(Path::to_path_buf))
    };
    let mut prefixes: Vec<PathBuf> = Vec::new();
    prefixes.extend(parent(&vars.includepy));
    prefixes.extend(non_empty(&vars.includedir).map(PathBuf::from));
    prefixes.extend(parent(&vars.include));
    prefixes.extend(parent(&vars.platinclude));
    if let Some(include) = non_empty(&vars.include) {
        prefixes.push(PathBuf::from(include));
        prefixes.push(Path::new(include).join(&vars.version_short));
    }

    let mut versions = vec![version.to_string()];
    if !version.is_empty() {
        versions.push(String::new());
    }

    let found = prefixes
        .iter()
        .flat_map(|prefix| {
            versions
                .iter()
                .map(move |ver| prefix.join(format!("python{}", ver)))
        })
        .find(|candidate| candidate.join("Python.h").exists());

    // Fall back to whatever sysconfig claimed.
    found.or_else(|| non_empty(&vars.includepy).map(PathBuf::from))
}

fn library(vars: &SysconfigVars, version: &str) -> Option<PathBuf> {
    let declared = non_empty(&vars.ldlibrary).or_else(|| non_empty(&vars.library));
    if let Some(library) = declared {
        if !library.ends_with(".a") {
            return Some(match non_empty(&vars.libdir) {
                Some(libdir) if Path::new(library).is_relative() => Path::new(libdir).join(library),
                _ => PathBuf::from(library),
            });
        }
    }

    let mut extensions = vec![".lib", ".so", ".a"];
    if non_empty(&vars.with_dyld).is_some_and(|v| v != "0") {
        extensions.insert(0, ".dylib");
    }

    let mut versions = vec![version.to_string()];
    if !version.is_empty() {
        versions.push(String::new());
        versions.insert(0, version.split('.').take(2).collect::<String>());
    }

    let mut abiflags = vec![vars.abiflags.clone()];
    if !vars.abiflags.is_empty() {
        abiflags.push(String::new());
    }

    let libdir = match non_empty(&vars.libdir) {
        Some(libdir) => {
            let mut dir = PathBuf::from(libdir);
            if non_empty(&vars.multiarch).is_some() {
                if let Some(masd) = non_empty(&vars.multiarchsubdir) {
                    dir = dir.join(masd.trim_start_matches('/'));
                }
            }
            dir
        }
        None => match non_empty(&vars.libdest) {
            Some(libdest) => Path::new(libdest).join("..").join("libs"),
            None => return declared.map(PathBuf::from),
        },
    };

    for prefix in ["", "lib"] {
        for ext in &extensions {
            for ver in &versions {
                for abi in &abiflags {
                    let candidate = libdir.join(format!("{}python{}{}{}", prefix, ver, abi, ext));
                    if candidate.exists() {
                        return Some(candidate);
                    }
                }
            }
        }
    }

    declared.map(PathBuf::from)
}
