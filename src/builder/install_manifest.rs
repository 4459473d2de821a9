//! Reading CMake's `install_manifest*.txt` files.
//!
//! CMake writes one absolute path per line for every file installed by the
//! `install` target. The reader turns those into paths relative to the
//! project root; paths outside the root stay absolute so the classifier can
//! report them.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::errors::SetupError;
use crate::util::fs::{glob_sorted, normalize_lexically, read_to_string};

/// Glob matching the manifests CMake leaves in the build directory.
pub const MANIFEST_GLOB: &str = "install_manifest*.txt";

/// Parse the install manifest(s) found in `build_dir`.
///
/// When several manifests exist only the first in sorted order is used and
/// the others are reported with a warning.
pub fn parse_manifests(build_dir: &Path, project_root: &Path) -> Result<Vec<PathBuf>> {
    let manifests = glob_sorted(build_dir, MANIFEST_GLOB)?;

    let Some(first) = manifests.first() else {
        return Err(SetupError::Manifest {
            build_dir: build_dir.to_path_buf(),
        }
        .into());
    };

    if manifests.len() > 1 {
        tracing::warn!(
            "found {} install manifests, only {} is used",
            manifests.len(),
            first.display()
        );
        for ignored in &manifests[1..] {
            tracing::debug!("ignoring install manifest {}", ignored.display());
        }
    }

    parse_manifest(first, project_root)
}

/// Parse a single manifest file.
pub fn parse_manifest(manifest_path: &Path, project_root: &Path) -> Result<Vec<PathBuf>> {
    let contents = read_to_string(manifest_path)?;
    Ok(parse_manifest_str(&contents, project_root))
}

/// Parse manifest contents, one path per line.
pub fn parse_manifest_str(contents: &str, project_root: &Path) -> Vec<PathBuf> {
    let root = normalize_lexically(project_root);

    contents
        .lines()
        .map(|line| line.trim_end_matches(['\r', '\n']))
        .filter(|line| !line.trim().is_empty())
        .map(|line| relative_to_root(Path::new(line), &root))
        .collect()
}

/// Express `path` relative to `root` when it lies underneath it.
fn relative_to_root(path: &Path, root: &Path) -> PathBuf {
    let normalized = normalize_lexically(path);
    if normalized.is_absolute() {
        match normalized.strip_prefix(root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => normalized,
        }
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_manifest_str_relativizes() {
        let contents = "/proj/_cmpack/cmake-install/hello/_hello.so\n\
                        /proj/_cmpack/cmake-install/bin/hello\r\n\
                        \n";
        let paths = parse_manifest_str(contents, Path::new("/proj"));

        assert_eq!(
            paths,
            vec![
                PathBuf::from("_cmpack/cmake-install/hello/_hello.so"),
                PathBuf::from("_cmpack/cmake-install/bin/hello"),
            ]
        );
    }

    #[test]
    fn test_paths_outside_root_stay_absolute() {
        let paths = parse_manifest_str("/etc/outside/file.txt\n", Path::new("/proj"));
        assert_eq!(paths, vec![PathBuf::from("/etc/outside/file.txt")]);
    }

    #[test]
    fn test_dot_dot_escapes_are_resolved() {
        let paths = parse_manifest_str(
            "/proj/_cmpack/cmake-install/../../../outside.txt\n",
            Path::new("/proj"),
        );
        assert_eq!(paths, vec![PathBuf::from("/outside.txt")]);
    }

    #[test]
    fn test_missing_manifest_is_manifest_error() {
        let tmp = TempDir::new().unwrap();
        let err = parse_manifests(tmp.path(), tmp.path()).unwrap_err();

        let setup_err = err.downcast_ref::<SetupError>().unwrap();
        assert!(matches!(setup_err, SetupError::Manifest { .. }));
    }

    #[test]
    fn test_first_manifest_wins() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::write(
            root.join("install_manifest.txt"),
            format!("{}/_cmpack/cmake-install/a.txt\n", root.display()),
        )
        .unwrap();
        std::fs::write(
            root.join("install_manifest_extra.txt"),
            format!("{}/_cmpack/cmake-install/b.txt\n", root.display()),
        )
        .unwrap();

        let paths = parse_manifests(root, root).unwrap();
        assert_eq!(paths, vec![PathBuf::from("_cmpack/cmake-install/a.txt")]);
    }
}
