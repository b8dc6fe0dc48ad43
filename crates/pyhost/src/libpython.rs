//! libpython location and loading.
//!
//! Naming and location conventions for the interpreter runtime library vary
//! by OS, build (shared vs static), and packaging (framework vs flat), and
//! with several interpreters installed, loading a same-named library from
//! the wrong one corrupts the process at runtime. Candidates therefore come
//! from the target interpreter's own build configuration via a vendored
//! helper script: full paths first, bare names through the OS search path
//! only as a last resort.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, info, warn};
use tokio::process::Command;

use crate::dylib;
use crate::env;
use crate::error::{Error, Result};
use crate::introspect::QUERY_TIMEOUT;

/// Candidate-generation helper, materialized into the cache directory
/// before use.
const HELPER_SCRIPT: &str = include_str!("../scripts/find_libpython.py");
const HELPER_NAME: &str = "find_libpython.py";

/// Present in every libpython; used to ask the loader which file a
/// bare-name load actually mapped.
const PROBE_SYMBOL: &[u8] = b"Py_GetVersion\0";

/// Locate and load the runtime library for `python`.
///
/// Returns the first full-path candidate that loads, with global symbol
/// visibility, as `(path, handle)`. When no full path loads, bare library
/// names are tried through the OS search path and the *actual* path of
/// whatever got mapped is returned. `None` means every candidate failed;
/// individual load failures are logged, never raised.
pub async fn resolve(python: &Path, verbose: bool) -> Option<(PathBuf, dylib::Handle)> {
    let paths = match run_helper(python, "--list-all", verbose).await {
        Ok(paths) => paths,
        Err(e) => {
            warn!(
                "could not list libpython candidates for {}: {}",
                python.display(),
                e
            );
            Vec::new()
        }
    };

    for candidate in &paths {
        let path = PathBuf::from(candidate);
        match dylib::load(&path) {
            Ok(handle) => {
                info!("loaded libpython at {}", path.display());
                return Some((path, handle));
            }
            Err(e) => warn!("candidate rejected: {}", e),
        }
    }

    // Bare names resolve through the OS library search path, which may pick
    // the wrong installation when several are present; last resort only.
    let names = match run_helper(python, "--candidate-names", verbose).await {
        Ok(names) => names,
        Err(e) => {
            debug!(
                "could not list libpython candidate names for {}: {}",
                python.display(),
                e
            );
            Vec::new()
        }
    };

    for name in &names {
        let normalized = normalized_name(name);
        match dylib::load(Path::new(&normalized)) {
            Ok(handle) => {
                let path = dylib::resolved_path(&handle, PROBE_SYMBOL)
                    .unwrap_or_else(|| PathBuf::from(&normalized));
                info!("loaded libpython by name {} at {}", name, path.display());
                return Some((path, handle));
            }
            Err(e) => debug!("name candidate rejected: {}", e),
        }
    }

    None
}

/// Strip whatever suffix the helper reported and re-append the platform
/// one, so versioned suffixes like ".so.1.0" become loadable names.
fn normalized_name(name: &str) -> String {
    format!("{}{}", strip_library_suffix(name), std::env::consts::DLL_SUFFIX)
}

fn strip_library_suffix(name: &str) -> &str {
    for suffix in [".so", ".dylib", ".dll"] {
        if let Some(idx) = name.find(suffix) {
            return &name[..idx];
        }
    }
    name
}

/// Run the helper in the given mode and collect one candidate per line.
async fn run_helper(python: &Path, mode: &str, verbose: bool) -> Result<Vec<String>> {
    let helper = ensure_helper().await?;

    let mut command = Command::new(python);
    command.arg(&helper).arg(mode);
    if verbose {
        command.arg("--verbose");
        command.stderr(Stdio::inherit());
    } else {
        command.stderr(Stdio::null());
    }
    let mut command = env::sanitize(command)?;
    command.stdin(Stdio::null()).stdout(Stdio::piped());

    let output = tokio::time::timeout(QUERY_TIMEOUT, command.output())
        .await
        .map_err(|_| {
            Error::Subprocess(format!(
                "{} {} did not answer within {:?}",
                python.display(),
                mode,
                QUERY_TIMEOUT
            ))
        })?
        .map_err(|e| Error::Subprocess(format!("failed to start {}: {}", python.display(), e)))?;

    if !output.status.success() {
        return Err(Error::Subprocess(format!(
            "{} {} exited with {}",
            python.display(),
            mode,
            output.status
        )));
    }

    let stdout = String::from_utf8(output.stdout)
        .map_err(|e| Error::Subprocess(format!("non-UTF-8 helper output: {}", e)))?;
    Ok(stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Write the vendored helper into the cache directory and return its path.
///
/// Rewritten whenever the on-disk copy differs from the embedded one, so
/// upgrades pick up helper changes.
async fn ensure_helper() -> Result<PathBuf> {
    let dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("pyhost");
    let path = dir.join(HELPER_NAME);

    let current = tokio::fs::read_to_string(&path).await.ok();
    if current.as_deref() != Some(HELPER_SCRIPT) {
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::Subprocess(format!("could not create {}: {}", dir.display(), e)))?;
        tokio::fs::write(&path, HELPER_SCRIPT)
            .await
            .map_err(|e| Error::Subprocess(format!("could not write {}: {}", path.display(), e)))?;
        debug!("materialized helper at {}", path.display());
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_plain_suffix() {
        assert_eq!(strip_library_suffix("libpython3.11.so"), "libpython3.11");
        assert_eq!(strip_library_suffix("libpython3.9.dylib"), "libpython3.9");
        assert_eq!(strip_library_suffix("python311.dll"), "python311");
    }

    #[test]
    fn test_strip_versioned_suffix() {
        assert_eq!(
            strip_library_suffix("libpython3.11.so.1.0"),
            "libpython3.11"
        );
    }

    #[test]
    fn test_strip_leaves_bare_stem_alone() {
        assert_eq!(strip_library_suffix("libpython3.11"), "libpython3.11");
    }

    #[test]
    fn test_normalized_name_uses_platform_suffix() {
        let name = normalized_name("libpython3.11.so.1.0");
        assert!(name.starts_with("libpython3.11"));
        assert!(name.ends_with(std::env::consts::DLL_SUFFIX));
    }

    #[cfg(unix)]
    mod subprocess {
        use super::super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn fake_python(dir: &TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("python3");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_resolve_returns_none_without_candidates() {
            let dir = TempDir::new().unwrap();
            // Helper runs but reports nothing in either mode.
            let python = fake_python(&dir, "exit 0");

            assert!(resolve(&python, false).await.is_none());
        }

        #[tokio::test]
        async fn test_resolve_returns_none_when_no_candidate_loads() {
            let dir = TempDir::new().unwrap();
            let python = fake_python(&dir, "echo /nonexistent/libpython3.999.so");

            assert!(resolve(&python, false).await.is_none());
        }

        #[tokio::test]
        async fn test_resolve_survives_broken_interpreter() {
            let dir = TempDir::new().unwrap();
            let python = fake_python(&dir, "exit 3");

            assert!(resolve(&python, false).await.is_none());
        }
    }
}
