//! Effective-configuration resolution.
//!
//! Combines preferences, executable search, introspection, and library
//! loading into the configuration dependents read. Resolution is
//! best-effort: failures are logged and leave fields unset, and only
//! [`assert_configured`] turns an incomplete configuration into a hard
//! error, at the point something actually needs all of it.

use std::path::{Path, PathBuf};

use log::warn;
use serde::Serialize;

use crate::conda;
use crate::error::{Error, Result};
use crate::introspect::{self, PythonVersion};
use crate::libpython;
use crate::prefs::{self, Preferences};

/// Environment variable consulted for an interpreter override when the
/// stored preferences name none.
pub const PYTHON_ENV_VAR: &str = "PYHOST_PYTHON";

/// Interpreter looked up when nothing names one.
const DEFAULT_PYTHON: &str = "python3";

/// The effective configuration for one resolution pass.
///
/// Recomputed fresh on every pass and never mutated in place; a preference
/// change is observed by resolving again.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PythonConfig {
    pub python: Option<String>,
    pub inprocess: bool,
    pub conda: bool,
    pub python_fullpath: Option<PathBuf>,
    pub libpython: Option<PathBuf>,
    pub python_version: Option<PythonVersion>,
    pub python_home: Option<String>,
}

/// Resolve the effective configuration from the stored preferences.
///
/// Never fails: an unreadable store reads as defaults and discovery errors
/// degrade to unset fields.
pub async fn resolve_effective_config(verbose: bool) -> PythonConfig {
    resolve_effective_config_in(&prefs::default_config_dir(), verbose).await
}

/// Like [`resolve_effective_config`] but with an explicit config directory.
pub async fn resolve_effective_config_in(config_dir: &Path, verbose: bool) -> PythonConfig {
    let prefs = match prefs::load_preferences_in(config_dir) {
        Ok(stored) => stored.unwrap_or_default(),
        Err(e) => {
            warn!("could not read preferences: {}; using defaults", e);
            Preferences::default()
        }
    };
    resolve_from_preferences(&prefs, verbose).await
}

/// Resolution core, shared by the store-backed entry points.
pub async fn resolve_from_preferences(prefs: &Preferences, verbose: bool) -> PythonConfig {
    resolve_from_preferences_in(prefs, &conda::root_dir(), verbose).await
}

/// Like [`resolve_from_preferences`] but with an explicit managed-Conda
/// root.
pub async fn resolve_from_preferences_in(
    prefs: &Preferences,
    conda_root: &Path,
    verbose: bool,
) -> PythonConfig {
    let mut config = PythonConfig {
        python: prefs.python.clone(),
        inprocess: prefs.inprocess,
        conda: prefs.conda,
        ..PythonConfig::default()
    };

    // An embedding host with its own interpreter already loaded has nothing
    // to discover; skip all subprocess work.
    if config.inprocess {
        return config;
    }

    let identifier = interpreter_identifier(prefs, conda_root, std::env::var(PYTHON_ENV_VAR).ok());
    let fullpath = find_executable(&identifier);

    config.python = Some(identifier);
    config.python_fullpath = fullpath.clone();

    let Some(fullpath) = fullpath else {
        warn!(
            "no executable found for '{}'",
            config.python.as_deref().unwrap_or_default()
        );
        return config;
    };

    if let Err(e) = discover(&mut config, &fullpath, verbose).await {
        warn!(
            "interpreter discovery failed for {}: {}",
            fullpath.display(),
            e
        );
    }

    config
}

/// Pick the interpreter to resolve: the managed Conda interpreter wins,
/// then an explicit preference, then the ambient override, then the
/// default lookup name.
fn interpreter_identifier(
    prefs: &Preferences,
    conda_root: &Path,
    env_override: Option<String>,
) -> String {
    if prefs.conda {
        return conda::python_path_in(conda_root).to_string_lossy().into_owned();
    }
    if let Some(ref explicit) = prefs.python {
        return explicit.clone();
    }
    if let Some(ambient) = env_override.filter(|value| !value.is_empty()) {
        return ambient;
    }
    DEFAULT_PYTHON.to_string()
}

/// Probe `python` for its runtime library, version, and home prefixes.
///
/// The loaded library handle goes out of scope here on purpose: the library
/// stays mapped for the process lifetime and only its path is recorded.
async fn discover(config: &mut PythonConfig, python: &Path, verbose: bool) -> Result<()> {
    if let Some((path, _handle)) = libpython::resolve(python, verbose).await {
        config.libpython = Some(path);
    }
    config.python_version = Some(introspect::version_of(python).await?);
    config.python_home = Some(introspect::home_of(python).await?);
    Ok(())
}

/// Resolve an interpreter name or path to a full executable path.
///
/// Anything with a directory component is checked directly; bare names are
/// searched through `PATH`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    find_executable_in(name, &std::env::var("PATH").unwrap_or_default())
}

fn find_executable_in(name: &str, search_path: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }

    for dir in std::env::split_paths(search_path) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        #[cfg(windows)]
        {
            let with_exe = dir.join(format!("{}.exe", name));
            if with_exe.is_file() {
                return Some(with_exe);
            }
        }
    }

    None
}

/// Remediation steps shown when validation fails.
const REMEDIATION: &str = "\
No usable Python configuration is set.

To fix this, either:
  - run `pyhost set --python /path/to/python` with an interpreter built
    with a shared libpython,
  - run `pyhost set --conda` to bind to the managed Conda environment, or
  - install python3 on PATH and run `pyhost check` again.";

/// Validate that every field dependents rely on is populated.
///
/// Fails with [`Error::Configuration`] carrying remediation steps if any
/// required field is unset; succeeds silently otherwise.
pub fn assert_configured(config: &PythonConfig) -> Result<()> {
    let mut missing = Vec::new();
    if config.python.is_none() {
        missing.push("python");
    }
    if config.python_fullpath.is_none() {
        missing.push("python_fullpath");
    }
    if config.libpython.is_none() {
        missing.push("libpython");
    }
    if config.python_version.is_none() {
        missing.push("python_version");
    }
    if config.python_home.is_none() {
        missing.push("PYTHONHOME");
    }

    if missing.is_empty() {
        return Ok(());
    }

    Err(Error::Configuration(format!(
        "unset fields: {}\n\n{}",
        missing.join(", "),
        REMEDIATION
    )))
}
