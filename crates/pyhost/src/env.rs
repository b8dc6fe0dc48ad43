//! Subprocess environment sanitizing for interpreter invocations.
//!
//! Shelling into the managed Conda interpreter while some other Python
//! environment is active would let `CONDA_PREFIX`, `PYTHONPATH`, and friends
//! leak across installations and change what the interpreter reports about
//! itself. Every introspection subprocess therefore runs with a copy of the
//! ambient environment that has been filtered for Conda-managed targets and
//! pinned to UTF-8 output.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::conda;
use crate::error::{Error, Result};

/// Variable-name prefixes dropped when the target interpreter is the managed
/// Conda one.
const STRIPPED_PREFIXES: &[&str] = &["CONDA", "PYTHON"];

/// Build the execution environment for an interpreter invocation.
///
/// The command must not carry explicit environment variables yet; merging
/// with a caller-supplied environment is not supported and fails with
/// [`Error::Precondition`]. The ambient environment is copied onto the
/// command, `CONDA*`/`PYTHON*` variables are dropped when the program lies
/// inside the managed Conda installation, and `PYTHONIOENCODING` is forced
/// to UTF-8 so stdout parses deterministically on every platform.
pub fn sanitize(command: Command) -> Result<Command> {
    sanitize_in(command, &conda::root_dir())
}

/// Like [`sanitize`] but with an explicit managed-Conda root.
pub fn sanitize_in(mut command: Command, conda_root: &Path) -> Result<Command> {
    if command.as_std().get_envs().next().is_some() {
        return Err(Error::Precondition(
            "sanitize expects a command without explicit environment variables".to_string(),
        ));
    }

    let program = PathBuf::from(command.as_std().get_program());
    let strip = program.starts_with(conda_root);

    command.env_clear();
    for (name, value) in std::env::vars_os() {
        if strip && has_stripped_prefix(&name) {
            continue;
        }
        command.env(&name, &value);
    }

    // Windows consoles otherwise decode interpreter output with a legacy
    // code page.
    command.env("PYTHONIOENCODING", "utf-8");

    Ok(command)
}

fn has_stripped_prefix(name: &OsStr) -> bool {
    let Some(name) = name.to_str() else {
        return false;
    };
    STRIPPED_PREFIXES.iter().any(|p| name.starts_with(p))
}
