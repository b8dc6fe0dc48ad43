//! Interpreter introspection over short-lived subprocesses.
//!
//! Every query spawns the target interpreter with a one-line script through
//! the sanitized environment and captures its stdout. Calls are bounded by
//! [`QUERY_TIMEOUT`]; a wedged interpreter fails the query instead of
//! hanging resolution.

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use log::debug;
use tokio::process::Command;

use crate::env;
use crate::error::{Error, Result};

/// Upper bound on a single interpreter query.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Interpreter version as reported by `platform.python_version()`.
///
/// Pre-release suffixes are ignored when parsing: "3.13.0rc1" reads as
/// 3.13.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl serde::Serialize for PythonVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for PythonVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().splitn(3, '.');
        let major = leading_number(parts.next().unwrap_or(""));
        let minor = leading_number(parts.next().unwrap_or(""));
        let (Some(major), Some(minor)) = (major, minor) else {
            return Err(Error::Parse(format!("not a python version: {:?}", s)));
        };
        // The patch component may carry a pre-release tag or be missing
        // entirely ("3.13" from a constrained build).
        let patch = parts.next().and_then(leading_number).unwrap_or(0);
        Ok(PythonVersion {
            major,
            minor,
            patch,
        })
    }
}

fn leading_number(part: &str) -> Option<u32> {
    let digits: &str = part
        .split_once(|c: char| !c.is_ascii_digit())
        .map(|(head, _)| head)
        .unwrap_or(part);
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Run `python -c "import <module>; print(<expr>)"` and return trimmed
/// stdout.
pub async fn query_var(python: &Path, module: &str, expr: &str) -> Result<String> {
    let script = format!("import {}; print({})", module, expr);
    run_script(python, &script).await
}

/// Read a build-configuration variable, mapping the textual literal "None"
/// (an unset config var printed by the interpreter) to `default`.
pub async fn config_var(python: &Path, name: &str, default: &str) -> Result<String> {
    let value = query_var(
        python,
        "sysconfig",
        &format!("sysconfig.get_config_var('{}')", name),
    )
    .await?;
    if value == "None" {
        Ok(default.to_string())
    } else {
        Ok(value)
    }
}

/// Interpreter version via `platform.python_version()`.
pub async fn version_of(python: &Path) -> Result<PythonVersion> {
    let raw = query_var(python, "platform", "platform.python_version()").await?;
    raw.parse()
}

/// Runtime home prefix(es) suitable for `PYTHONHOME`.
///
/// Virtual environments do not duplicate the standard runtime support files,
/// so the base prefixes (the installation the environment was created from)
/// are preferred over the active ones; interpreters predating the
/// base-prefix split fall back to `prefix`/`exec_prefix`. Windows treats the
/// two prefix roles identically and gets a single path.
pub async fn home_of(python: &Path) -> Result<String> {
    let script = if cfg!(windows) {
        "import sys; print(getattr(sys, 'base_exec_prefix', sys.exec_prefix))"
    } else {
        "import sys; print(':'.join([getattr(sys, 'base_prefix', sys.prefix), \
         getattr(sys, 'base_exec_prefix', sys.exec_prefix)]))"
    };
    run_script(python, script).await
}

async fn run_script(python: &Path, script: &str) -> Result<String> {
    debug!("querying {}: {}", python.display(), script);

    let mut command = Command::new(python);
    command.arg("-c").arg(script);
    let mut command = env::sanitize(command)?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(QUERY_TIMEOUT, command.output())
        .await
        .map_err(|_| {
            Error::Subprocess(format!(
                "{} did not answer within {:?}",
                python.display(),
                QUERY_TIMEOUT
            ))
        })?
        .map_err(|e| Error::Subprocess(format!("failed to start {}: {}", python.display(), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Subprocess(format!(
            "{} exited with {}: {}",
            python.display(),
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8(output.stdout)
        .map_err(|e| Error::Subprocess(format!("non-UTF-8 interpreter output: {}", e)))?;
    Ok(stdout.trim_end().to_string())
}
