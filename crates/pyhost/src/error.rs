//! Error kinds for discovery, persistence, and validation.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The interpreter could not be started, timed out, or exited non-zero.
    #[error("python subprocess failed: {0}")]
    Subprocess(String),

    /// Interpreter output did not parse as the expected value.
    #[error("could not parse interpreter output: {0}")]
    Parse(String),

    /// A single library candidate failed to load. Recoverable; the resolver
    /// logs it and moves on to the next candidate.
    #[error("failed to load {}: {reason}", .path.display())]
    LibraryLoad { path: PathBuf, reason: String },

    /// Validation found required configuration fields unset. Carries the
    /// remediation steps to show the user.
    #[error("{0}")]
    Configuration(String),

    /// Caller misuse, e.g. sanitizing a command that already carries an
    /// explicit environment.
    #[error("{0}")]
    Precondition(String),
}
