//! Python interpreter and libpython discovery for embedding hosts.
//!
//! This crate answers one question for a process that wants to embed or
//! shell out to Python: *which* interpreter, *which* runtime library, and
//! *which* home prefixes. The answer is derived from durable preferences
//! plus live interpreter introspection:
//!
//! - [`prefs`] persists the user's choice (explicit interpreter, managed
//!   Conda environment, or in-process mode) as a minimal JSON record.
//! - [`resolve`] turns the stored preferences into a [`PythonConfig`],
//!   probing the chosen interpreter through sanitized subprocesses and
//!   loading its runtime library with global symbol visibility.
//! - [`resolve::assert_configured`] gates dependents that need a complete
//!   configuration.
//!
//! Resolution is best-effort by design: a missing interpreter or unloadable
//! library leaves fields unset instead of failing, and only validation
//! turns incompleteness into an error.
//!
//! ```ignore
//! let config = pyhost::resolve_effective_config(false).await;
//! pyhost::assert_configured(&config)?;
//! println!("{}", pyhost::status::render_report(&config));
//! ```

pub mod conda;
pub mod dylib;
pub mod env;
pub mod error;
pub mod introspect;
pub mod libpython;
pub mod prefs;
pub mod resolve;
pub mod status;

// Re-export key types
pub use error::{Error, Result};
pub use introspect::PythonVersion;
pub use prefs::Preferences;
pub use resolve::{assert_configured, resolve_effective_config, PythonConfig};
