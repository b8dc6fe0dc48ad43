//! Managed Conda installation paths.
//!
//! pyhost can bind the host to a Conda environment it manages itself,
//! rooted under the per-user data directory. Preferences with `conda`
//! set always resolve to this interpreter, regardless of any explicit
//! interpreter also recorded.

use std::path::{Path, PathBuf};

/// Root of the managed Conda installation.
pub fn root_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("pyhost")
        .join("conda")
}

/// Path to the managed Conda interpreter.
pub fn python_path() -> PathBuf {
    python_path_in(&root_dir())
}

/// Like [`python_path`] but rooted at an explicit directory.
pub fn python_path_in(root: &Path) -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        root.join("python.exe")
    }
    #[cfg(not(target_os = "windows"))]
    {
        root.join("bin").join("python")
    }
}

/// Whether `program` points inside the managed Conda installation.
pub fn is_managed(program: &Path) -> bool {
    program.starts_with(root_dir())
}
