//! Diagnostic report of the effective configuration.
//!
//! Seven labeled lines in stable order; unset fields render with an empty
//! value so the shape of the report never changes.

use std::path::PathBuf;

use crate::resolve::PythonConfig;

/// Render the seven-line configuration report.
pub fn render_report(config: &PythonConfig) -> String {
    let path = |value: &Option<PathBuf>| {
        value
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    };

    format!(
        "python: {}\n\
         inprocess: {}\n\
         conda: {}\n\
         python_fullpath: {}\n\
         libpython: {}\n\
         python_version: {}\n\
         PYTHONHOME: {}\n",
        config.python.as_deref().unwrap_or_default(),
        config.inprocess,
        config.conda,
        path(&config.python_fullpath),
        path(&config.libpython),
        config
            .python_version
            .map(|v| v.to_string())
            .unwrap_or_default(),
        config.python_home.as_deref().unwrap_or_default(),
    )
}

/// Print the report to stdout.
pub fn print_report(config: &PythonConfig) {
    print!("{}", render_report(config));
}
