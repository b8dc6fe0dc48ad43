//! Platform abstraction over dynamic-library loading.
//!
//! libpython must be opened with global symbol visibility so that extension
//! modules the interpreter loads later can resolve their symbols against it.
//! Handles are never closed: once a runtime library is in the process it
//! stays for the process lifetime, and dropping a [`Handle`] does not unload
//! anything.

use std::fmt;
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A loaded dynamic library. Dropping the handle leaves the library mapped.
pub struct Handle(ManuallyDrop<libloading::Library>);

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handle(..)")
    }
}

/// Open `name_or_path` with lazy binding and global symbol visibility.
///
/// A bare file name (no directory component) resolves through the OS
/// library search path.
pub fn load(name_or_path: &Path) -> Result<Handle> {
    let library = open(name_or_path).map_err(|e| Error::LibraryLoad {
        path: name_or_path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(Handle(ManuallyDrop::new(library)))
}

#[cfg(unix)]
fn open(name_or_path: &Path) -> std::result::Result<libloading::Library, libloading::Error> {
    use libloading::os::unix::Library;

    // RTLD_DEEPBIND keeps a candidate's own symbols ahead of same-named
    // symbols from an interpreter that is already mapped; glibc only.
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    let flags = libc::RTLD_LAZY | libc::RTLD_GLOBAL | libc::RTLD_DEEPBIND;
    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    let flags = libc::RTLD_LAZY | libc::RTLD_GLOBAL;

    unsafe { Library::open(Some(name_or_path), flags).map(Into::into) }
}

#[cfg(windows)]
fn open(name_or_path: &Path) -> std::result::Result<libloading::Library, libloading::Error> {
    unsafe { libloading::Library::new(name_or_path) }
}

/// Filesystem path of the already-loaded library containing `symbol`.
///
/// Used after loading by bare name, where the OS search path decided which
/// file was actually mapped. `symbol` must be NUL-terminated.
#[cfg(unix)]
pub fn resolved_path(handle: &Handle, symbol: &[u8]) -> Option<PathBuf> {
    use std::ffi::{CStr, OsStr};
    use std::os::unix::ffi::OsStrExt;

    let symbol: libloading::Symbol<'_, *mut libc::c_void> =
        unsafe { handle.0.get(symbol).ok()? };
    let mut info: libc::Dl_info = unsafe { std::mem::zeroed() };
    if unsafe { libc::dladdr(*symbol, &mut info) } == 0 || info.dli_fname.is_null() {
        return None;
    }
    let fname = unsafe { CStr::from_ptr(info.dli_fname) };
    Some(PathBuf::from(OsStr::from_bytes(fname.to_bytes())))
}

#[cfg(windows)]
pub fn resolved_path(handle: &Handle, symbol: &[u8]) -> Option<PathBuf> {
    use std::ffi::c_void;
    use std::os::windows::ffi::OsStringExt;
    use windows_sys::Win32::Foundation::HMODULE;
    use windows_sys::Win32::System::LibraryLoader::{
        GetModuleFileNameW, GetModuleHandleExW, GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS,
        GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
    };

    let symbol: libloading::Symbol<'_, *mut c_void> = unsafe { handle.0.get(symbol).ok()? };
    let mut module: HMODULE = std::ptr::null_mut();
    let flags =
        GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT;
    if unsafe { GetModuleHandleExW(flags, (*symbol).cast(), &mut module) } == 0 {
        return None;
    }

    let mut buffer = [0u16; 4096];
    let len = unsafe { GetModuleFileNameW(module, buffer.as_mut_ptr(), buffer.len() as u32) };
    if len == 0 {
        return None;
    }
    Some(PathBuf::from(std::ffi::OsString::from_wide(
        &buffer[..len as usize],
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_path_fails() {
        let err = load(Path::new("/nonexistent/libpython3.999.so")).unwrap_err();
        match err {
            Error::LibraryLoad { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/libpython3.999.so"));
            }
            other => panic!("expected LibraryLoad error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_name_fails() {
        assert!(load(Path::new("libpyhost-does-not-exist.so")).is_err());
    }

    /// Loads a well-known system library and asks the loader where it lives.
    /// Skips itself on hosts where none of the candidate paths exist.
    #[cfg(unix)]
    #[test]
    fn test_resolved_path_of_loaded_library() {
        let candidates = [
            "/lib/x86_64-linux-gnu/libm.so.6",
            "/usr/lib/x86_64-linux-gnu/libm.so.6",
            "/lib/aarch64-linux-gnu/libm.so.6",
            "/usr/lib/aarch64-linux-gnu/libm.so.6",
            "/usr/lib64/libm.so.6",
            "/usr/lib/libm.so.6",
            "/usr/lib/libSystem.B.dylib",
        ];
        let Some(library) = candidates.iter().map(Path::new).find(|p| p.is_file()) else {
            println!("no well-known system library on this host, skipping");
            return;
        };

        let handle = load(library).unwrap();
        let path = resolved_path(&handle, b"cos\0").unwrap();
        assert!(path.is_absolute());
        assert!(path.is_file());
    }
}
