//! Mapping a code address to the loaded module that contains it.

use std::path::PathBuf;

use crate::types::Address;

/// A loaded module as reported by the dynamic loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo
{
    /// Path of the module's file on disk.
    pub path: PathBuf,
    /// Runtime address the module was mapped at.
    pub base: Address,
    /// Nearest exported symbol known to the loader, if any.
    pub symbol: Option<String>,
}

/// Find the module containing `address`.
#[cfg(unix)]
pub fn module_for_address(address: Address) -> Option<ModuleInfo>
{
    use std::ffi::{c_void, CStr};

    let mut info = std::mem::MaybeUninit::<libc::Dl_info>::zeroed();
    // SAFETY: dladdr only reads the loader's tables and writes into `info`;
    // any address value is accepted.
    let ok = unsafe { libc::dladdr(address.value() as usize as *const c_void, info.as_mut_ptr()) };
    if ok == 0 {
        return None;
    }

    // SAFETY: dladdr succeeded, so `info` is initialised.
    let info = unsafe { info.assume_init() };
    if info.dli_fbase.is_null() {
        return None;
    }

    let reported = if info.dli_fname.is_null() {
        None
    } else {
        // SAFETY: non-null dli_fname points at a NUL-terminated string owned by the loader.
        Some(unsafe { CStr::from_ptr(info.dli_fname) }.to_string_lossy().into_owned())
    };
    let symbol = if info.dli_sname.is_null() {
        None
    } else {
        // SAFETY: as above for dli_sname.
        Some(unsafe { CStr::from_ptr(info.dli_sname) }.to_string_lossy().into_owned())
    };

    Some(ModuleInfo {
        path: module_path(reported)?,
        base: Address::from_ptr(info.dli_fbase),
        symbol,
    })
}

/// Find the module containing `address`.
#[cfg(not(unix))]
pub fn module_for_address(_address: Address) -> Option<ModuleInfo>
{
    None
}

/// The loader reports the main program by its `argv[0]`, which may be
/// relative or empty.
fn module_path(reported: Option<String>) -> Option<PathBuf>
{
    match reported.filter(|path| !path.is_empty()).map(PathBuf::from) {
        Some(path) if path.is_absolute() => Some(path),
        Some(path) => path.canonicalize().ok().or_else(|| std::env::current_exe().ok()),
        None => std::env::current_exe().ok(),
    }
}
