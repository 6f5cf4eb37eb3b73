//! Purpose: Seam between resolution logic and the platform dynamic linker.
//! Exports: `LibraryOpener`, `LoadedLibrary`, `DlOpener`.
//! Role: All `libloading` interaction is confined to this module.
//! Invariants: A `LoadedLibrary` keeps its shared object mapped until dropped.
//! Invariants: On unix the binding is opened `RTLD_NOW | RTLD_GLOBAL`.
//! Invariants: Explicit paths must be absolute; only `DefaultSearch` consults the linker's search path.
use std::ffi::OsStr;
use std::path::Path;

use crate::core::error::{Error, ErrorKind};
use crate::strategy::Strategy;

/// Opens one candidate location. Implementations must not fall back on their own.
pub trait LibraryOpener: Send + Sync {
    fn open(&self, strategy: &Strategy) -> Result<Box<dyn LoadedLibrary>, Error>;
}

pub trait LoadedLibrary: Send + Sync {
    /// Looks up `symbol` as `extern "C" fn()` and calls it once.
    fn initialize(&self, symbol: &str) -> Result<(), Error>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DlOpener;

impl DlOpener {
    pub fn new() -> Self {
        Self
    }
}

impl LibraryOpener for DlOpener {
    fn open(&self, strategy: &Strategy) -> Result<Box<dyn LoadedLibrary>, Error> {
        let library = match strategy {
            Strategy::Override(path) | Strategy::Fixed(path) => {
                if !path.is_absolute() {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("native library path must be absolute")
                        .with_path(path));
                }
                if !path.exists() {
                    return Err(Error::new(ErrorKind::NotFound)
                        .with_message("native library does not exist")
                        .with_path(path));
                }
                open_raw(path.as_os_str()).map_err(|err| link_error(err, Some(path)))?
            }
            Strategy::DefaultSearch { name } => {
                let file = libloading::library_filename(name);
                open_raw(&file).map_err(|err| link_error(err, None))?
            }
        };
        Ok(Box::new(DlLibrary { library }))
    }
}

struct DlLibrary {
    library: libloading::Library,
}

impl LoadedLibrary for DlLibrary {
    fn initialize(&self, symbol: &str) -> Result<(), Error> {
        let entry: libloading::Symbol<'_, unsafe extern "C" fn()> =
            unsafe { self.library.get(symbol.as_bytes()) }.map_err(|err| {
                Error::new(ErrorKind::Symbol)
                    .with_message(format!("entry point `{symbol}` not found"))
                    .with_source(err)
            })?;
        unsafe { entry() };
        Ok(())
    }
}

#[cfg(unix)]
fn open_raw(target: &OsStr) -> Result<libloading::Library, libloading::Error> {
    use libloading::os::unix::Library;
    let library = unsafe { Library::open(Some(target), libc::RTLD_NOW | libc::RTLD_GLOBAL) }?;
    Ok(library.into())
}

#[cfg(not(unix))]
fn open_raw(target: &OsStr) -> Result<libloading::Library, libloading::Error> {
    unsafe { libloading::Library::new(target) }
}

fn link_error(err: libloading::Error, path: Option<&Path>) -> Error {
    let mut error = Error::new(ErrorKind::Link)
        .with_message("failed to load native library")
        .with_source(err);
    if let Some(path) = path {
        error = error.with_path(path);
    }
    error
}
