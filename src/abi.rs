//! Purpose: C ABI bridge so non-Rust hosts can trigger the one-time native load.
//! Exports: `sfsl_ensure_loaded`, `sfsl_is_loaded`, `sfsl_resolved_path`, error/string helpers.
//! Role: Thin wrapper over `NativeBindingLoader::global()`.
//! Invariants: Returned strings and errors are owned by the caller and freed with the `*_free` functions.
//! Invariants: Error kinds map 1:1 with `ErrorKind` via `to_exit_code`.
#![allow(non_camel_case_types)]
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use crate::core::error::{Error, to_exit_code};
use crate::loader::NativeBindingLoader;

#[repr(C)]
pub struct sfsl_error {
    kind: i32,
    message: *mut c_char,
    path: *mut c_char,
}

/// Returns 0 once the library is loaded and initialized, -1 otherwise.
#[unsafe(no_mangle)]
pub extern "C" fn sfsl_ensure_loaded(out_err: *mut *mut sfsl_error) -> i32 {
    match NativeBindingLoader::global().ensure_loaded() {
        Ok(_) => 0,
        Err(err) => fail(out_err, err),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn sfsl_is_loaded() -> i32 {
    i32::from(NativeBindingLoader::global().is_loaded())
}

/// Path the library was loaded from; null before a load or after a default-search load.
#[unsafe(no_mangle)]
pub extern "C" fn sfsl_resolved_path() -> *mut c_char {
    NativeBindingLoader::global()
        .state()
        .resolved_path
        .map(|path| to_c_string(path.to_string_lossy().as_ref()))
        .unwrap_or(ptr::null_mut())
}

#[unsafe(no_mangle)]
pub extern "C" fn sfsl_error_kind(err: *const sfsl_error) -> i32 {
    if err.is_null() {
        return 0;
    }
    unsafe { (*err).kind }
}

/// Borrowed view of the message; valid until `sfsl_error_free`.
#[unsafe(no_mangle)]
pub extern "C" fn sfsl_error_message(err: *const sfsl_error) -> *const c_char {
    if err.is_null() {
        return ptr::null();
    }
    unsafe { (*err).message }
}

#[unsafe(no_mangle)]
pub extern "C" fn sfsl_error_path(err: *const sfsl_error) -> *const c_char {
    if err.is_null() {
        return ptr::null();
    }
    unsafe { (*err).path }
}

#[unsafe(no_mangle)]
pub extern "C" fn sfsl_error_free(err: *mut sfsl_error) {
    if err.is_null() {
        return;
    }
    unsafe {
        let err = Box::from_raw(err);
        free_c_string(err.message);
        free_c_string(err.path);
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn sfsl_string_free(value: *mut c_char) {
    free_c_string(value);
}

fn fail(out_err: *mut *mut sfsl_error, err: Error) -> i32 {
    if out_err.is_null() {
        return -1;
    }
    let message = err.summary().message().unwrap_or("").to_string();
    let error = Box::new(sfsl_error {
        kind: to_exit_code(err.kind()),
        message: to_c_string(&message),
        path: err
            .path()
            .map(|path| to_c_string(path.to_string_lossy().as_ref()))
            .unwrap_or(ptr::null_mut()),
    });
    unsafe {
        *out_err = Box::into_raw(error);
    }
    -1
}

fn to_c_string(input: &str) -> *mut c_char {
    CString::new(input)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

fn free_c_string(value: *mut c_char) {
    if value.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(value));
    }
}
