// C ABI tests against the process-wide loader.
// This binary holds a single test: the global loader reads the environment once.
#![cfg(target_os = "linux")]

mod common;

use std::ffi::CStr;
use std::ptr;

use stonefs_loader::abi::{
    sfsl_ensure_loaded, sfsl_error, sfsl_error_free, sfsl_is_loaded, sfsl_resolved_path,
    sfsl_string_free,
};
use stonefs_loader::{NativeBindingLoader, StrategyKind};

#[test]
fn global_loader_loads_override_once_through_c_abi() {
    let libc = common::system_libc();
    // Set before the first `global()` access; no other test in this binary touches the env.
    unsafe {
        std::env::set_var("STONE_JNI_PATH", &libc);
        std::env::set_var("STONE_JNI_ENTRY", "sync");
    }

    assert_eq!(sfsl_is_loaded(), 0);
    assert!(sfsl_resolved_path().is_null());

    let mut err: *mut sfsl_error = ptr::null_mut();
    assert_eq!(sfsl_ensure_loaded(&mut err), 0);
    assert!(err.is_null());
    assert_eq!(sfsl_is_loaded(), 1);

    assert_eq!(sfsl_ensure_loaded(&mut err), 0);
    assert!(err.is_null());
    sfsl_error_free(err);

    let path = sfsl_resolved_path();
    assert!(!path.is_null());
    let resolved = unsafe { CStr::from_ptr(path) }
        .to_str()
        .expect("utf8 path")
        .to_string();
    sfsl_string_free(path);
    assert_eq!(resolved, libc.to_str().expect("utf8 path"));

    let loader = NativeBindingLoader::global();
    assert!(loader.plan().is_overridden());
    assert_eq!(loader.config().entry_symbol(), "sync");
    let state = loader.state();
    assert!(state.attempted);
    assert!(state.succeeded);
    assert_eq!(state.strategy, Some(StrategyKind::Override));

    // A third entry through the Rust API reuses the recorded load.
    let outcome = loader.ensure_loaded().expect("recorded outcome");
    assert!(!outcome.first_load);
    assert_eq!(outcome.resolved_path.as_deref(), Some(libc.as_path()));
}
