//! Purpose: Library crate for locating, loading, and initializing the StoneFS native binding.
//! Exports: `loader` (one-shot load), `strategy` (resolution plan), `native` (dlopen seam),
//!          `config`, `status`, `core::error`, and the C ABI in `abi`.
//! Role: Backs the `stonefs-loader` CLI and any host that embeds the binding.
//! Invariants: The library is loaded and its entry point called at most once per loader.
//! Invariants: The override variable, when set, is the only location tried.
pub mod abi;
pub mod config;
pub mod core;
pub mod loader;
pub mod native;
pub mod status;
pub mod strategy;

pub use crate::config::LoaderConfig;
pub use crate::core::error::{Error, ErrorKind, to_exit_code};
pub use crate::loader::{LoadOutcome, LoaderStateSnapshot, NativeBindingLoader};
pub use crate::native::{DlOpener, LibraryOpener, LoadedLibrary};
pub use crate::status::StatusSink;
pub use crate::strategy::{Plan, Strategy, StrategyKind};
