// Core modules shared by the loader and its ABI.
pub mod error;
