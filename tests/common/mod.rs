// Helpers shared by the integration test binaries.
#![cfg(target_os = "linux")]

use std::path::{Path, PathBuf};

/// Absolute path of the libc mapped into this process.
pub fn system_libc() -> PathBuf {
    let maps = std::fs::read_to_string("/proc/self/maps").expect("read maps");
    maps.lines()
        .filter_map(|line| line.split_whitespace().nth(5))
        .find(|path| {
            Path::new(path)
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("libc.so"))
        })
        .map(PathBuf::from)
        .expect("libc is mapped")
}
