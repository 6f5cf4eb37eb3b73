//! Purpose: Describe where the StoneFS native binding may live and how to enter it.
//! Exports: `LoaderConfig` plus the default names and environment variables.
//! Role: Single source of the override variable, short name, fallback dirs, entry symbol.
//! Invariants: Fallback directories are tried in the order they are stored.
//! Invariants: Empty environment values are treated as unset.
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Environment variable naming an exact library path; disables every fallback.
pub const JNI_PATH_ENV_VAR: &str = "STONE_JNI_PATH";
/// Environment variable overriding the entry point symbol.
pub const JNI_ENTRY_ENV_VAR: &str = "STONE_JNI_ENTRY";
/// Colon-separated replacement for the fixed fallback directories.
pub const JNI_FALLBACK_DIRS_ENV_VAR: &str = "STONE_JNI_FALLBACK_DIRS";

pub const LIBRARY_NAME: &str = "stonefs_jni";
pub const LIBRARY_LABEL: &str = "libstonefs-jni";
pub const ENTRY_SYMBOL: &str = "native_initialize";

// RHEL/CentOS first, then Ubuntu/Debian.
pub const DEFAULT_FALLBACK_DIRS: [&str; 2] = ["/usr/lib64", "/usr/lib/jni"];

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoaderConfig {
    override_var: String,
    library_name: String,
    label: String,
    fallback_dirs: Vec<PathBuf>,
    entry_symbol: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            override_var: JNI_PATH_ENV_VAR.to_string(),
            library_name: LIBRARY_NAME.to_string(),
            label: LIBRARY_LABEL.to_string(),
            fallback_dirs: DEFAULT_FALLBACK_DIRS.iter().map(PathBuf::from).collect(),
            entry_symbol: ENTRY_SYMBOL.to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults adjusted by `STONE_JNI_ENTRY` and `STONE_JNI_FALLBACK_DIRS`.
    ///
    /// The override path itself is read at load time, not here, so a
    /// config built early still honors a variable exported later.
    pub fn from_env() -> Self {
        let vars: HashMap<String, String> = [JNI_ENTRY_ENV_VAR, JNI_FALLBACK_DIRS_ENV_VAR]
            .iter()
            .filter_map(|name| env::var(name).ok().map(|value| (name.to_string(), value)))
            .collect();
        Self::from_env_map(&vars)
    }

    pub fn from_env_map(vars: &HashMap<String, String>) -> Self {
        let mut config = Self::default();
        if let Some(entry) = non_empty(vars.get(JNI_ENTRY_ENV_VAR)) {
            config.entry_symbol = entry.to_string();
        }
        if let Some(dirs) = non_empty(vars.get(JNI_FALLBACK_DIRS_ENV_VAR)) {
            let dirs: Vec<PathBuf> = dirs
                .split(':')
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
                .collect();
            // A list of bare separators names no directory; keep the defaults.
            if !dirs.is_empty() {
                config.fallback_dirs = dirs;
            }
        }
        config
    }

    pub fn with_override_var(mut self, name: impl Into<String>) -> Self {
        self.override_var = name.into();
        self
    }

    pub fn with_library_name(mut self, name: impl Into<String>) -> Self {
        self.library_name = name.into();
        self
    }

    pub fn with_fallback_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.fallback_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_entry_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.entry_symbol = symbol.into();
        self
    }

    pub fn override_var(&self) -> &str {
        &self.override_var
    }

    pub fn library_name(&self) -> &str {
        &self.library_name
    }

    /// Name used in status lines, e.g. `libstonefs-jni`.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn fallback_dirs(&self) -> &[PathBuf] {
        &self.fallback_dirs
    }

    pub fn entry_symbol(&self) -> &str {
        &self.entry_symbol
    }

    /// Platform file name for the short name (`libstonefs_jni.so` on Linux).
    pub fn library_file(&self) -> String {
        libloading::library_filename(&self.library_name)
            .to_string_lossy()
            .into_owned()
    }

    /// Current value of the override variable, if set and non-empty.
    pub fn override_path(&self) -> Option<PathBuf> {
        env::var_os(&self.override_var)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|value| !value.is_empty())
}

/// Directories the dynamic linker consults for a bare library name; reported only.
pub fn platform_search_path() -> String {
    let var = if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else if cfg!(windows) {
        "PATH"
    } else {
        "LD_LIBRARY_PATH"
    };
    env::var(var).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_distribution_layout() {
        let config = LoaderConfig::default();
        assert_eq!(config.override_var(), "STONE_JNI_PATH");
        assert_eq!(config.library_name(), "stonefs_jni");
        assert_eq!(config.entry_symbol(), "native_initialize");
        assert_eq!(
            config.fallback_dirs(),
            &[PathBuf::from("/usr/lib64"), PathBuf::from("/usr/lib/jni")]
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn library_file_uses_platform_naming() {
        assert_eq!(LoaderConfig::default().library_file(), "libstonefs_jni.so");
    }

    #[test]
    fn env_map_overrides_entry_and_dirs() {
        let mut vars = HashMap::new();
        vars.insert(JNI_ENTRY_ENV_VAR.to_string(), "stonefs_init".to_string());
        vars.insert(
            JNI_FALLBACK_DIRS_ENV_VAR.to_string(),
            "/opt/stone/lib::/usr/local/lib".to_string(),
        );
        let config = LoaderConfig::from_env_map(&vars);
        assert_eq!(config.entry_symbol(), "stonefs_init");
        assert_eq!(
            config.fallback_dirs(),
            &[PathBuf::from("/opt/stone/lib"), PathBuf::from("/usr/local/lib")]
        );
    }

    #[test]
    fn empty_env_values_keep_defaults() {
        let mut vars = HashMap::new();
        vars.insert(JNI_ENTRY_ENV_VAR.to_string(), String::new());
        vars.insert(JNI_FALLBACK_DIRS_ENV_VAR.to_string(), String::new());
        assert_eq!(LoaderConfig::from_env_map(&vars), LoaderConfig::default());
    }

    #[test]
    fn separator_only_fallback_dirs_keep_defaults() {
        for value in [":", "::", ":::"] {
            let mut vars = HashMap::new();
            vars.insert(JNI_FALLBACK_DIRS_ENV_VAR.to_string(), value.to_string());
            let config = LoaderConfig::from_env_map(&vars);
            assert_eq!(
                config.fallback_dirs(),
                LoaderConfig::default().fallback_dirs(),
                "value {value:?}"
            );
        }
    }

    #[test]
    fn override_path_ignores_unset_variable() {
        let config = LoaderConfig::default().with_override_var("STONEFS_LOADER_TEST_UNSET_VAR");
        assert_eq!(config.override_path(), None);
    }
}
