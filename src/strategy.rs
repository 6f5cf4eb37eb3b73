//! Purpose: Turn a `LoaderConfig` plus the override value into an ordered resolution plan.
//! Exports: `Strategy`, `StrategyKind`, `Plan`.
//! Role: Pure data; nothing here touches the dynamic linker.
//! Invariants: An override plan has exactly one, authoritative, step.
//! Invariants: Without an override the default search comes first, then fixed paths in config order.
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Value, json};

use crate::config::LoaderConfig;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Strategy {
    /// Exact path from the override variable.
    Override(PathBuf),
    /// Bare short name handed to the platform search mechanism.
    DefaultSearch { name: String },
    /// Distribution default install location.
    Fixed(PathBuf),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Override,
    DefaultSearch,
    Fixed,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Override => "override",
            StrategyKind::DefaultSearch => "default_search",
            StrategyKind::Fixed => "fixed",
        }
    }
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Override(_) => StrategyKind::Override,
            Strategy::DefaultSearch { .. } => StrategyKind::DefaultSearch,
            Strategy::Fixed(_) => StrategyKind::Fixed,
        }
    }

    /// Failures of an authoritative strategy end resolution immediately.
    pub fn is_authoritative(&self) -> bool {
        matches!(self, Strategy::Override(_))
    }

    /// Explicit path, or `None` for the platform search.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Strategy::Override(path) | Strategy::Fixed(path) => Some(path),
            Strategy::DefaultSearch { .. } => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Strategy::DefaultSearch { name } => json!({
                "strategy": self.kind().as_str(),
                "name": name,
            }),
            Strategy::Override(path) | Strategy::Fixed(path) => json!({
                "strategy": self.kind().as_str(),
                "path": path.display().to_string(),
            }),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Override(path) => write!(f, "{} (override)", path.display()),
            Strategy::DefaultSearch { name } => write!(f, "{name} (default search)"),
            Strategy::Fixed(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Plan {
    steps: Vec<Strategy>,
}

impl Plan {
    pub fn resolve(config: &LoaderConfig, override_path: Option<PathBuf>) -> Self {
        if let Some(path) = override_path.filter(|path| !path.as_os_str().is_empty()) {
            return Self {
                steps: vec![Strategy::Override(path)],
            };
        }

        let file = config.library_file();
        let mut steps = Vec::with_capacity(config.fallback_dirs().len() + 1);
        steps.push(Strategy::DefaultSearch {
            name: config.library_name().to_string(),
        });
        steps.extend(
            config
                .fallback_dirs()
                .iter()
                .map(|dir| Strategy::Fixed(dir.join(&file))),
        );
        Self { steps }
    }

    pub fn steps(&self) -> &[Strategy] {
        &self.steps
    }

    pub fn is_overridden(&self) -> bool {
        self.steps.first().is_some_and(Strategy::is_authoritative)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "overridden": self.is_overridden(),
            "steps": self.steps.iter().map(Strategy::to_json).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn unset_override_yields_full_fallback_chain() {
        let plan = Plan::resolve(&LoaderConfig::default(), None);
        assert_eq!(
            plan.steps(),
            &[
                Strategy::DefaultSearch {
                    name: "stonefs_jni".to_string()
                },
                Strategy::Fixed(PathBuf::from("/usr/lib64/libstonefs_jni.so")),
                Strategy::Fixed(PathBuf::from("/usr/lib/jni/libstonefs_jni.so")),
            ]
        );
        assert!(!plan.is_overridden());
    }

    #[test]
    fn override_is_the_only_step() {
        let plan = Plan::resolve(
            &LoaderConfig::default(),
            Some(PathBuf::from("/opt/lib/custom.so")),
        );
        assert_eq!(
            plan.steps(),
            &[Strategy::Override(PathBuf::from("/opt/lib/custom.so"))]
        );
        assert!(plan.is_overridden());
    }

    #[test]
    fn empty_override_counts_as_unset() {
        let plan = Plan::resolve(&LoaderConfig::default(), Some(PathBuf::new()));
        assert_eq!(plan.steps()[0].kind(), StrategyKind::DefaultSearch);
    }

    #[test]
    fn only_override_is_authoritative() {
        assert!(Strategy::Override(PathBuf::from("/x")).is_authoritative());
        assert!(!Strategy::Fixed(PathBuf::from("/x")).is_authoritative());
        assert!(
            !Strategy::DefaultSearch {
                name: "x".to_string()
            }
            .is_authoritative()
        );
    }

    #[test]
    fn plan_json_lists_steps_in_order() {
        let config = LoaderConfig::default().with_fallback_dirs(["/opt/a"]);
        let value = Plan::resolve(&config, None).to_json();
        assert_eq!(value["overridden"], false);
        let steps = value["steps"].as_array().expect("steps array");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0]["strategy"], "default_search");
        assert_eq!(steps[0]["name"], "stonefs_jni");
        assert_eq!(steps[1]["strategy"], "fixed");
        assert!(steps[1]["path"].as_str().unwrap().starts_with("/opt/a/"));
    }
}
