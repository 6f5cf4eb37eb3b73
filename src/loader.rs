//! Purpose: Load and initialize the StoneFS native binding at most once.
//! Exports: `NativeBindingLoader`, `LoadOutcome`, `LoaderStateSnapshot`.
//! Role: Runs the resolution plan once per loader and records what happened.
//! Invariants: One load sequence per loader; other threads wait on `settled` until it ends.
//! Invariants: The state mutex is never held while the opener or the entry point runs.
//! Invariants: A call from the loading thread itself returns without waiting.
//! Invariants: `attempted` and `succeeded` are set once and never cleared.
//! Invariants: Only the last plan step, or an authoritative one, surfaces its failure.
//! Notes: The process-wide loader from `global()` is never dropped, so the library stays mapped.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock};
use std::thread::{self, ThreadId};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{LoaderConfig, platform_search_path};
use crate::core::error::{Error, ErrorKind};
use crate::native::{DlOpener, LibraryOpener, LoadedLibrary};
use crate::status::{StatusReporter, StatusSink};
use crate::strategy::{Plan, Strategy, StrategyKind};

static GLOBAL: OnceLock<NativeBindingLoader> = OnceLock::new();

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LoadOutcome {
    pub strategy: StrategyKind,
    /// `None` when the platform search mechanism found the library.
    pub resolved_path: Option<PathBuf>,
    /// False when an earlier call already did the work.
    pub first_load: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct LoaderStateSnapshot {
    pub attempted: bool,
    pub succeeded: bool,
    pub resolved_path: Option<PathBuf>,
    pub strategy: Option<StrategyKind>,
}

impl LoaderStateSnapshot {
    pub fn initialized(&self) -> bool {
        self.attempted
    }
}

#[derive(Default)]
struct LoaderState {
    attempted: bool,
    succeeded: bool,
    resolved_path: Option<PathBuf>,
    strategy: Option<StrategyKind>,
    failure: Option<Error>,
    library: Option<Arc<dyn LoadedLibrary>>,
    loading: Option<ThreadId>,
}

impl LoaderState {
    fn snapshot(&self) -> LoaderStateSnapshot {
        LoaderStateSnapshot {
            attempted: self.attempted,
            succeeded: self.succeeded,
            resolved_path: self.resolved_path.clone(),
            strategy: self.strategy,
        }
    }

    fn recorded(&self) -> Result<LoadOutcome, Error> {
        match (self.succeeded, self.strategy, &self.failure) {
            (true, Some(strategy), _) => Ok(LoadOutcome {
                strategy,
                resolved_path: self.resolved_path.clone(),
                first_load: false,
            }),
            (_, _, Some(failure)) => Err(failure
                .summary()
                .with_hint("An earlier load attempt failed; restart the process to retry.")),
            _ => Err(Error::new(ErrorKind::Internal)
                .with_message("native library load was interrupted")),
        }
    }

    /// Answer for a call made by the thread that is running the load sequence.
    fn reentered(&self) -> Result<LoadOutcome, Error> {
        match self.strategy {
            Some(strategy) => Ok(LoadOutcome {
                strategy,
                resolved_path: self.resolved_path.clone(),
                first_load: false,
            }),
            None => Err(Error::new(ErrorKind::Internal)
                .with_message("native library load re-entered before the library was opened")),
        }
    }
}

#[derive(Clone, Debug)]
enum OverrideSource {
    Environment,
    Pinned(Option<PathBuf>),
}

pub struct NativeBindingLoader {
    config: LoaderConfig,
    opener: Box<dyn LibraryOpener>,
    status: StatusSink,
    override_source: OverrideSource,
    loaded: AtomicBool,
    state: Mutex<LoaderState>,
    settled: Condvar,
}

impl NativeBindingLoader {
    pub fn new(config: LoaderConfig, opener: impl LibraryOpener + 'static) -> Self {
        Self {
            config,
            opener: Box::new(opener),
            status: StatusSink::default(),
            override_source: OverrideSource::Environment,
            loaded: AtomicBool::new(false),
            state: Mutex::new(LoaderState::default()),
            settled: Condvar::new(),
        }
    }

    /// Loader backed by the platform dynamic linker, configured from the environment.
    pub fn from_env() -> Self {
        Self::new(LoaderConfig::from_env(), DlOpener::new())
    }

    /// The process-wide loader. Built on first access and never dropped.
    pub fn global() -> &'static NativeBindingLoader {
        GLOBAL.get_or_init(Self::from_env)
    }

    pub fn with_status(mut self, sink: StatusSink) -> Self {
        self.status = sink;
        self
    }

    /// Uses `path` as the override value instead of reading the override variable.
    pub fn with_override(mut self, path: Option<PathBuf>) -> Self {
        self.override_source = OverrideSource::Pinned(path);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The plan `ensure_loaded` would execute right now.
    pub fn plan(&self) -> Plan {
        let override_path = match &self.override_source {
            OverrideSource::Environment => self.config.override_path(),
            OverrideSource::Pinned(path) => path.clone(),
        };
        Plan::resolve(&self.config, override_path)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LoaderStateSnapshot {
        self.lock_state().snapshot()
    }

    /// Loads the library and calls its entry point, once.
    ///
    /// Concurrent callers block until the first one finishes and then see
    /// its result. A failed attempt is not retried: later calls return the
    /// recorded failure. A call made from inside the entry point (or from a
    /// library constructor) on the loading thread does not wait; it gets the
    /// location opened so far, or an `Internal` error if nothing is open yet.
    pub fn ensure_loaded(&self) -> Result<LoadOutcome, Error> {
        let current = thread::current().id();
        let mut state = self.lock_state();
        loop {
            if state.attempted {
                return state.recorded();
            }
            match state.loading {
                None => break,
                Some(owner) if owner == current => return state.reentered(),
                Some(_) => {
                    state = self
                        .settled
                        .wait(state)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
        }
        state.loading = Some(current);
        drop(state);

        let _settle = Settle { loader: self };
        self.load_sequence()
    }

    fn load_sequence(&self) -> Result<LoadOutcome, Error> {
        let plan = self.plan();
        let reporter = StatusReporter::new(self.config.label(), self.status.clone());
        let resolved = self.resolve(&plan, &reporter);
        reporter.finished(resolved.is_ok());

        let (library, strategy) = match resolved {
            Ok(found) => found,
            Err(err) => {
                self.lock_state().failure = Some(err.summary());
                return Err(err);
            }
        };
        let library: Arc<dyn LoadedLibrary> = Arc::from(library);
        let resolved_path = strategy.path().map(Path::to_path_buf);
        {
            let mut state = self.lock_state();
            state.strategy = Some(strategy.kind());
            state.resolved_path = resolved_path.clone();
            state.library = Some(Arc::clone(&library));
        }

        let symbol = self.config.entry_symbol();
        debug!(symbol, "invoking native entry point");
        if let Err(err) = library.initialize(symbol) {
            self.lock_state().failure = Some(err.summary());
            return Err(err);
        }

        self.lock_state().succeeded = true;
        self.loaded.store(true, Ordering::Release);
        info!(location = %strategy, "native library initialized");
        Ok(LoadOutcome {
            strategy: strategy.kind(),
            resolved_path,
            first_load: true,
        })
    }

    fn resolve(
        &self,
        plan: &Plan,
        reporter: &StatusReporter,
    ) -> Result<(Box<dyn LoadedLibrary>, Strategy), Error> {
        let steps = plan.steps();
        let mut skipped = Vec::new();
        for (index, strategy) in steps.iter().enumerate() {
            match strategy.path() {
                Some(path) => reporter.attempt_path(path),
                None => reporter.attempt_default(&platform_search_path()),
            }
            debug!(location = %strategy, "attempting native library load");

            let err = match self.opener.open(strategy) {
                Ok(library) => return Ok((library, strategy.clone())),
                Err(err) => err,
            };
            if strategy.is_authoritative() {
                return Err(err.with_hint(format!(
                    "{} is set; unset it to search the default locations.",
                    self.config.override_var()
                )));
            }
            if index + 1 == steps.len() {
                return Err(exhausted(err, &skipped, self.config.override_var()));
            }
            warn!(location = %strategy, error = %err, "native library load failed; trying next location");
            skipped.push(format!("{strategy}: {err}"));
        }
        Err(Error::new(ErrorKind::Internal).with_message("resolution plan is empty"))
    }

    fn lock_state(&self) -> MutexGuard<'_, LoaderState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Ends the load sequence, even when the entry point unwinds, and wakes waiters.
struct Settle<'a> {
    loader: &'a NativeBindingLoader,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        let mut state = self.loader.lock_state();
        state.attempted = true;
        state.loading = None;
        drop(state);
        self.loader.settled.notify_all();
    }
}

fn exhausted(last: Error, skipped: &[String], override_var: &str) -> Error {
    let mut message = format!("native library not found in {} locations", skipped.len() + 1);
    for line in skipped {
        message.push_str("; ");
        message.push_str(line);
    }
    let mut err = Error::new(ErrorKind::Link).with_message(message);
    if let Some(path) = last.path() {
        err = err.with_path(path);
    }
    err.with_hint(format!(
        "Set {override_var} or add the library directory to the platform search path."
    ))
    .with_source(last)
}
