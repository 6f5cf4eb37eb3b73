//! Purpose: Emit the human-readable load trace (`Loading libstonefs-jni: ...`).
//! Exports: `StatusSink`, `StatusReporter`.
//! Role: Keeps status line wording in one place for the loader, CLI, and tests.
//! Invariants: One line before each attempt that is actually made.
//! Invariants: Exactly one closing `Success!`/`Failure!` line per load sequence.
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Default)]
pub enum StatusSink {
    #[default]
    Stdout,
    Stderr,
    Discard,
    Capture(Arc<Mutex<Vec<String>>>),
}

impl StatusSink {
    /// Sink that records lines in memory, plus the shared buffer to read them back.
    pub fn capture() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        (Self::Capture(lines.clone()), lines)
    }

    fn write_line(&self, line: &str) {
        match self {
            StatusSink::Stdout => {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "{line}");
                let _ = out.flush();
            }
            StatusSink::Stderr => {
                let _ = writeln!(std::io::stderr().lock(), "{line}");
            }
            StatusSink::Discard => {}
            StatusSink::Capture(lines) => {
                let mut lines = lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                lines.push(line.to_string());
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct StatusReporter {
    label: String,
    sink: StatusSink,
}

impl StatusReporter {
    pub fn new(label: impl Into<String>, sink: StatusSink) -> Self {
        Self {
            label: label.into(),
            sink,
        }
    }

    pub fn attempt_path(&self, path: &Path) {
        self.sink
            .write_line(&format!("Loading {}: {}", self.label, path.display()));
    }

    pub fn attempt_default(&self, search_path: &str) {
        self.sink.write_line(&format!(
            "Loading {} from default path: {search_path}",
            self.label
        ));
    }

    pub fn finished(&self, success: bool) {
        let outcome = if success { "Success!" } else { "Failure!" };
        self.sink
            .write_line(&format!("Loading {}: {outcome}", self.label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_follow_load_trace_format() {
        let (sink, lines) = StatusSink::capture();
        let reporter = StatusReporter::new("libstonefs-jni", sink);
        reporter.attempt_default("/opt/stone/lib");
        reporter.attempt_path(Path::new("/usr/lib64/libstonefs_jni.so"));
        reporter.finished(true);
        reporter.finished(false);

        let lines = lines.lock().unwrap();
        assert_eq!(
            *lines,
            vec![
                "Loading libstonefs-jni from default path: /opt/stone/lib",
                "Loading libstonefs-jni: /usr/lib64/libstonefs_jni.so",
                "Loading libstonefs-jni: Success!",
                "Loading libstonefs-jni: Failure!",
            ]
        );
    }
}
