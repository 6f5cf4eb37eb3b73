use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    NotFound,
    Link,
    Symbol,
    Io,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    path: Option<PathBuf>,
    hint: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            path: None,
            hint: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Copy of kind, message, path and hint; the source chain is flattened into the message.
    pub(crate) fn summary(&self) -> Self {
        let mut message = self.message.clone().unwrap_or_default();
        if let Some(source) = &self.source {
            if message.is_empty() {
                message = source.to_string();
            } else {
                message = format!("{message}: {source}");
            }
        }
        Self {
            kind: self.kind,
            message: (!message.is_empty()).then_some(message),
            path: self.path.clone(),
            hint: self.hint.clone(),
            source: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Link => 4,
        ErrorKind::Symbol => 5,
        ErrorKind::Io => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};
    use std::error::Error as _;
    use std::io;

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::NotFound, 3),
            (ErrorKind::Link, 4),
            (ErrorKind::Symbol, 5),
            (ErrorKind::Io, 6),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn display_includes_message_and_path() {
        let err = Error::new(ErrorKind::Link)
            .with_message("cannot open shared object")
            .with_path("/usr/lib64/libstonefs_jni.so");
        assert_eq!(
            err.to_string(),
            "Link: cannot open shared object (path: /usr/lib64/libstonefs_jni.so)"
        );
    }

    #[test]
    fn summary_flattens_source_into_message() {
        let err = Error::new(ErrorKind::Io)
            .with_message("stat failed")
            .with_hint("check permissions")
            .with_source(io::Error::other("denied"));
        assert!(err.source().is_some());

        let summary = err.summary();
        assert_eq!(summary.kind(), ErrorKind::Io);
        assert_eq!(summary.message(), Some("stat failed: denied"));
        assert_eq!(summary.hint(), Some("check permissions"));
        assert!(summary.source().is_none());
    }
}
