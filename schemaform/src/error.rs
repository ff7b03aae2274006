//! Error taxonomy and the diagnostics channel.
//!
//! Engine failures are never fatal to a compilation pass. Each fallible
//! operation returns a [`Result`]; the compilers route the `Err` side into
//! [`Diagnostics`] and carry on with a safe default.

use std::fmt;

use serde::Serialize;

/// Errors produced by the pointer library, schema compiler and layout compiler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// Ill-formed pointer string or pointer array.
    #[error("invalid JSON pointer `{pointer}`: {reason}")]
    PointerSyntax { pointer: String, reason: String },

    /// Well-formed pointer that does not address anything.
    #[error("unable to find `{pointer}`")]
    PointerResolutionMiss { pointer: String },

    /// No input type rule matched a schema node.
    #[error("unable to determine input type for schema type `{schema_type}`")]
    SchemaTypeIndeterminate { schema_type: String },

    /// Wrong shape passed to an operation.
    #[error("{operation}: {reason}")]
    MalformedArgument {
        operation: &'static str,
        reason: String,
    },

    /// File access failure while loading form sources.
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    /// Syntax failure while decoding JSON or TOML form sources.
    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
}

impl CompileError {
    pub(crate) fn syntax(pointer: impl fmt::Display, reason: impl Into<String>) -> Self {
        CompileError::PointerSyntax {
            pointer: pointer.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn miss(pointer: impl Into<String>) -> Self {
        CompileError::PointerResolutionMiss {
            pointer: pointer.into(),
        }
    }

    pub(crate) fn malformed(operation: &'static str, reason: impl Into<String>) -> Self {
        CompileError::MalformedArgument {
            operation,
            reason: reason.into(),
        }
    }

    /// Short machine-friendly name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::PointerSyntax { .. } => "pointer-syntax",
            CompileError::PointerResolutionMiss { .. } => "pointer-resolution-miss",
            CompileError::SchemaTypeIndeterminate { .. } => "schema-type-indeterminate",
            CompileError::MalformedArgument { .. } => "malformed-argument",
            CompileError::Io { .. } => "io",
            CompileError::Parse { .. } => "parse",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = CompileError> = std::result::Result<T, E>;

/// One message delivered to the diagnostics channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Operation that produced the message.
    pub source: &'static str,
    pub kind: &'static str,
    pub message: String,
}

/// Collaborator-visible channel for non-fatal compilation failures.
///
/// Every report is also forwarded to the `log` facade at `warn` level.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error raised by `source`.
    pub fn report(&mut self, source: &'static str, err: &CompileError) {
        warn!("{source}: {err}");
        self.entries.push(Diagnostic {
            source,
            kind: err.kind(),
            message: err.to_string(),
        });
    }

    /// Unwrap `result`, reporting the error and substituting `default`.
    pub fn recover<T>(&mut self, source: &'static str, result: Result<T>, default: T) -> T {
        match result {
            Ok(v) => v,
            Err(e) => {
                self.report(source, &e);
                default
            }
        }
    }

    /// Unwrap `result` into an `Option`, reporting the error.
    pub fn ok<T>(&mut self, source: &'static str, result: Result<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.report(source, &e);
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drain all collected diagnostics.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recover_reports_and_defaults() {
        let mut diag = Diagnostics::new();
        let v: usize = diag.recover("test", Err(CompileError::miss("/a/b")), 7);
        assert_eq!(v, 7);
        assert_eq!(diag.len(), 1);
        let entry = diag.iter().next().unwrap();
        assert_eq!(entry.kind, "pointer-resolution-miss");
        assert_eq!(entry.message, "unable to find `/a/b`");
    }

    #[test]
    fn test_ok_passes_values_through() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.ok("test", Ok::<_, CompileError>(3)), Some(3));
        assert!(diag.is_empty());
    }
}
