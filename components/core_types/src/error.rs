//! Error types for compilation and execution.

use crate::SourcePosition;
use thiserror::Error;

/// A compiler-detected syntax problem.
///
/// Carries the source position plus an expected/found description so the
/// driver can print a useful diagnostic. A parse error aborts only the
/// compilation of the one class or snippet it occurred in.
#[derive(Debug, Clone, Error)]
#[error("{message} at {position} (expected {expected}, found {found})")]
pub struct ParseError {
    /// Human-readable description of the problem
    pub message: String,
    /// Where in the source the problem was detected
    pub position: SourcePosition,
    /// What the parser was looking for
    pub expected: String,
    /// What it found instead
    pub found: String,
}

/// The kind of a runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// A message was not understood and the program's handler gave up
    DoesNotUnderstand,
    /// A block performed a non-local return after its home activation ended
    EscapedBlock,
    /// An identifier resolved to no global, class file, or handler
    UnknownGlobal,
    /// An argument had the wrong kind for a primitive
    InvalidArgument,
    /// A `primitive` method body with no installed native implementation
    UndefinedPrimitive,
    /// A lazily loaded class file failed to parse
    ParseFailed,
    /// The interpreter's call depth limit was hit
    StackExhausted,
    /// The runtime image itself is broken: missing bootstrap classes or
    /// methods, an unresolvable super-send target, a corrupted frame
    Fatal,
}

/// An execution failure.
///
/// Non-fatal kinds are ordinary user-program errors surfaced to the
/// driver; [`RuntimeErrorKind::Fatal`] indicates a broken runtime image
/// and terminates the process with a diagnostic.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RuntimeError {
    /// What category of failure this is
    pub kind: RuntimeErrorKind,
    /// Human-readable diagnostic
    pub message: String,
}

impl RuntimeError {
    /// Create a runtime error of the given kind.
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a fatal (broken-image) error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::Fatal, message)
    }

    /// Whether this error indicates a broken runtime image.
    pub fn is_fatal(&self) -> bool {
        self.kind == RuntimeErrorKind::Fatal
    }
}
