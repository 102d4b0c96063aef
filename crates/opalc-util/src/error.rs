//! Backend error type.
//!
//! Errors are values carrying a human-readable message; passes abort on the
//! first error and hand it up the call stack unchanged. The variants follow
//! the backend's error taxonomy so tests can assert on the kind without
//! parsing messages.

use thiserror::Error;

/// An error produced by any backend pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Name resolution failed: undefined identifier, or a type name where a
    /// value was expected (and vice versa).
    #[error("resolution error: {0}")]
    Resolution(String),

    /// A symbol, parameter, or type was defined twice.
    #[error("duplication error: {0}")]
    Duplication(String),

    /// Mismatched types, unviable cast, non-boolean condition, bad callee
    /// or arity.
    #[error("type error: {0}")]
    Typing(String),

    /// The tree has a shape a pass cannot accept: invalid lvalue, member
    /// access on a non-struct, index of a non-array, missing block scope.
    #[error("structural error: {0}")]
    Structural(String),

    /// `break` or `continue` outside a loop.
    #[error("control-flow error: {0}")]
    Control(String),

    /// A construct the backend deliberately does not handle, such as a
    /// template instantiation that survived monomorphisation.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Result type alias used by every pass.
pub type CompileResult<T> = Result<T, CompileError>;
