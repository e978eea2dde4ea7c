//! Error kinds (`spec.md` §7). These never unwind across `step()`: a
//! malformed AST or a non-closure callee settles to `none` and the machine
//! keeps running, exactly as the original implementation observably
//! behaves. `EvalError` is surfaced only where `spec.md` §7 says a
//! host-visible failure can occur: a stuck machine (detected by the host's
//! own watchdog, not by this crate) and the ambient resource budget
//! (`Limits`, see `limits.rs`).
//!
//! Modeled on the teacher's own error-enum style (`resource.rs::ResourceError`,
//! `session_manager.rs::SessionError`): a plain enum with hand-written
//! `Display`/`std::error::Error` impls, no `thiserror`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Operator applied to incompatible operand kinds; callee is not a
    /// closure; condition of if/ternary is not a bool.
    TypeError(String),
    /// Division by zero.
    ArithmeticError(String),
    /// The lhs of an assignment did not reduce to an lvalue.
    AssignmentTargetError,
    /// A call supplied a different number of arguments than the closure's
    /// parameter count.
    ArityError { expected: usize, got: usize },
    /// A node in a variant is uninitialized (parser bug).
    MalformedAst(String),
    /// A `Limits` budget was exceeded.
    ResourceExceeded(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::TypeError(msg) => write!(f, "type error: {msg}"),
            EvalError::ArithmeticError(msg) => write!(f, "arithmetic error: {msg}"),
            EvalError::AssignmentTargetError => {
                write!(f, "assignment target error: lhs is not an lvalue")
            }
            EvalError::ArityError { expected, got } => {
                write!(f, "arity error: expected {expected} argument(s), got {got}")
            }
            EvalError::MalformedAst(msg) => write!(f, "malformed ast: {msg}"),
            EvalError::ResourceExceeded(msg) => write!(f, "resource exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EvalError {}
