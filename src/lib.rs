//! steinlang: a small-step, stack-based evaluator for a dynamically-typed
//! expression language with closures, tuples, mutable bindings, and
//! pause/snapshot/resume evaluation.
//!
//! The tokenizer, grammar-driven parser, and AST builder are treated as
//! external collaborators: this crate's real input boundary is a
//! [`syntax::Program`], built directly (by a caller, or by hand in tests)
//! rather than parsed from source text here.
//!
//! Module map:
//! - [`literal`] / [`syntax`] -- the value and syntax models.
//! - [`store`] -- the append-only cell vector addresses alias into.
//! - [`ops`] -- the value-level arithmetic/comparison/boolean operators.
//! - [`arena`] -- the pooled allocator and its deep-copy primitives.
//! - [`computation`] / [`context`] -- the machine's reified continuation
//!   stack and per-frame/global state.
//! - [`evaluator`] -- the `step()` dispatcher itself.
//! - [`error`] / [`limits`] -- the ambient error and resource-budget model.
//! - [`session`] -- the storage-collaborator interface: run, snapshot,
//!   restore, rewind.

pub mod arena;
pub mod computation;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod limits;
pub mod literal;
pub mod ops;
pub mod session;
pub mod store;
pub mod syntax;

pub use context::EvalContext;
pub use error::EvalError;
pub use evaluator::Evaluator;
pub use limits::Limits;
pub use literal::Literal;
pub use session::{RunOutcome, Session};
pub use syntax::Program;
