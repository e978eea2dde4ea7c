//! Per-call-frame and top-level machine state: [`LocalContext`] and
//! [`EvalContext`] (`spec.md` §3).

use serde::{Deserialize, Serialize};

use crate::computation::{Computation, EvalResult};
use crate::store::Store;
use crate::syntax::Program;

/// The per-call-frame state: environment (name -> address), result stack,
/// computation stack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalContext {
    pub env: indexmap::IndexMap<String, crate::store::Address>,
    pub results: Vec<Box<EvalResult>>,
    pub comp: Vec<Box<Computation>>,
}

impl LocalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets every field to empty while retaining each `Vec`/`IndexMap`'s
    /// backing capacity, so a pooled context can be handed out again
    /// without reallocating.
    pub fn clear(&mut self) {
        self.env.clear();
        self.results.clear();
        self.comp.clear();
    }

    pub fn has_computation(&self) -> bool {
        !self.comp.is_empty()
    }
}

/// The global machine state: program AST, store, current local context,
/// stack of saved local contexts (call stack), and an output buffer.
///
/// A fully serializable value: this is the "structured binary record"
/// `spec.md` §6 describes for persistence, and the unit `Session`
/// snapshots and restores (`spec.md` §5, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalContext {
    pub program: Program,
    pub store: Store,
    pub cur_ctx: Box<LocalContext>,
    pub saved_ctx: Vec<Box<LocalContext>>,
    pub output: Vec<String>,
}

impl EvalContext {
    /// Builds the initial state for `program`: empty store, one empty local
    /// context whose computation stack holds the program's statements
    /// pushed in reverse (so the first statement executes first), empty
    /// saved-context stack, empty output (`spec.md` §4.3.4).
    pub fn new(program: Program) -> Self {
        let mut cur_ctx = LocalContext::new();
        for stmt in program.statements.iter().rev() {
            cur_ctx.comp.push(Box::new(Computation::Stmt(stmt.clone())));
        }
        EvalContext {
            program,
            store: Store::new(),
            cur_ctx: Box::new(cur_ctx),
            saved_ctx: Vec::new(),
            output: Vec::new(),
        }
    }

    /// The machine is "done" when both the current computation stack and
    /// the saved-context stack are empty (`spec.md` §4.3.5).
    pub fn is_done(&self) -> bool {
        !self.cur_ctx.has_computation() && self.saved_ctx.is_empty()
    }

    pub fn consume_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }
}
