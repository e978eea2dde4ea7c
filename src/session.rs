//! The storage collaborator's concrete realization: [`Session`].
//!
//! `spec.md` §6 describes a "storage collaborator" by interface only
//! (initialize, step, read back the resulting state) and leaves it external
//! to this crate. `Session` is that interface, built the way the teacher
//! builds its own session wrapper (`session_manager.rs::ReplSession`
//! usage): own an `EvalContext` + `Allocator` pair, run a bounded number of
//! steps per call, and expose snapshot/restore for persistence.
//!
//! It additionally keeps a bounded history of prior snapshots
//! (`spec.md` is silent on this; it falls out of "`EvalContext` is a fully
//! serializable value" plus the teacher's own undo-history design in
//! `session_manager.rs`) so a host can `rewind` after a mistaken step.

use std::collections::VecDeque;

use crate::arena::Allocator;
use crate::context::EvalContext;
use crate::error::EvalError;
use crate::limits::Limits;
use crate::syntax::Program;

/// Default depth of the undo-history ring, mirroring the teacher's
/// `session_manager.rs::DEFAULT_MAX_HISTORY`.
pub const DEFAULT_MAX_HISTORY: usize = 20;

/// Why a [`Session::run`] call returned control to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The computation stack emptied; the program ran to completion.
    Done,
    /// `max_steps_per_resume` steps ran without finishing; call `run` again
    /// to continue.
    StepBudgetExhausted,
    /// A `Limits` budget other than the step count was exceeded (currently:
    /// the arena never reports this on its own -- reserved for future
    /// budgets such as a store-size cap).
    ResourceExceeded(EvalError),
}

/// Owns one program's evaluation state end to end: the `EvalContext`, its
/// `Allocator`, the resource `Limits`, and a bounded history of prior
/// snapshots for rewinding.
pub struct Session {
    ctx: EvalContext,
    alloc: Allocator,
    limits: Limits,
    history: VecDeque<EvalContext>,
    max_history: usize,
    diagnostics: Vec<EvalError>,
}

impl Session {
    pub fn new(program: Program, limits: Limits) -> Self {
        Session {
            ctx: EvalContext::new(program),
            alloc: Allocator::new(),
            limits,
            history: VecDeque::new(),
            max_history: DEFAULT_MAX_HISTORY,
            diagnostics: Vec::new(),
        }
    }

    /// Steps the machine until it finishes, a resource limit trips, or
    /// `limits.max_steps_per_resume` steps have run in this call.
    ///
    /// Pushes the pre-run state onto the history ring first, so a caller
    /// that dislikes the outcome can [`Session::rewind`] back to it.
    pub fn run(&mut self) -> RunOutcome {
        self.push_history();
        let mut evaluator = crate::evaluator::Evaluator::new(
            &mut self.ctx,
            &mut self.alloc,
            self.limits.compaction_threshold_bytes,
        );
        for _ in 0..self.limits.max_steps_per_resume {
            if evaluator.is_done() {
                return RunOutcome::Done;
            }
            if let Some(err) = evaluator.step() {
                self.diagnostics.push(err);
            }
        }
        if evaluator.is_done() {
            RunOutcome::Done
        } else {
            RunOutcome::StepBudgetExhausted
        }
    }

    /// Diagnostics raised by `step()` dispatch fallbacks (type mismatches,
    /// unbound names, bad arity, non-lvalue assignment targets) accumulated
    /// across every `run()` call so far. `step()` never unwinds on these
    /// (`spec.md` §7); this is how a host observes them after the fact.
    pub fn consume_diagnostics(&mut self) -> Vec<EvalError> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn consume_output(&mut self) -> Vec<String> {
        self.ctx.consume_output()
    }

    pub fn is_done(&self) -> bool {
        self.ctx.is_done()
    }

    /// A clone of the current machine state, suitable for persistence via
    /// [`Session::to_bytes`] or for restoring later via [`Session::restore`].
    pub fn snapshot(&self) -> EvalContext {
        self.ctx.clone()
    }

    pub fn restore(&mut self, ctx: EvalContext) {
        self.ctx = ctx;
        self.alloc.reset();
    }

    fn push_history(&mut self) {
        if self.max_history == 0 {
            return;
        }
        if self.history.len() >= self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(self.ctx.clone());
    }

    /// Restores the state from `steps` calls to `run()` ago, where `steps =
    /// 1` undoes the most recent run. Returns the number of steps actually
    /// rewound, which is less than `steps` if history doesn't go back that
    /// far.
    pub fn rewind(&mut self, steps: usize) -> usize {
        let mut rewound = 0;
        for _ in 0..steps {
            match self.history.pop_back() {
                Some(prev) => {
                    self.ctx = prev;
                    rewound += 1;
                }
                None => break,
            }
        }
        if rewound > 0 {
            self.alloc.reset();
        }
        rewound
    }

    /// Serializes the current `EvalContext` as the "structured binary
    /// record" `spec.md` §6 describes, via `postcard`.
    pub fn to_bytes(&self) -> postcard::Result<Vec<u8>> {
        postcard::to_allocvec(&self.ctx)
    }

    pub fn from_bytes(limits: Limits, bytes: &[u8]) -> postcard::Result<Self> {
        let ctx: EvalContext = postcard::from_bytes(bytes)?;
        Ok(Session {
            ctx,
            alloc: Allocator::new(),
            limits,
            history: VecDeque::new(),
            max_history: DEFAULT_MAX_HISTORY,
            diagnostics: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Literal;
    use crate::syntax::{Expression, Statement};

    fn sample_program() -> Program {
        Program::new(vec![Statement::print(Expression::lit(Literal::Int(5)))])
    }

    #[test]
    fn run_drives_program_to_completion() {
        let mut session = Session::new(sample_program(), Limits::default());
        assert_eq!(session.run(), RunOutcome::Done);
        assert_eq!(session.consume_output(), vec!["int_val: 5".to_string()]);
    }

    #[test]
    fn snapshot_round_trips_through_postcard() {
        let mut session = Session::new(sample_program(), Limits::default());
        session.run();
        let bytes = session.to_bytes().expect("serialize");
        let mut restored = Session::from_bytes(Limits::default(), &bytes).expect("deserialize");
        assert!(restored.is_done());
        assert_eq!(restored.consume_output(), vec!["int_val: 5".to_string()]);
    }

    #[test]
    fn rewind_restores_prior_state() {
        let program = Program::new(vec![
            Statement::print(Expression::lit(Literal::Int(1))),
            Statement::print(Expression::lit(Literal::Int(2))),
        ]);
        let limits = Limits { max_steps_per_resume: 1, ..Limits::default() };
        let mut session = Session::new(program, limits);

        // Run one statement to completion, one step at a time, then snapshot
        // the state right after the first `print` has fired.
        while session.snapshot().output.is_empty() {
            session.run();
        }
        let after_first_print = session.snapshot();

        // Keep stepping until the second `print` has also fired, counting
        // how many more `run()` calls (and thus history entries) that took.
        let mut runs_since_first_print = 0;
        while !session.is_done() {
            session.run();
            runs_since_first_print += 1;
        }
        assert_eq!(session.snapshot().output, vec!["int_val: 1".to_string(), "int_val: 2".to_string()]);

        assert_eq!(session.rewind(runs_since_first_print), runs_since_first_print);
        assert_eq!(session.snapshot().output, after_first_print.output);
    }
}
