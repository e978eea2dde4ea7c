//! The small-step evaluator: one `step()` call pops a single
//! [`Computation`] off the current frame and dispatches on it, pushing
//! whatever follow-up computations and results that dispatch implies.
//!
//! Grounded on `original_source/lang/interpreter/language_evaluation.cc`'s
//! `Evaluator::Step`/`Evaluate(...)` overload set: each `eval_*` method here
//! corresponds to one `Evaluate` overload there, and the push/pop order in
//! each was carried over from that file so operand evaluation order and
//! function-call argument order match the original exactly (`spec.md`
//! §4.3).
//!
//! `step()` never unwinds (`spec.md` §7): every dispatch arm leaves the
//! result/computation stacks in a well-defined state and merely *reports*
//! an [`EvalError`] via its `Option` return when it takes a fallback path
//! (unbound name, type mismatch, wrong arity, non-lvalue assignment
//! target). The caller -- ordinarily [`crate::session::Session::run`] --
//! decides what, if anything, to do with that report.

use crate::arena::Allocator;
use crate::computation::{Computation, EvalResult};
use crate::context::EvalContext;
use crate::error::EvalError;
use crate::literal::{Literal, Tuple};
use crate::ops;
use crate::store::Address;
use crate::syntax::{BinOp, Expression, ExpressionKind, MonOp, Statement, StatementKind};

/// Drives one [`EvalContext`] forward through a borrowed [`Allocator`].
///
/// Both are borrowed rather than owned so [`crate::session::Session`] can
/// hold the long-lived `EvalContext`/`Allocator` pair and hand out a fresh
/// `Evaluator` for each `run()` call.
pub struct Evaluator<'a> {
    ctx: &'a mut EvalContext,
    alloc: &'a mut Allocator,
    compaction_threshold_bytes: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a mut EvalContext, alloc: &'a mut Allocator, compaction_threshold_bytes: usize) -> Self {
        Evaluator { ctx, alloc, compaction_threshold_bytes }
    }

    pub fn is_done(&self) -> bool {
        self.ctx.is_done()
    }

    /// Whether the current frame still has pending work (`spec.md` §6's
    /// external-interface `has_computation()`). Narrower than
    /// [`Evaluator::is_done`]: a frame can be out of computations while a
    /// caller frame still awaits it on `saved_ctx`.
    pub fn has_computation(&self) -> bool {
        self.ctx.cur_ctx.has_computation()
    }

    /// Executes exactly one computation. Returns `None` once the machine
    /// has no more work (mirrors [`EvalContext::is_done`]) or when the step
    /// taken raised no diagnostic.
    pub fn step(&mut self) -> Option<EvalError> {
        let comp = self.pop_computation()?;
        let err = match comp {
            Computation::Exp(e) => self.eval_expression(e),
            Computation::Stmt(s) => self.eval_statement(s),
            Computation::BinOpFinal(op) => self.eval_bin_op_final(op),
            Computation::MonOpFinal(op) => self.eval_mon_op_final(op),
            Computation::TupleFinal(n) => self.eval_tuple_final(n),
            Computation::IgnoreOneResult => {
                self.pop_result();
                None
            }
            Computation::AssignFinal => self.eval_assign_final(),
            Computation::CallFinal(arity) => self.eval_call_final(arity),
            Computation::ReturnFromFrame => {
                self.eval_return_from_frame();
                None
            }
            Computation::IfElseFinal { then_comps, else_comps } => {
                self.eval_if_else_final(then_comps, else_comps)
            }
            Computation::PrintFinal => {
                let value = self.pop_rvalue();
                self.ctx.output.push(format!("{value}"));
                None
            }
        };
        self.compact_if_needed();
        err
    }

    // -- stack plumbing ----------------------------------------------------

    /// Pushes a computation, folding consecutive `ReturnFromFrame` markers
    /// into one (`spec.md` §4.5, tail-call folding): a chain of returns
    /// that each do nothing but re-surface the previous return's value
    /// collapses to a single frame pop.
    fn schedule(&mut self, comp: Computation) {
        if matches!(comp, Computation::ReturnFromFrame) {
            if let Some(top) = self.ctx.cur_ctx.comp.last() {
                if matches!(**top, Computation::ReturnFromFrame) {
                    return;
                }
            }
        }
        let boxed = self.alloc.alloc_computation(comp);
        self.ctx.cur_ctx.comp.push(boxed);
    }

    fn pop_computation(&mut self) -> Option<Computation> {
        let boxed = self.ctx.cur_ctx.comp.pop()?;
        let mut boxed = boxed;
        let comp = std::mem::take(&mut *boxed);
        self.alloc.release_computation(boxed);
        Some(comp)
    }

    fn push_result(&mut self, r: EvalResult) {
        let boxed = self.alloc.alloc_result(r);
        self.ctx.cur_ctx.results.push(boxed);
    }

    fn pop_result(&mut self) -> EvalResult {
        let mut boxed = self
            .ctx
            .cur_ctx
            .results
            .pop()
            .expect("result stack underflow: a Computation consumed more results than were produced");
        let r = std::mem::take(&mut *boxed);
        self.alloc.release_result(boxed);
        r
    }

    /// Pops a result, dereferencing an lvalue through the store if needed.
    fn pop_rvalue(&mut self) -> Literal {
        match self.pop_result() {
            EvalResult::Rvalue(l) => l,
            EvalResult::LvalueRef(addr) => self.ctx.store.get(addr).clone(),
        }
    }

    /// Returns the address bound to `name` in the current environment,
    /// allocating a fresh `none`-valued store cell and binding it on first
    /// reference (`spec.md` §4.2, §4.4: "implicit declaration").
    fn lookup(&mut self, name: &str) -> Address {
        if let Some(addr) = self.ctx.cur_ctx.env.get(name) {
            return *addr;
        }
        let addr = self.ctx.store.push(Literal::None);
        self.ctx.cur_ctx.env.insert(name.to_string(), addr);
        addr
    }

    /// Binds `name` to `value` in the current environment: overwrites the
    /// existing cell if `name` is already bound there, otherwise allocates
    /// a fresh one (`spec.md` §4.2, "assign"). Used to bind a closure's
    /// parameters against its captured env (`original_source`'s
    /// `Evaluator::Assign`, `language_evaluation.cc:27-36`): a parameter
    /// name the closure already captured from an enclosing scope overwrites
    /// that shared cell rather than shadowing it locally.
    fn assign(&mut self, name: &str, value: Literal) {
        if let Some(&addr) = self.ctx.cur_ctx.env.get(name) {
            self.ctx.store.swap(addr, value);
        } else {
            let addr = self.ctx.store.push(value);
            self.ctx.cur_ctx.env.insert(name.to_string(), addr);
        }
    }

    // -- expressions --------------------------------------------------------

    fn eval_expression(&mut self, e: Expression) -> Option<EvalError> {
        match e.kind {
            ExpressionKind::Var(v) => {
                let addr = self.lookup(&v.name);
                self.push_result(EvalResult::LvalueRef(addr));
                None
            }
            ExpressionKind::Lit(l) => {
                self.push_result(EvalResult::Rvalue(l));
                None
            }
            ExpressionKind::Lambda(l) => {
                let env = self.ctx.cur_ctx.env.clone();
                let closure = crate::literal::Closure { params: l.params, body: l.body, env };
                self.push_result(EvalResult::Rvalue(Literal::Closure(Box::new(closure))));
                None
            }
            ExpressionKind::MonArith(m) => {
                self.schedule(Computation::MonOpFinal(m.op));
                self.schedule(Computation::Exp(*m.exp));
                None
            }
            ExpressionKind::BinArith(b) => {
                // lhs must evaluate before rhs; `BinOpFinal` pops rhs then
                // lhs, so push it first, then rhs, then lhs on top.
                self.schedule(Computation::BinOpFinal(b.op));
                self.schedule(Computation::Exp(*b.rhs));
                self.schedule(Computation::Exp(*b.lhs));
                None
            }
            ExpressionKind::Ternary(t) => {
                self.schedule(Computation::IfElseFinal {
                    then_comps: vec![Computation::Exp(*t.if_exp)],
                    else_comps: vec![Computation::Exp(*t.else_exp)],
                });
                self.schedule(Computation::Exp(*t.cond));
                None
            }
            ExpressionKind::Tuple(t) => {
                let n = t.exps.len();
                self.schedule(Computation::TupleFinal(n));
                for elem in t.exps.into_iter().rev() {
                    self.schedule(Computation::Exp(elem));
                }
                None
            }
            ExpressionKind::FuncApp(f) => {
                // Args evaluate left-to-right, then the callee, so that
                // `CallFinal` finds the callee on top of the result stack
                // above all of its arguments.
                let arity = f.args.len();
                self.schedule(Computation::CallFinal(arity));
                self.schedule(Computation::Exp(*f.func));
                for arg in f.args.into_iter().rev() {
                    self.schedule(Computation::Exp(arg));
                }
                None
            }
        }
    }

    // -- statements -----------------------------------------------------------

    fn eval_statement(&mut self, s: Statement) -> Option<EvalError> {
        match s.kind {
            StatementKind::Exp(e) => {
                self.schedule(Computation::IgnoreOneResult);
                self.schedule(Computation::Exp(e));
                None
            }
            StatementKind::Assign(a) => {
                self.schedule(Computation::AssignFinal);
                self.schedule(Computation::Exp(a.rhs));
                self.schedule(Computation::Exp(a.lhs));
                None
            }
            StatementKind::Return(e) => {
                self.schedule(Computation::ReturnFromFrame);
                self.schedule(Computation::Exp(e));
                None
            }
            StatementKind::Print(e) => {
                self.schedule(Computation::PrintFinal);
                self.schedule(Computation::Exp(e));
                None
            }
            StatementKind::IfElse(ie) => {
                let then_comps = ie.if_stmts.into_iter().map(Computation::Stmt).collect();
                let else_comps = ie.else_stmts.into_iter().map(Computation::Stmt).collect();
                self.schedule(Computation::IfElseFinal { then_comps, else_comps });
                self.schedule(Computation::Exp(ie.cond));
                None
            }
        }
    }

    // -- "final" reducers ---------------------------------------------------

    fn eval_bin_op_final(&mut self, op: BinOp) -> Option<EvalError> {
        let rhs = self.pop_rvalue();
        let lhs = self.pop_rvalue();
        let lhs_kind = lhs.kind();
        let rhs_kind = rhs.kind();
        let divisor_is_zero = matches!(rhs, Literal::Int(0)) || matches!(rhs, Literal::Float(b) if b == 0.0);
        let value = match op {
            BinOp::Add => ops::add(lhs, rhs),
            BinOp::Sub => ops::sub(lhs, rhs),
            BinOp::Mul => ops::mul(lhs, rhs),
            BinOp::Div => ops::div(lhs, rhs),
            BinOp::Gt => ops::compare_gt(lhs, rhs),
            BinOp::Ge => ops::compare_ge(lhs, rhs),
            BinOp::Lt => ops::compare_lt(lhs, rhs),
            BinOp::Le => ops::compare_le(lhs, rhs),
            BinOp::Eq => ops::compare_eq(lhs, rhs),
            BinOp::Ne => ops::compare_ne(lhs, rhs),
            BinOp::And => ops::bool_and(lhs, rhs),
            BinOp::Or => ops::bool_or(lhs, rhs),
        };
        // Every defined operator yields a non-`None` value; `None` here
        // always means either a kind mismatch or (for `Div`) a zero
        // divisor on otherwise-matching numeric kinds.
        let err = if matches!(value, Literal::None) {
            let matching_numeric = lhs_kind == rhs_kind && matches!(lhs_kind, "int" | "float");
            if op == BinOp::Div && matching_numeric && divisor_is_zero {
                Some(EvalError::ArithmeticError("division by zero".to_string()))
            } else {
                Some(EvalError::TypeError(format!("`{op:?}` not defined for {lhs_kind}/{rhs_kind}")))
            }
        } else {
            None
        };
        self.push_result(EvalResult::Rvalue(value));
        err
    }

    fn eval_mon_op_final(&mut self, op: MonOp) -> Option<EvalError> {
        let x = self.pop_rvalue();
        let kind = x.kind();
        let value = match op {
            MonOp::Not => ops::bool_not(x),
            MonOp::Neg => ops::neg(x),
        };
        let err = if matches!(value, Literal::None) {
            Some(EvalError::TypeError(format!("`{op:?}` not defined for {kind}")))
        } else {
            None
        };
        self.push_result(EvalResult::Rvalue(value));
        err
    }

    fn eval_tuple_final(&mut self, n: usize) -> Option<EvalError> {
        let mut elems = Vec::with_capacity(n);
        for _ in 0..n {
            elems.push(self.pop_rvalue());
        }
        elems.reverse();
        self.push_result(EvalResult::Rvalue(Literal::Tuple(Tuple { elems })));
        None
    }

    fn eval_assign_final(&mut self) -> Option<EvalError> {
        let value = self.pop_rvalue();
        match self.pop_result() {
            EvalResult::LvalueRef(addr) => {
                self.ctx.store.swap(addr, value);
                None
            }
            EvalResult::Rvalue(_) => Some(EvalError::AssignmentTargetError),
        }
    }

    fn eval_call_final(&mut self, arity: usize) -> Option<EvalError> {
        let callee = self.pop_rvalue();
        let mut args = Vec::with_capacity(arity);
        for _ in 0..arity {
            args.push(self.pop_rvalue());
        }
        args.reverse();

        let closure = match &callee {
            Literal::Closure(c) => c.as_ref(),
            _ => {
                let kind = callee.kind();
                self.push_result(EvalResult::Rvalue(Literal::None));
                return Some(EvalError::TypeError(format!("cannot call value of kind `{kind}`")));
            }
        };
        if closure.params.len() != args.len() {
            let err = EvalError::ArityError { expected: closure.params.len(), got: args.len() };
            self.push_result(EvalResult::Rvalue(Literal::None));
            return Some(err);
        }

        // Deep-copy the body so concurrent activations of the same closure
        // never alias AST nodes (`spec.md` §4.1, §9).
        let body: Vec<Statement> = closure.body.iter().map(|s| self.alloc.copy_statement(s)).collect();

        let params = closure.params.clone();
        let mut new_ctx = self.alloc.alloc_context();
        new_ctx.env = closure.env.clone();

        // A body that falls off the end without an explicit `return`
        // implicitly returns `none`.
        let fallback = self.alloc.alloc_computation(Computation::Stmt(Statement::ret(Expression::lit(Literal::None))));
        new_ctx.comp.push(fallback);
        for stmt in body.into_iter().rev() {
            let boxed = self.alloc.alloc_computation(Computation::Stmt(stmt));
            new_ctx.comp.push(boxed);
        }

        let old_ctx = std::mem::replace(&mut self.ctx.cur_ctx, new_ctx);
        self.ctx.saved_ctx.push(old_ctx);

        for (param, arg) in params.into_iter().zip(args) {
            self.assign(&param, arg);
        }
        None
    }

    fn eval_return_from_frame(&mut self) {
        let value = self.pop_rvalue();
        if let Some(prev) = self.ctx.saved_ctx.pop() {
            let finished = std::mem::replace(&mut self.ctx.cur_ctx, prev);
            self.alloc.release_context(finished);
        }
        self.push_result(EvalResult::Rvalue(value));
    }

    fn eval_if_else_final(&mut self, then_comps: Vec<Computation>, else_comps: Vec<Computation>) -> Option<EvalError> {
        let cond = self.pop_rvalue();
        let (branch, err) = match cond.as_bool() {
            Some(true) => (then_comps, None),
            Some(false) => (else_comps, None),
            None => {
                let kind = cond.kind();
                (else_comps, Some(EvalError::TypeError(format!("if/ternary condition must be bool, got `{kind}`"))))
            }
        };
        for c in branch.into_iter().rev() {
            self.schedule(c);
        }
        err
    }

    /// Deep-copies the live `EvalContext`, resets the allocator, then
    /// adopts the copy (`spec.md` §4.5): observationally the identity
    /// transformation, but every node is freshly drawn from empty pools.
    fn compact_if_needed(&mut self) {
        if self.alloc.stats().live_bytes < self.compaction_threshold_bytes {
            return;
        }
        let compacted = self.alloc.copy_eval_context(self.ctx);
        self.alloc.reset();
        *self.ctx = compacted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::Limits;
    use crate::syntax::Program;

    fn run_to_completion(program: Program) -> (Vec<String>, Vec<EvalError>) {
        let mut ctx = EvalContext::new(program);
        let mut alloc = Allocator::new();
        let limits = Limits::default();
        let mut errors = Vec::new();
        let mut eval = Evaluator::new(&mut ctx, &mut alloc, limits.compaction_threshold_bytes);
        while !eval.is_done() {
            if let Some(e) = eval.step() {
                errors.push(e);
            }
        }
        (ctx.consume_output(), errors)
    }

    #[test]
    fn prints_arithmetic_result() {
        let program = Program::new(vec![Statement::print(Expression::bin(
            BinOp::Add,
            Expression::lit(Literal::Int(3)),
            Expression::lit(Literal::Int(4)),
        ))]);
        let (out, errs) = run_to_completion(program);
        assert_eq!(out, vec!["int_val: 7".to_string()]);
        assert!(errs.is_empty());
    }

    #[test]
    fn assignment_is_visible_to_later_reads() {
        let program = Program::new(vec![
            Statement::assign(Expression::var("x"), Expression::lit(Literal::Int(1))),
            Statement::assign(
                Expression::var("x"),
                Expression::bin(BinOp::Add, Expression::var("x"), Expression::lit(Literal::Int(1))),
            ),
            Statement::print(Expression::var("x")),
        ]);
        let (out, errs) = run_to_completion(program);
        assert_eq!(out, vec!["int_val: 2".to_string()]);
        assert!(errs.is_empty());
    }

    #[test]
    fn closure_call_binds_params_and_returns() {
        // let f = lambda n: return n + 1; print(f(41))
        let program = Program::new(vec![
            Statement::assign(
                Expression::var("f"),
                Expression::lambda(
                    vec!["n".to_string()],
                    vec![Statement::ret(Expression::bin(
                        BinOp::Add,
                        Expression::var("n"),
                        Expression::lit(Literal::Int(1)),
                    ))],
                ),
            ),
            Statement::print(Expression::call(Expression::var("f"), vec![Expression::lit(Literal::Int(41))])),
        ]);
        let (out, errs) = run_to_completion(program);
        assert_eq!(out, vec!["int_val: 42".to_string()]);
        assert!(errs.is_empty());
    }

    #[test]
    fn type_mismatch_settles_to_none_and_reports() {
        let program = Program::new(vec![Statement::print(Expression::bin(
            BinOp::Add,
            Expression::lit(Literal::Int(1)),
            Expression::lit(Literal::Bool(true)),
        ))]);
        let (out, errs) = run_to_completion(program);
        assert_eq!(out, vec!["none_val: true".to_string()]);
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0], EvalError::TypeError(_)));
    }

    #[test]
    fn parameter_binding_overwrites_a_captured_cell_of_the_same_name() {
        // n = 1; f = lambda n: return n + 1; print(f(99)); print(n);
        //
        // `f`'s closure captures `n` from the enclosing scope. Binding the
        // parameter `n` against that captured env must overwrite the shared
        // cell rather than shadow it with a fresh one, so the outer `n` is
        // `99` after the call returns (`original_source`'s `Evaluator::Assign`).
        let program = Program::new(vec![
            Statement::assign(Expression::var("n"), Expression::lit(Literal::Int(1))),
            Statement::assign(
                Expression::var("f"),
                Expression::lambda(
                    vec!["n".to_string()],
                    vec![Statement::ret(Expression::bin(
                        BinOp::Add,
                        Expression::var("n"),
                        Expression::lit(Literal::Int(1)),
                    ))],
                ),
            ),
            Statement::print(Expression::call(Expression::var("f"), vec![Expression::lit(Literal::Int(99))])),
            Statement::print(Expression::var("n")),
        ]);
        let (out, errs) = run_to_completion(program);
        assert_eq!(out, vec!["int_val: 100".to_string(), "int_val: 99".to_string()]);
        assert!(errs.is_empty());
    }

    #[test]
    fn calling_closure_with_wrong_arity_reports_arity_error() {
        // let f = lambda n: return n; print(f(1, 2))
        let program = Program::new(vec![
            Statement::assign(
                Expression::var("f"),
                Expression::lambda(vec!["n".to_string()], vec![Statement::ret(Expression::var("n"))]),
            ),
            Statement::print(Expression::call(
                Expression::var("f"),
                vec![Expression::lit(Literal::Int(1)), Expression::lit(Literal::Int(2))],
            )),
        ]);
        let (out, errs) = run_to_completion(program);
        assert_eq!(out, vec!["none_val: true".to_string()]);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0], EvalError::ArityError { expected: 1, got: 2 });
    }

    #[test]
    fn assigning_to_a_non_var_target_reports_assignment_target_error() {
        // 1 = 2;
        let program = Program::new(vec![Statement::assign(
            Expression::lit(Literal::Int(1)),
            Expression::lit(Literal::Int(2)),
        )]);
        let (_out, errs) = run_to_completion(program);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0], EvalError::AssignmentTargetError);
    }

    #[test]
    fn branches_on_condition() {
        let program = Program::new(vec![Statement::if_else(
            Expression::lit(Literal::Bool(false)),
            vec![Statement::print(Expression::lit(Literal::Str("then".to_string())))],
            vec![Statement::print(Expression::lit(Literal::Str("else".to_string())))],
        )]);
        let (out, _errs) = run_to_completion(program);
        assert_eq!(out, vec!["str_val: \"else\"".to_string()]);
    }
}
