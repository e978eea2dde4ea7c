//! Pooled arena allocator.
//!
//! Grounded on `original_source/lang/interpreter/memory.{h,cc}`
//! (`Pool<T>`/`PoolPtr<T>`/`PoolingArenaAllocator`), re-expressed in the
//! ownership idiom `spec.md` §9 calls for: "a move-only smart reference
//! whose destruction returns the object to its pool" becomes, in Rust, a
//! `Box<T>` drawn from (and later given back to) a per-type free list --
//! the same shape the teacher crate uses for its own heap (`heap.rs`'s
//! `HeapId` + `free_list: Vec<HeapId>`), adapted here to tree-shaped nodes
//! instead of index-addressed ones, since `Expression`/`Computation` are
//! naturally recursive owned trees rather than a flat slab of values.
//!
//! `Allocator::reset` drops every recycled node; any handle still held by a
//! caller past that point is a caller bug (`spec.md` §4.1), not a safety
//! violation -- Rust's ownership rules mean a *live* `Box<T>` can never
//! actually dangle, so "reset invalidates outstanding handles" here means
//! only "the free lists, and their retained capacity, are gone"; it is the
//! evaluator's job (§4.5) to make sure nothing it still needs is sitting in
//! a pool when it calls `reset`.

use crate::computation::{Computation, EvalResult};
use crate::context::{EvalContext, LocalContext};
use crate::literal::{Closure, Literal};
use crate::store::Store;
use crate::syntax::{Expression, ExpressionKind, Statement, StatementKind};

/// A free list of recycled, not-yet-reused `Box<T>` allocations.
struct Pool<T> {
    free: Vec<Box<T>>,
}

impl<T> Pool<T> {
    fn new() -> Self {
        Pool { free: Vec::new() }
    }

    fn take(&mut self, value: T) -> Box<T> {
        match self.free.pop() {
            Some(mut slot) => {
                *slot = value;
                slot
            }
            None => Box::new(value),
        }
    }

    fn give(&mut self, slot: Box<T>) {
        self.free.push(slot);
    }

    fn clear(&mut self) {
        self.free.clear();
    }

    fn len(&self) -> usize {
        self.free.len()
    }
}

impl<T: Default> Pool<T> {
    fn take_default(&mut self) -> Box<T> {
        self.take(T::default())
    }
}

/// Live-allocation accounting plus free-list occupancy, for diagnostics and
/// for the evaluator's compaction threshold check (§4.5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    pub live_bytes: usize,
    pub pooled_literals: usize,
    pub pooled_expressions: usize,
    pub pooled_computations: usize,
    pub pooled_results: usize,
    pub pooled_contexts: usize,
}

/// Owns one [`Pool`] per poolable node kind (`spec.md` §4.1: Result,
/// LocalContext, Literal, Computation, Expression) and the deep-copy
/// primitives that make function application's per-call body copy cheap.
pub struct Allocator {
    literals: Pool<Literal>,
    expressions: Pool<Expression>,
    computations: Pool<Computation>,
    results: Pool<EvalResult>,
    contexts: Pool<LocalContext>,
    live_bytes: usize,
}

impl Allocator {
    pub fn new() -> Self {
        Allocator {
            literals: Pool::new(),
            expressions: Pool::new(),
            computations: Pool::new(),
            results: Pool::new(),
            contexts: Pool::new(),
            live_bytes: 0,
        }
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            live_bytes: self.live_bytes,
            pooled_literals: self.literals.len(),
            pooled_expressions: self.expressions.len(),
            pooled_computations: self.computations.len(),
            pooled_results: self.results.len(),
            pooled_contexts: self.contexts.len(),
        }
    }

    /// Drops every recycled node and resets the byte counter. Any handle
    /// still reachable by the caller is a correctness bug in the caller
    /// (`spec.md` §4.1).
    pub fn reset(&mut self) {
        self.literals.clear();
        self.expressions.clear();
        self.computations.clear();
        self.results.clear();
        self.contexts.clear();
        self.live_bytes = 0;
    }

    pub fn alloc_literal(&mut self, value: Literal) -> Box<Literal> {
        self.live_bytes += std::mem::size_of::<Literal>();
        self.literals.take(value)
    }

    pub fn release_literal(&mut self, slot: Box<Literal>) {
        self.live_bytes = self.live_bytes.saturating_sub(std::mem::size_of::<Literal>());
        self.literals.give(slot);
    }

    pub fn alloc_expression(&mut self, value: Expression) -> Box<Expression> {
        self.live_bytes += std::mem::size_of::<Expression>();
        self.expressions.take(value)
    }

    pub fn release_expression(&mut self, slot: Box<Expression>) {
        self.live_bytes = self.live_bytes.saturating_sub(std::mem::size_of::<Expression>());
        self.expressions.give(slot);
    }

    pub fn alloc_computation(&mut self, value: Computation) -> Box<Computation> {
        self.live_bytes += std::mem::size_of::<Computation>();
        self.computations.take(value)
    }

    pub fn release_computation(&mut self, slot: Box<Computation>) {
        self.live_bytes = self.live_bytes.saturating_sub(std::mem::size_of::<Computation>());
        self.computations.give(slot);
    }

    pub fn alloc_result(&mut self, value: EvalResult) -> Box<EvalResult> {
        self.live_bytes += std::mem::size_of::<EvalResult>();
        self.results.take(value)
    }

    pub fn release_result(&mut self, slot: Box<EvalResult>) {
        self.live_bytes = self.live_bytes.saturating_sub(std::mem::size_of::<EvalResult>());
        self.results.give(slot);
    }

    pub fn alloc_context(&mut self) -> Box<LocalContext> {
        self.live_bytes += std::mem::size_of::<LocalContext>();
        let mut ctx = self.contexts.take_default();
        ctx.clear();
        ctx
    }

    pub fn release_context(&mut self, mut slot: Box<LocalContext>) {
        self.live_bytes = self.live_bytes.saturating_sub(std::mem::size_of::<LocalContext>());
        slot.clear();
        self.contexts.give(slot);
    }

    // -- Deep copy primitives (§4.1) --------------------------------------
    //
    // Function application deep-copies the callee's body on every call so
    // concurrent activations of the same closure never alias AST nodes
    // (`spec.md` §4.1, §9 "Deep-copy on function application"). These
    // mirror `PoolingArenaAllocator::Copy` in
    // `original_source/lang/interpreter/memory.cc`.

    pub fn copy_literal(&mut self, src: &Literal) -> Literal {
        match src {
            Literal::Closure(c) => Literal::Closure(Box::new(self.copy_closure(c))),
            Literal::Tuple(t) => Literal::Tuple(crate::literal::Tuple {
                elems: t.elems.iter().map(|e| self.copy_literal(e)).collect(),
            }),
            other => other.clone(),
        }
    }

    pub fn copy_expression(&mut self, src: &Expression) -> Box<Expression> {
        let kind = match &src.kind {
            ExpressionKind::Var(v) => ExpressionKind::Var(v.clone()),
            ExpressionKind::Lit(l) => ExpressionKind::Lit(self.copy_literal(l)),
            ExpressionKind::Lambda(l) => ExpressionKind::Lambda(crate::syntax::LambdaExpr {
                params: l.params.clone(),
                body: l.body.iter().map(|s| self.copy_statement(s)).collect(),
            }),
            ExpressionKind::MonArith(m) => ExpressionKind::MonArith(crate::syntax::MonArithExpr {
                op: m.op,
                exp: Box::new(*self.copy_expression(&m.exp)),
            }),
            ExpressionKind::BinArith(b) => ExpressionKind::BinArith(crate::syntax::BinArithExpr {
                op: b.op,
                lhs: Box::new(*self.copy_expression(&b.lhs)),
                rhs: Box::new(*self.copy_expression(&b.rhs)),
            }),
            ExpressionKind::Ternary(t) => ExpressionKind::Ternary(crate::syntax::TernaryExpr {
                cond: Box::new(*self.copy_expression(&t.cond)),
                if_exp: Box::new(*self.copy_expression(&t.if_exp)),
                else_exp: Box::new(*self.copy_expression(&t.else_exp)),
            }),
            ExpressionKind::Tuple(t) => ExpressionKind::Tuple(crate::syntax::TupleExpr {
                exps: t.exps.iter().map(|e| *self.copy_expression(e)).collect(),
            }),
            ExpressionKind::FuncApp(f) => ExpressionKind::FuncApp(crate::syntax::FuncAppExpr {
                func: Box::new(*self.copy_expression(&f.func)),
                args: f.args.iter().map(|a| *self.copy_expression(a)).collect(),
            }),
        };
        self.alloc_expression(Expression { kind, origin: src.origin })
    }

    pub fn copy_statement(&mut self, src: &Statement) -> Statement {
        let kind = match &src.kind {
            StatementKind::Exp(e) => StatementKind::Exp(*self.copy_expression(e)),
            StatementKind::Assign(a) => StatementKind::Assign(crate::syntax::AssignStmt {
                lhs: *self.copy_expression(&a.lhs),
                rhs: *self.copy_expression(&a.rhs),
            }),
            StatementKind::Return(e) => StatementKind::Return(*self.copy_expression(e)),
            StatementKind::Print(e) => StatementKind::Print(*self.copy_expression(e)),
            StatementKind::IfElse(ie) => StatementKind::IfElse(crate::syntax::IfElseStmt {
                cond: *self.copy_expression(&ie.cond),
                if_stmts: ie.if_stmts.iter().map(|s| self.copy_statement(s)).collect(),
                else_stmts: ie.else_stmts.iter().map(|s| self.copy_statement(s)).collect(),
            }),
        };
        Statement { kind, origin: src.origin }
    }

    /// Copies a closure's parameter list, body, and captured environment.
    /// The environment is copied by value, but every address it contains
    /// keeps pointing at the same store cell as the original (`spec.md`
    /// §3, §4.1).
    pub fn copy_closure(&mut self, src: &Closure) -> Closure {
        Closure {
            params: src.params.clone(),
            body: src.body.iter().map(|s| self.copy_statement(s)).collect(),
            env: src.env.clone(),
        }
    }

    pub fn copy_eval_result(&mut self, src: &EvalResult) -> EvalResult {
        match src {
            EvalResult::Rvalue(l) => EvalResult::Rvalue(self.copy_literal(l)),
            EvalResult::LvalueRef(addr) => EvalResult::LvalueRef(*addr),
        }
    }

    pub fn copy_computation(&mut self, src: &Computation) -> Computation {
        match src {
            Computation::Exp(e) => Computation::Exp(*self.copy_expression(e)),
            Computation::Stmt(s) => Computation::Stmt(self.copy_statement(s)),
            Computation::BinOpFinal(op) => Computation::BinOpFinal(*op),
            Computation::MonOpFinal(op) => Computation::MonOpFinal(*op),
            Computation::TupleFinal(n) => Computation::TupleFinal(*n),
            Computation::IgnoreOneResult => Computation::IgnoreOneResult,
            Computation::AssignFinal => Computation::AssignFinal,
            Computation::CallFinal(k) => Computation::CallFinal(*k),
            Computation::ReturnFromFrame => Computation::ReturnFromFrame,
            Computation::IfElseFinal { then_comps, else_comps } => Computation::IfElseFinal {
                then_comps: then_comps.iter().map(|c| self.copy_computation(c)).collect(),
                else_comps: else_comps.iter().map(|c| self.copy_computation(c)).collect(),
            },
            Computation::PrintFinal => Computation::PrintFinal,
        }
    }

    /// Structural copy of a [`LocalContext`], opportunistically drawing
    /// fresh node boxes from the pools as it rebuilds the stacks.
    pub fn copy_local_context(&mut self, src: &LocalContext) -> Box<LocalContext> {
        let mut ctx = self.alloc_context();
        ctx.env = src.env.clone();
        for r in &src.results {
            let copied = self.copy_eval_result(r);
            let boxed = self.alloc_result(copied);
            ctx.results.push(boxed);
        }
        for c in &src.comp {
            let copied = self.copy_computation(c);
            let boxed = self.alloc_computation(copied);
            ctx.comp.push(boxed);
        }
        ctx
    }

    /// Produces a structural copy of an entire [`EvalContext`], sharing no
    /// mutable state with the source. Used by the evaluator's compaction
    /// pass (`spec.md` §4.5): copy, then [`Allocator::reset`], then adopt
    /// the copy as the live context.
    pub fn copy_eval_context(&mut self, src: &EvalContext) -> EvalContext {
        let cells: Vec<Literal> = src.store.iter().map(|l| self.copy_literal(l)).collect();
        let cur_ctx = self.copy_local_context(&src.cur_ctx);
        let saved_ctx = src.saved_ctx.iter().map(|c| self.copy_local_context(c)).collect();
        EvalContext {
            program: src.program.clone(),
            store: Store::from_cells(cells),
            cur_ctx,
            saved_ctx,
            output: src.output.clone(),
        }
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recycles_released_literals() {
        let mut alloc = Allocator::new();
        let a = alloc.alloc_literal(Literal::Int(1));
        alloc.release_literal(a);
        assert_eq!(alloc.stats().pooled_literals, 1);
        let b = alloc.alloc_literal(Literal::Int(2));
        assert_eq!(alloc.stats().pooled_literals, 0);
        assert_eq!(*b, Literal::Int(2));
    }

    #[test]
    fn reset_drops_pooled_nodes() {
        let mut alloc = Allocator::new();
        let a = alloc.alloc_literal(Literal::Int(1));
        alloc.release_literal(a);
        alloc.reset();
        assert_eq!(alloc.stats().pooled_literals, 0);
        assert_eq!(alloc.stats().live_bytes, 0);
    }

    #[test]
    fn copy_closure_shares_store_addresses() {
        use crate::store::Address;
        let mut alloc = Allocator::new();
        let mut env = indexmap::IndexMap::new();
        env.insert("n".to_string(), Address(3));
        let closure = Closure { params: vec![], body: vec![], env };
        let copy = alloc.copy_closure(&closure);
        assert_eq!(copy.env.get("n"), Some(&Address(3)));
    }
}
