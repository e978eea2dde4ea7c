//! The computation stack's entries: [`Computation`] (pending work) and
//! [`EvalResult`] (a produced rvalue or lvalue reference).

use serde::{Deserialize, Serialize};

use crate::literal::Literal;
use crate::store::Address;
use crate::syntax::{BinOp, Expression, MonOp, Statement};

/// Either an rvalue (an owned literal) or an lvalue reference (a store
/// address). Assignments require an lvalue on the left; most operations
/// consume rvalues, dereferencing lvalues as needed (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EvalResult {
    Rvalue(Literal),
    LvalueRef(Address),
}

impl Default for EvalResult {
    fn default() -> Self {
        EvalResult::Rvalue(Literal::None)
    }
}

/// A unit of pending work on the computation stack -- the machine's
/// reified continuation chain (`spec.md` §3, "Computation").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Computation {
    /// An expression to evaluate.
    Exp(Expression),
    /// A statement to execute.
    Stmt(Statement),
    /// Combine the top two results into one.
    BinOpFinal(BinOp),
    /// Transform the top result.
    MonOpFinal(MonOp),
    /// Pop `size` results, build a tuple.
    TupleFinal(usize),
    /// Discard the top result (for expression-statements).
    IgnoreOneResult,
    /// Consume (lvalue, rvalue), write to store.
    AssignFinal,
    /// Pop `arity` args + callee, enter a new call frame.
    CallFinal(usize),
    /// Pop a call frame, re-surface the return value.
    ReturnFromFrame,
    /// Branch on the top result.
    IfElseFinal {
        then_comps: Vec<Computation>,
        else_comps: Vec<Computation>,
    },
    /// Append the top result to output.
    PrintFinal,
}

impl Default for Computation {
    fn default() -> Self {
        Computation::IgnoreOneResult
    }
}
