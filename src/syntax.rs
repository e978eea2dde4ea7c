//! The syntax model: expressions, statements, and the top-level program.
//!
//! This crate treats the tokenizer and grammar-driven parser as external
//! collaborators (see `spec.md` §1): a [`Program`] arrives fully built, and
//! this module only owns the shape of that tree plus the one load-bearing
//! post-processing pass the evaluator's host expects -- source-id
//! annotation (§6, "AST consumer contract").

use serde::{Deserialize, Serialize};

use crate::literal::Literal;

/// Binary arithmetic/comparison/boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
    And,
    Or,
}

/// Monadic (unary) operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonOp {
    Not,
    Neg,
}

/// A variable reference, as it appears inside an [`Expression`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
}

/// `lambda params: body` -- a parameter list plus a statement-body
/// sequence. Evaluating this expression produces a [`crate::literal::Closure`]
/// that snapshots the evaluating frame's environment by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaExpr {
    pub params: Vec<String>,
    pub body: Vec<Statement>,
}

/// `callee(args...)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncAppExpr {
    pub func: Box<Expression>,
    pub args: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonArithExpr {
    pub op: MonOp,
    pub exp: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinArithExpr {
    pub op: BinOp,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TernaryExpr {
    pub cond: Box<Expression>,
    pub if_exp: Box<Expression>,
    pub else_exp: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleExpr {
    pub exps: Vec<Expression>,
}

/// Tagged union over the expression forms steinlang supports.
///
/// Each carries an `origin` source id (§6), assigned post-parse by
/// [`annotate_source_ids`]; it is diagnostic metadata only, never read by
/// the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub origin: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    Var(Variable),
    Lit(Literal),
    Lambda(LambdaExpr),
    MonArith(MonArithExpr),
    BinArith(BinArithExpr),
    Ternary(TernaryExpr),
    Tuple(TupleExpr),
    FuncApp(FuncAppExpr),
}

impl Expression {
    /// Builds an unannotated expression (`origin` defaults to 0 until
    /// [`annotate_source_ids`] runs).
    pub fn new(kind: ExpressionKind) -> Self {
        Expression { kind, origin: 0 }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::new(ExpressionKind::Var(Variable { name: name.into() }))
    }

    pub fn lit(lit: Literal) -> Self {
        Self::new(ExpressionKind::Lit(lit))
    }

    pub fn lambda(params: Vec<String>, body: Vec<Statement>) -> Self {
        Self::new(ExpressionKind::Lambda(LambdaExpr { params, body }))
    }

    pub fn mon(op: MonOp, exp: Expression) -> Self {
        Self::new(ExpressionKind::MonArith(MonArithExpr { op, exp: Box::new(exp) }))
    }

    pub fn bin(op: BinOp, lhs: Expression, rhs: Expression) -> Self {
        Self::new(ExpressionKind::BinArith(BinArithExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }))
    }

    pub fn ternary(cond: Expression, if_exp: Expression, else_exp: Expression) -> Self {
        Self::new(ExpressionKind::Ternary(TernaryExpr {
            cond: Box::new(cond),
            if_exp: Box::new(if_exp),
            else_exp: Box::new(else_exp),
        }))
    }

    pub fn tuple(exps: Vec<Expression>) -> Self {
        Self::new(ExpressionKind::Tuple(TupleExpr { exps }))
    }

    pub fn call(func: Expression, args: Vec<Expression>) -> Self {
        Self::new(ExpressionKind::FuncApp(FuncAppExpr { func: Box::new(func), args }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignStmt {
    pub lhs: Expression,
    pub rhs: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfElseStmt {
    pub cond: Expression,
    pub if_stmts: Vec<Statement>,
    pub else_stmts: Vec<Statement>,
}

/// Tagged union over the statement forms steinlang supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub origin: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    Exp(Expression),
    Assign(AssignStmt),
    Return(Expression),
    Print(Expression),
    IfElse(IfElseStmt),
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Statement { kind, origin: 0 }
    }

    pub fn exp(exp: Expression) -> Self {
        Self::new(StatementKind::Exp(exp))
    }

    pub fn assign(lhs: Expression, rhs: Expression) -> Self {
        Self::new(StatementKind::Assign(AssignStmt { lhs, rhs }))
    }

    pub fn ret(exp: Expression) -> Self {
        Self::new(StatementKind::Return(exp))
    }

    pub fn print(exp: Expression) -> Self {
        Self::new(StatementKind::Print(exp))
    }

    pub fn if_else(cond: Expression, if_stmts: Vec<Statement>, else_stmts: Vec<Statement>) -> Self {
        Self::new(StatementKind::IfElse(IfElseStmt { cond, if_stmts, else_stmts }))
    }
}

/// An ordered sequence of top-level statements -- the parser's output and
/// this crate's real input boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Program { statements }
    }
}

/// Assigns each [`Expression`]/[`Statement`] node a monotonically
/// increasing source id in a single pre-order walk, for diagnostics only.
/// Not load-bearing for evaluation semantics (§9).
pub fn annotate_source_ids(program: &mut Program) {
    let mut next_id = 0u32;
    for stmt in &mut program.statements {
        annotate_statement(stmt, &mut next_id);
    }
}

fn annotate_statement(stmt: &mut Statement, next_id: &mut u32) {
    stmt.origin = *next_id;
    *next_id += 1;
    match &mut stmt.kind {
        StatementKind::Exp(e) | StatementKind::Return(e) | StatementKind::Print(e) => {
            annotate_expression(e, next_id);
        }
        StatementKind::Assign(a) => {
            annotate_expression(&mut a.lhs, next_id);
            annotate_expression(&mut a.rhs, next_id);
        }
        StatementKind::IfElse(ie) => {
            annotate_expression(&mut ie.cond, next_id);
            for s in &mut ie.if_stmts {
                annotate_statement(s, next_id);
            }
            for s in &mut ie.else_stmts {
                annotate_statement(s, next_id);
            }
        }
    }
}

fn annotate_expression(exp: &mut Expression, next_id: &mut u32) {
    exp.origin = *next_id;
    *next_id += 1;
    match &mut exp.kind {
        ExpressionKind::Var(_) | ExpressionKind::Lit(_) => {}
        ExpressionKind::Lambda(l) => {
            for s in &mut l.body {
                annotate_statement(s, next_id);
            }
        }
        ExpressionKind::MonArith(m) => annotate_expression(&mut m.exp, next_id),
        ExpressionKind::BinArith(b) => {
            annotate_expression(&mut b.lhs, next_id);
            annotate_expression(&mut b.rhs, next_id);
        }
        ExpressionKind::Ternary(t) => {
            annotate_expression(&mut t.cond, next_id);
            annotate_expression(&mut t.if_exp, next_id);
            annotate_expression(&mut t.else_exp, next_id);
        }
        ExpressionKind::Tuple(t) => {
            for e in &mut t.exps {
                annotate_expression(e, next_id);
            }
        }
        ExpressionKind::FuncApp(f) => {
            annotate_expression(&mut f.func, next_id);
            for a in &mut f.args {
                annotate_expression(a, next_id);
            }
        }
    }
}
