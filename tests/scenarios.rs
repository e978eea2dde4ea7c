//! End-to-end scenarios, hand-built as `Program` ASTs since tokenizing and
//! parsing are out of scope for this crate: each test plays the role the
//! parser would, then drives a `Session` to completion and checks the
//! printed output against the expected rendering.

use pretty_assertions::assert_eq;

use steinlang::literal::Literal;
use steinlang::syntax::{BinOp, Expression, Program, Statement};
use steinlang::{Limits, RunOutcome, Session};

fn run(program: Program) -> Vec<String> {
    let mut session = Session::new(program, Limits::default());
    loop {
        match session.run() {
            RunOutcome::Done => break,
            RunOutcome::StepBudgetExhausted => continue,
            RunOutcome::ResourceExceeded(err) => panic!("resource limit exceeded: {err}"),
        }
    }
    session.consume_output()
}

/// `print 3 + 4;` -> `int_val: 7`.
#[test]
fn arithmetic_and_print() {
    let program = Program::new(vec![Statement::print(Expression::bin(
        BinOp::Add,
        Expression::lit(Literal::Int(3)),
        Expression::lit(Literal::Int(4)),
    ))]);
    assert_eq!(run(program), vec!["int_val: 7".to_string()]);
}

/// `x = 10; y = x + 5; print y;` -> `int_val: 15`.
#[test]
fn assignment_and_re_reference() {
    let program = Program::new(vec![
        Statement::assign(Expression::var("x"), Expression::lit(Literal::Int(10))),
        Statement::assign(
            Expression::var("y"),
            Expression::bin(BinOp::Add, Expression::var("x"), Expression::lit(Literal::Int(5))),
        ),
        Statement::print(Expression::var("y")),
    ]);
    assert_eq!(run(program), vec!["int_val: 15".to_string()]);
}

/// `n = 1; f = lambda : n + 10; n = 100; print f();` -> `int_val: 110`.
///
/// The captured environment snapshots the *name-to-address* mapping at
/// lambda-creation time, but the address itself still aliases the same
/// store cell, so a later reassignment of `n` is visible through the
/// closure (`spec.md` §8, scenario 3).
#[test]
fn closure_captures_by_environment_snapshot_with_shared_address() {
    let program = Program::new(vec![
        Statement::assign(Expression::var("n"), Expression::lit(Literal::Int(1))),
        Statement::assign(
            Expression::var("f"),
            Expression::lambda(
                vec![],
                vec![Statement::ret(Expression::bin(
                    BinOp::Add,
                    Expression::var("n"),
                    Expression::lit(Literal::Int(10)),
                ))],
            ),
        ),
        Statement::assign(Expression::var("n"), Expression::lit(Literal::Int(100))),
        Statement::print(Expression::call(Expression::var("f"), vec![])),
    ]);
    assert_eq!(run(program), vec!["int_val: 110".to_string()]);
}

/// `fact = lambda n : 1 if n <= 1 else n * fact(n - 1); print fact(6);` ->
/// `int_val: 720`, exercising tail-call folding through the recursive
/// chain of `return`s (`spec.md` §8, scenario 4).
#[test]
fn recursive_factorial_via_tail_call_folding() {
    let fact_body = vec![Statement::ret(Expression::ternary(
        Expression::bin(BinOp::Le, Expression::var("n"), Expression::lit(Literal::Int(1))),
        Expression::lit(Literal::Int(1)),
        Expression::bin(
            BinOp::Mul,
            Expression::var("n"),
            Expression::call(
                Expression::var("fact"),
                vec![Expression::bin(BinOp::Sub, Expression::var("n"), Expression::lit(Literal::Int(1)))],
            ),
        ),
    ))];
    let program = Program::new(vec![
        Statement::assign(Expression::var("fact"), Expression::lambda(vec!["n".to_string()], fact_body)),
        Statement::print(Expression::call(Expression::var("fact"), vec![Expression::lit(Literal::Int(6))])),
    ]);
    assert_eq!(run(program), vec!["int_val: 720".to_string()]);
}

/// `print 1 + True;` -> `none_val: true` (`spec.md` §8, scenario 5).
#[test]
fn type_mismatch_yields_none() {
    let program = Program::new(vec![Statement::print(Expression::bin(
        BinOp::Add,
        Expression::lit(Literal::Int(1)),
        Expression::lit(Literal::Bool(true)),
    ))]);
    assert_eq!(run(program), vec!["none_val: true".to_string()]);
}

/// `if 3 > 2 { print 1; } else { print 2; }` -> `int_val: 1`
/// (`spec.md` §8, scenario 6).
#[test]
fn branching_and_printing() {
    let program = Program::new(vec![Statement::if_else(
        Expression::bin(BinOp::Gt, Expression::lit(Literal::Int(3)), Expression::lit(Literal::Int(2))),
        vec![Statement::print(Expression::lit(Literal::Int(1)))],
        vec![Statement::print(Expression::lit(Literal::Int(2)))],
    )]);
    assert_eq!(run(program), vec!["int_val: 1".to_string()]);
}
