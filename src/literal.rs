//! The value model: literals, tuples, and closures.
//!
//! A [`Literal`] is either owned by a [`crate::store::Store`] cell (an
//! lvalue), owned by a [`crate::computation::EvalResult`] on the result
//! stack (an rvalue), or embedded in an [`crate::syntax::Expression`] as a
//! constant.

use serde::{Deserialize, Serialize};

use crate::store::Address;
use crate::syntax::Statement;

/// A single parameter name in a closure's parameter list.
pub type ParamName = String;

/// (ordered parameter-name list, statement-body sequence, captured
/// environment mapping name -> address).
///
/// The captured environment is a snapshot by value at lambda-evaluation
/// time: later mutations to the creator's environment do not rebind which
/// address a captured name points to, but mutations through a captured
/// address still propagate, because both environments name the same store
/// cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Closure {
    pub params: Vec<ParamName>,
    pub body: Vec<Statement>,
    pub env: indexmap::IndexMap<String, Address>,
}

/// Ordered, fixed-length sequence of literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Tuple {
    pub elems: Vec<Literal>,
}

/// Tagged union of the values steinlang programs can produce and store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Tuple),
    Closure(Box<Closure>),
}

impl Default for Literal {
    fn default() -> Self {
        Literal::None
    }
}

impl std::fmt::Display for Literal {
    /// Mirrors the original implementation's `ShortDebugString` rendering of
    /// a `Literal` proto message: `<field>_val: <value>`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::None => write!(f, "none_val: true"),
            Literal::Bool(b) => write!(f, "bool_val: {b}"),
            Literal::Int(i) => write!(f, "int_val: {i}"),
            Literal::Float(x) => write!(f, "float_val: {x}"),
            Literal::Str(s) => write!(f, "str_val: \"{s}\""),
            Literal::Tuple(t) => {
                write!(f, "tuple_val {{ ")?;
                for elem in &t.elems {
                    write!(f, "elem {{ {elem} }} ")?;
                }
                write!(f, "}}")
            }
            Literal::Closure(_) => write!(f, "closure_val {{ ... }}"),
        }
    }
}

impl Literal {
    pub fn kind(&self) -> &'static str {
        match self {
            Literal::None => "none",
            Literal::Bool(_) => "bool",
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Str(_) => "str",
            Literal::Tuple(_) => "tuple",
            Literal::Closure(_) => "closure",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_closure(&self) -> Option<&Closure> {
        match self {
            Literal::Closure(c) => Some(c),
            _ => None,
        }
    }
}
