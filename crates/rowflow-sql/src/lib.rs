//! SQL AST and rewrites for the rowflow engine
//!
//! This crate holds the statement tree the parser produces, the
//! structure-preserving rewrites that prepare a SELECT for execution
//! (alias canonicalization, join-expression sharing, per-source projection
//! pushdown), and the expression evaluator the runtime applies to rows.

pub mod ast;
mod error;
pub mod eval;

pub use ast::{
    BinaryExpr, BinaryOp, Column, Direction, Expression, FuncExpr, IdentityExpr, JoinKind, JoinOp,
    JoinSide, Pos, Projection, ResultColumn, SelectStatement, SqlSource, Statement, WhereClause,
};
pub use error::{Error, Result};
pub use eval::{FieldReader, eval};
