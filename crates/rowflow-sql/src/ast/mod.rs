//! Abstract Syntax Tree (AST) for SQL statements
//!
//! The statement is the root of the tree the parser hands to the engine.
//! Only SELECT carries execution semantics here; the remaining statements
//! are structural placeholders the parser can produce and a host can
//! inspect, but the execution layer rejects them.

pub mod expressions;
pub mod projection;
mod rewrite;
pub mod select;

pub use expressions::{BinaryExpr, BinaryOp, Expression, FuncExpr, IdentityExpr};
pub use projection::{Projection, ResultColumn};
pub use select::{Column, SelectStatement, SqlSource, WhereClause};

use rowflow_value::Value;
use std::fmt;

/// Byte offset of a node in the original statement text, for error reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pos(pub u32);

/// Sort direction for ORDER BY columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// How a FROM element is joined: `ON`, `USING`, or `IN` (subquery).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOp {
    On,
    Using,
    In,
}

/// LEFT or RIGHT side marker on a join clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Left,
    Right,
}

/// INNER or OUTER join kind. Only INNER is executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Outer,
}

/// SQL statements as parsed. The variants beyond `Select` carry the fields
/// the parser fills in but have no execution path.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Box<SelectStatement>),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Upsert(UpsertStatement),
    Delete(DeleteStatement),
    Show(ShowStatement),
    Describe(DescribeStatement),
    Into(IntoStatement),
    Prepared(PreparedStatement),
}

impl Statement {
    /// The leading keyword of the statement.
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::Select(_) => "SELECT",
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Upsert(_) => "UPSERT",
            Statement::Delete(_) => "DELETE",
            Statement::Show(_) => "SHOW",
            Statement::Describe(_) => "DESCRIBE",
            Statement::Into(_) => "INTO",
            Statement::Prepared(_) => "PREPARE",
        }
    }

    pub fn pos(&self) -> Pos {
        match self {
            Statement::Select(s) => s.pos,
            Statement::Insert(s) => s.pos,
            Statement::Update(s) => s.pos,
            Statement::Upsert(s) => s.pos,
            Statement::Delete(s) => s.pos,
            Statement::Show(s) => s.pos,
            Statement::Describe(s) => s.pos,
            Statement::Into(s) => s.pos,
            Statement::Prepared(s) => s.pos,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Select(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.keyword()),
        }
    }
}

/// INSERT INTO: placeholder, not executed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertStatement {
    pub pos: Pos,
    pub into: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

/// UPSERT: placeholder, not executed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpsertStatement {
    pub pos: Pos,
    pub into: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

/// UPDATE: placeholder, not executed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateStatement {
    pub pos: Pos,
    pub table: String,
    pub columns: Vec<Column>,
    pub r#where: Option<Expression>,
}

/// DELETE: placeholder, not executed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteStatement {
    pub pos: Pos,
    pub table: String,
    pub r#where: Option<Expression>,
    pub limit: Option<u64>,
}

/// SHOW <identity>: placeholder, not executed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShowStatement {
    pub pos: Pos,
    pub identity: String,
    pub from: Option<String>,
}

/// DESCRIBE <identity> or EXPLAIN <statement>: placeholder, not executed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DescribeStatement {
    pub pos: Pos,
    pub identity: String,
    pub stmt: Option<Box<Statement>>,
}

/// SELECT ... INTO <table>: placeholder, not executed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntoStatement {
    pub pos: Pos,
    pub table: String,
}

/// PREPARE <alias> FROM <statement>: placeholder, not executed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    pub pos: Pos,
    pub alias: String,
    pub stmt: Box<Statement>,
}
