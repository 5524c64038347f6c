//! Expression nodes consumed by the rewrite layer and the evaluator
//!
//! The parser produces three node shapes: identifiers (possibly qualified as
//! `table.column`), binary operator applications, and function calls. The
//! rewrite code inspects exactly these shapes; representing them as a sum
//! type makes the "unknown node kind" case unrepresentable.

use std::fmt;

/// An expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// An identifier, e.g. `name` or `u.user_id`.
    Identity(IdentityExpr),
    /// A binary operator application, e.g. `u.user_id = o.user_id`.
    Binary(BinaryExpr),
    /// A function call, e.g. `LOWER(email)`.
    Function(FuncExpr),
}

impl Expression {
    /// Build an identity node.
    pub fn identity<S: Into<String>>(text: S) -> Self {
        Expression::Identity(IdentityExpr::new(text))
    }

    /// Build a binary node.
    pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Self {
        Expression::Binary(BinaryExpr::new(op, lhs, rhs))
    }

    /// Build a function-call node.
    pub fn func<S: Into<String>>(name: S, args: Vec<Expression>) -> Self {
        Expression::Function(FuncExpr {
            name: name.into(),
            args,
        })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identity(id) => write!(f, "{}", id.text),
            Expression::Binary(bn) => {
                write!(f, "{} {} {}", bn.args[0], bn.op.symbol(), bn.args[1])
            }
            Expression::Function(fun) => {
                write!(f, "{}(", fun.name)?;
                for (i, arg) in fun.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// An identifier, with access to its `left.right` qualification split.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityExpr {
    pub text: String,
}

impl IdentityExpr {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }

    /// Split `table.column` into qualifier and base name. Unqualified
    /// identifiers return `(None, whole)`.
    pub fn left_right(&self) -> (Option<&str>, &str) {
        split_qualified(&self.text)
    }
}

/// Operators appearing in binary nodes. The rewrite layer only acts on
/// equality and AND/OR; the rest flow through to the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    EqEq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
}

impl BinaryOp {
    /// Whether this is a plain equality, the only operator the join key
    /// extraction understands.
    pub fn is_simple(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::EqEq)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::EqEq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

/// A binary operator applied to two argument expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub args: [Box<Expression>; 2],
}

impl BinaryExpr {
    pub fn new(op: BinaryOp, lhs: Expression, rhs: Expression) -> Self {
        Self {
            op,
            args: [Box::new(lhs), Box::new(rhs)],
        }
    }
}

/// A function call with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncExpr {
    pub name: String,
    pub args: Vec<Expression>,
}

/// Split a possibly-qualified identifier. More than one qualifier is not a
/// legal identity; it is kept whole so the caller sees the bad name in full.
pub(crate) fn split_qualified(name: &str) -> (Option<&str>, &str) {
    let mut parts = name.splitn(3, '.');
    let first = parts.next().unwrap_or(name);
    match (parts.next(), parts.next()) {
        (None, _) => (None, name),
        (Some(right), None) => (Some(first), right),
        (Some(_), Some(_)) => {
            tracing::warn!("bad identity with multiple periods: {}", name);
            (None, name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_right_split() {
        let id = IdentityExpr::new("u.user_id");
        assert_eq!(id.left_right(), (Some("u"), "user_id"));

        let bare = IdentityExpr::new("name");
        assert_eq!(bare.left_right(), (None, "name"));
    }

    #[test]
    fn test_left_right_multiple_periods() {
        let id = IdentityExpr::new("db.table.column");
        assert_eq!(id.left_right(), (None, "db.table.column"));
    }

    #[test]
    fn test_display() {
        let expr = Expression::binary(
            BinaryOp::Eq,
            Expression::identity("u.user_id"),
            Expression::identity("o.user_id"),
        );
        assert_eq!(expr.to_string(), "u.user_id = o.user_id");

        let fun = Expression::func("LOWER", vec![Expression::identity("email")]);
        assert_eq!(fun.to_string(), "LOWER(email)");
    }

    #[test]
    fn test_simple_operators() {
        assert!(BinaryOp::Eq.is_simple());
        assert!(BinaryOp::EqEq.is_simple());
        assert!(!BinaryOp::And.is_simple());
        assert!(!BinaryOp::Gt.is_simple());
    }
}
