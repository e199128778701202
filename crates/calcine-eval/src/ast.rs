//! The expression tree consumed from the parser.
//!
//! The engine needs no other shape knowledge than the variants below: the
//! parser hands over literals, references, identifiers, calls, and elided
//! argument slots. Hosts without a parser (and this crate's tests) build
//! trees through the [`build`] helpers.

use calcine_common::{LiteralValue, Reference};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnaryOpKind {
    Plus,
    Minus,
    /// Postfix percent (`50%` = 0.5).
    Percent,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    /// A constant produced by the parser (number, text, boolean, error token).
    Literal(LiteralValue),
    /// A cell or rectangular range address.
    Reference(Reference),
    /// An identifier: a LET binding, a lambda parameter, or a named lambda.
    Name(String),
    /// A function call; arguments stay unevaluated until the dispatcher
    /// decides how the function's strategy consumes them.
    Call { name: String, args: Vec<ExprNode> },
    /// Invocation of a lambda-producing expression, `LAMBDA(x, x*2)(5)`.
    Invoke {
        callee: Box<ExprNode>,
        args: Vec<ExprNode>,
    },
    UnaryOp {
        op: UnaryOpKind,
        expr: Box<ExprNode>,
    },
    BinaryOp {
        op: BinaryOpKind,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    /// An elided argument slot (`f(1,,3)`); evaluates to `Omitted`.
    Missing,
}

impl ExprNode {
    /// Structural fingerprint used as the subexpression-cache key.
    ///
    /// Two nodes with equal fingerprints are assumed structurally identical
    /// within one evaluation; the cache additionally keys on the active
    /// scope, so identifier nodes never alias across binding environments.
    pub fn fingerprint(&self) -> u64 {
        let mut h = FxHasher::default();
        self.hash_into(&mut h);
        h.finish()
    }

    fn hash_into(&self, h: &mut FxHasher) {
        match self {
            ExprNode::Literal(v) => {
                h.write_u8(0);
                v.hash(h);
            }
            ExprNode::Reference(r) => {
                h.write_u8(1);
                r.hash(h);
            }
            ExprNode::Name(n) => {
                h.write_u8(2);
                n.hash(h);
            }
            ExprNode::Call { name, args } => {
                h.write_u8(3);
                name.hash(h);
                h.write_usize(args.len());
                for a in args {
                    a.hash_into(h);
                }
            }
            ExprNode::UnaryOp { op, expr } => {
                h.write_u8(4);
                op.hash(h);
                expr.hash_into(h);
            }
            ExprNode::BinaryOp { op, left, right } => {
                h.write_u8(5);
                op.hash(h);
                left.hash_into(h);
                right.hash_into(h);
            }
            ExprNode::Missing => h.write_u8(6),
            ExprNode::Invoke { callee, args } => {
                h.write_u8(7);
                callee.hash_into(h);
                h.write_usize(args.len());
                for a in args {
                    a.hash_into(h);
                }
            }
        }
    }

    /// The identifier text, if this node is a literal identifier.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            ExprNode::Name(n) => Some(n),
            _ => None,
        }
    }
}

/// Programmatic tree construction, the engine's stand-in for a parser.
pub mod build {
    use super::ExprNode;
    use calcine_common::{ExcelError, LiteralValue, Reference};

    pub fn num(n: f64) -> ExprNode {
        ExprNode::Literal(LiteralValue::Number(n))
    }

    pub fn text<S: Into<String>>(s: S) -> ExprNode {
        ExprNode::Literal(LiteralValue::Text(s.into()))
    }

    pub fn boolean(b: bool) -> ExprNode {
        ExprNode::Literal(LiteralValue::Boolean(b))
    }

    pub fn error(e: ExcelError) -> ExprNode {
        ExprNode::Literal(LiteralValue::Error(e))
    }

    pub fn lit(v: LiteralValue) -> ExprNode {
        ExprNode::Literal(v)
    }

    /// A 2-D array literal; rows must be rectangular.
    pub fn array(rows: Vec<Vec<LiteralValue>>) -> ExprNode {
        ExprNode::Literal(LiteralValue::Array(rows))
    }

    pub fn name<S: Into<String>>(n: S) -> ExprNode {
        ExprNode::Name(n.into())
    }

    pub fn cell(row: u32, col: u32) -> ExprNode {
        ExprNode::Reference(Reference::cell(row, col))
    }

    pub fn range(sr: u32, sc: u32, er: u32, ec: u32) -> ExprNode {
        ExprNode::Reference(Reference::range(sr, sc, er, ec))
    }

    pub fn call<S: Into<String>>(name: S, args: Vec<ExprNode>) -> ExprNode {
        ExprNode::Call {
            name: name.into(),
            args,
        }
    }

    pub fn invoke(callee: ExprNode, args: Vec<ExprNode>) -> ExprNode {
        ExprNode::Invoke {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn missing() -> ExprNode {
        ExprNode::Missing
    }

    pub fn unary(op: super::UnaryOpKind, expr: ExprNode) -> ExprNode {
        ExprNode::UnaryOp {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn binary(op: super::BinaryOpKind, left: ExprNode, right: ExprNode) -> ExprNode {
        ExprNode::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn add(left: ExprNode, right: ExprNode) -> ExprNode {
        binary(super::BinaryOpKind::Add, left, right)
    }

    pub fn sub(left: ExprNode, right: ExprNode) -> ExprNode {
        binary(super::BinaryOpKind::Sub, left, right)
    }

    pub fn mul(left: ExprNode, right: ExprNode) -> ExprNode {
        binary(super::BinaryOpKind::Mul, left, right)
    }

    pub fn div(left: ExprNode, right: ExprNode) -> ExprNode {
        binary(super::BinaryOpKind::Div, left, right)
    }

    pub fn neg(expr: ExprNode) -> ExprNode {
        unary(super::UnaryOpKind::Minus, expr)
    }
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;

    #[test]
    fn fingerprints_are_structural() {
        let a = call("SUM", vec![num(1.0), num(2.0)]);
        let b = call("SUM", vec![num(1.0), num(2.0)]);
        let c = call("SUM", vec![num(2.0), num(1.0)]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn fingerprint_distinguishes_node_kinds() {
        assert_ne!(name("x").fingerprint(), text("x").fingerprint());
        assert_ne!(missing().fingerprint(), lit(LiteralValue::Empty).fingerprint());
    }
}
