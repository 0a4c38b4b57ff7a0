//! Operator catalog and value-level dispatch.
//!
//! A proxy on the left handles the operator itself; when only the right
//! operand is a proxy, its reflected form runs; two native numbers are
//! evaluated directly.

pub mod operators;

use crate::{
    error::{ProxyError, Result},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Abs,
    Ceil,
    Floor,
    Invert,
    Neg,
    Round,
    Trunc,
}

impl UnaryOp {
    pub const fn name(self) -> &'static str {
        match self {
            UnaryOp::Abs => "abs",
            UnaryOp::Ceil => "ceil",
            UnaryOp::Floor => "floor",
            UnaryOp::Invert => "invert",
            UnaryOp::Neg => "neg",
            UnaryOp::Round => "round",
            UnaryOp::Trunc => "trunc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    TrueDivide,
    FloorDivide,
    Mod,
    Divmod,
    Pow,
    Lshift,
    Rshift,
    Matmul,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
}

impl BinaryOp {
    pub const fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::TrueDivide => "true_divide",
            BinaryOp::FloorDivide => "floor_divide",
            BinaryOp::Mod => "mod",
            BinaryOp::Divmod => "divmod",
            BinaryOp::Pow => "pow",
            BinaryOp::Lshift => "lshift",
            BinaryOp::Rshift => "rshift",
            BinaryOp::Matmul => "matmul",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::LogicalAnd => "logical_and",
            BinaryOp::LogicalOr => "logical_or",
            BinaryOp::LogicalXor => "logical_xor",
        }
    }

    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub const fn is_logical(self) -> bool {
        matches!(
            self,
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::LogicalXor
        )
    }
}

pub fn unary(op: UnaryOp, a: &Value) -> Result<Value> {
    match a {
        Value::Proxy(p) => p.unary(op),
        Value::Number(n) => n.unary(op).map(Value::Number),
        other => Err(ProxyError::InvalidOperand {
            op: op.name(),
            found: other.describe(),
        }),
    }
}

pub fn binary(op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Proxy(p), _) => p.binary(op, b),
        (_, Value::Proxy(p)) => p.rbinary(op, a),
        (Value::Number(x), Value::Number(y)) => x.binary(op, *y),
        (Value::Number(_), other) | (other, _) => Err(ProxyError::InvalidOperand {
            op: op.name(),
            found: other.describe(),
        }),
    }
}

pub fn get_item(a: &Value, key: &Value) -> Result<Value> {
    match a.as_tensor_proxy() {
        Some(t) => t.get_item(key.clone()),
        None => Err(ProxyError::UnsupportedOperation {
            op: "get_item",
            operand: a.describe(),
        }),
    }
}

/// Named unary operator methods, each forwarding to `self.unary`.
macro_rules! unary_methods {
    ($($method:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $method(&self) -> $crate::error::Result<$crate::value::Value> {
                self.unary($crate::ops::UnaryOp::$op)
            }
        )*
    };
}

/// Named binary operator methods plus their reflected counterparts, used
/// when the left operand is not a proxy.
macro_rules! binary_methods {
    ($($method:ident, $reflected:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $method(
                &self,
                other: impl Into<$crate::value::Value>,
            ) -> $crate::error::Result<$crate::value::Value> {
                self.binary($crate::ops::BinaryOp::$op, &other.into())
            }

            pub fn $reflected(
                &self,
                other: impl Into<$crate::value::Value>,
            ) -> $crate::error::Result<$crate::value::Value> {
                self.rbinary($crate::ops::BinaryOp::$op, &other.into())
            }
        )*
    };
}

/// Named comparison methods. Comparisons have no reflected form.
macro_rules! comparison_methods {
    ($($method:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $method(
                &self,
                other: impl Into<$crate::value::Value>,
            ) -> $crate::error::Result<$crate::value::Value> {
                self.binary($crate::ops::BinaryOp::$op, &other.into())
            }
        )*
    };
}

pub(crate) use binary_methods;
pub(crate) use comparison_methods;
pub(crate) use unary_methods;
