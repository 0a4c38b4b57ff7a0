//! `std::ops` overloads. Every operator yields `Result<Value>`, so
//! expressions read `(&a + &b)?`.

use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Not, Rem, Shl, Shr, Sub};

use crate::{
    error::Result,
    ops::{BinaryOp, UnaryOp, binary, unary},
    proxy::{NumberProxy, TensorProxy},
    value::Value,
};

macro_rules! binary_operators {
    ($ty:ty: $($trait:ident $method:ident => $op:ident),* $(,)?) => {
        $(
            impl<R: Into<Value>> $trait<R> for &$ty {
                type Output = Result<Value>;

                fn $method(self, rhs: R) -> Result<Value> {
                    binary(BinaryOp::$op, &Value::from(self), &rhs.into())
                }
            }
        )*
    };
}

macro_rules! reflected_operators {
    ($lhs:ty => [$($rhs:ty),*] $ops:tt) => {
        $(
            reflected_operators!(@one $lhs, $rhs, $ops);
        )*
    };
    (@one $lhs:ty, $rhs:ty, { $($trait:ident $method:ident => $op:ident),* $(,)? }) => {
        $(
            impl $trait<&$rhs> for $lhs {
                type Output = Result<Value>;

                fn $method(self, rhs: &$rhs) -> Result<Value> {
                    binary(BinaryOp::$op, &Value::from(self), &Value::from(rhs))
                }
            }
        )*
    };
}

macro_rules! unary_operators {
    ($($ty:ty),*) => {
        $(
            impl Neg for &$ty {
                type Output = Result<Value>;

                fn neg(self) -> Result<Value> {
                    unary(UnaryOp::Neg, &Value::from(self))
                }
            }

            impl Not for &$ty {
                type Output = Result<Value>;

                fn not(self) -> Result<Value> {
                    unary(UnaryOp::Invert, &Value::from(self))
                }
            }
        )*
    };
}

binary_operators!(NumberProxy:
    Add add => Add,
    Sub sub => Sub,
    Mul mul => Mul,
    Div div => TrueDivide,
    Rem rem => Mod,
    Shl shl => Lshift,
    Shr shr => Rshift,
);

binary_operators!(TensorProxy:
    Add add => Add,
    Sub sub => Sub,
    Mul mul => Mul,
    Div div => TrueDivide,
    Rem rem => Mod,
    Shl shl => Lshift,
    Shr shr => Rshift,
    BitAnd bitand => LogicalAnd,
    BitOr bitor => LogicalOr,
    BitXor bitxor => LogicalXor,
);

binary_operators!(Value:
    Add add => Add,
    Sub sub => Sub,
    Mul mul => Mul,
    Div div => TrueDivide,
    Rem rem => Mod,
    Shl shl => Lshift,
    Shr shr => Rshift,
    BitAnd bitand => LogicalAnd,
    BitOr bitor => LogicalOr,
    BitXor bitxor => LogicalXor,
);

reflected_operators!(i64 => [NumberProxy, TensorProxy] {
    Add add => Add,
    Sub sub => Sub,
    Mul mul => Mul,
    Div div => TrueDivide,
    Rem rem => Mod,
    Shl shl => Lshift,
    Shr shr => Rshift,
});

reflected_operators!(f64 => [NumberProxy, TensorProxy] {
    Add add => Add,
    Sub sub => Sub,
    Mul mul => Mul,
    Div div => TrueDivide,
    Rem rem => Mod,
});

unary_operators!(NumberProxy, TensorProxy, Value);
