//! Concrete numbers and the native arithmetic used when no language context
//! is active.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use num_complex::Complex64;
use num_traits::{ToPrimitive, Zero};

use crate::{
    error::{ProxyError, Result},
    ops::{BinaryOp, UnaryOp},
    value::Value,
};

/// The kinds of scalar a number proxy can stand in for, ordered by
/// promotion: bool < int < float < complex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumberKind {
    Bool,
    Int,
    Float,
    Complex,
}

impl NumberKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            NumberKind::Bool => "bool",
            NumberKind::Int => "int",
            NumberKind::Float => "float",
            NumberKind::Complex => "complex",
        }
    }

    pub fn promote(self, other: NumberKind) -> NumberKind {
        self.max(other)
    }
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Number {
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(Complex64),
}

impl Number {
    pub fn kind(&self) -> NumberKind {
        match self {
            Number::Bool(_) => NumberKind::Bool,
            Number::Int(_) => NumberKind::Int,
            Number::Float(_) => NumberKind::Float,
            Number::Complex(_) => NumberKind::Complex,
        }
    }

    /// Lossless widening into `kind`. Narrowing is a [`ProxyError::KindMismatch`].
    pub fn coerce(self, kind: NumberKind) -> Result<Number> {
        let mismatch = || ProxyError::KindMismatch {
            kind,
            value: self.to_string(),
        };
        if self.kind() > kind {
            return Err(mismatch());
        }
        Ok(match kind {
            NumberKind::Bool => self,
            NumberKind::Int => Number::Int(self.as_i64().ok_or_else(mismatch)?),
            NumberKind::Float => Number::Float(self.as_f64().ok_or_else(mismatch)?),
            NumberKind::Complex => Number::Complex(self.as_complex()),
        })
    }

    fn as_i64(self) -> Option<i64> {
        match self {
            Number::Bool(b) => Some(b as i64),
            Number::Int(i) => Some(i),
            _ => None,
        }
    }

    fn as_f64(self) -> Option<f64> {
        match self {
            Number::Bool(b) => Some(b as i64 as f64),
            Number::Int(i) => Some(i as f64),
            Number::Float(f) => Some(f),
            Number::Complex(_) => None,
        }
    }

    fn as_complex(self) -> Complex64 {
        match self {
            Number::Complex(c) => c,
            other => Complex64::new(other.as_f64().unwrap_or(f64::NAN), 0.0),
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Bool(b) => !b,
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
            Number::Complex(c) => c.is_zero(),
        }
    }

    pub fn unary(self, op: UnaryOp) -> Result<Number> {
        let name = op.name();
        let unsupported = || ProxyError::UnsupportedOperation {
            op: name,
            operand: self.kind().to_string(),
        };
        let overflow = || ProxyError::Overflow { op: name };
        let n = match self {
            Number::Bool(b) => Number::Int(b as i64),
            other => other,
        };
        Ok(match (op, n) {
            (UnaryOp::Abs, Number::Int(i)) => Number::Int(i.checked_abs().ok_or_else(overflow)?),
            (UnaryOp::Abs, Number::Float(f)) => Number::Float(f.abs()),
            (UnaryOp::Abs, Number::Complex(c)) => Number::Float(c.norm()),

            (UnaryOp::Neg, Number::Int(i)) => Number::Int(i.checked_neg().ok_or_else(overflow)?),
            (UnaryOp::Neg, Number::Float(f)) => Number::Float(-f),
            (UnaryOp::Neg, Number::Complex(c)) => Number::Complex(-c),

            (UnaryOp::Invert, Number::Int(i)) => Number::Int(!i),

            (UnaryOp::Ceil | UnaryOp::Floor | UnaryOp::Round | UnaryOp::Trunc, Number::Int(i)) => {
                Number::Int(i)
            }
            (UnaryOp::Ceil, Number::Float(f)) => Number::Int(float_to_int(f.ceil(), name)?),
            (UnaryOp::Floor, Number::Float(f)) => Number::Int(float_to_int(f.floor(), name)?),
            (UnaryOp::Round, Number::Float(f)) => {
                Number::Int(float_to_int(f.round_ties_even(), name)?)
            }
            (UnaryOp::Trunc, Number::Float(f)) => Number::Int(float_to_int(f.trunc(), name)?),

            _ => return Err(unsupported()),
        })
    }

    /// Evaluates `self <op> rhs`. Only `divmod` produces a tuple.
    pub fn binary(self, op: BinaryOp, rhs: Number) -> Result<Value> {
        if op == BinaryOp::Divmod {
            let (q, r) = self.divmod(rhs)?;
            return Ok(Value::Tuple(vec![q.into(), r.into()]));
        }
        self.scalar_binary(op, rhs).map(Value::Number)
    }

    pub fn divmod(self, rhs: Number) -> Result<(Number, Number)> {
        Ok((
            self.scalar_binary(BinaryOp::FloorDivide, rhs)?,
            self.scalar_binary(BinaryOp::Mod, rhs)?,
        ))
    }

    fn scalar_binary(self, op: BinaryOp, rhs: Number) -> Result<Number> {
        let name = op.name();
        let unsupported = || ProxyError::UnsupportedOperation {
            op: name,
            operand: format!("{} and {}", self.kind(), rhs.kind()),
        };
        let zero_division = || ProxyError::ZeroDivision { op: name };

        if op.is_comparison() {
            return compare(op, self, rhs).map(Number::Bool).ok_or_else(unsupported);
        }

        let kind = self.kind().promote(rhs.kind());

        if op.is_logical() {
            return match (self, rhs) {
                (Number::Bool(a), Number::Bool(b)) => Ok(Number::Bool(match op {
                    BinaryOp::LogicalAnd => a & b,
                    BinaryOp::LogicalOr => a | b,
                    _ => a ^ b,
                })),
                _ if kind == NumberKind::Int => {
                    let a = self.as_i64().ok_or_else(unsupported)?;
                    let b = rhs.as_i64().ok_or_else(unsupported)?;
                    Ok(Number::Int(match op {
                        BinaryOp::LogicalAnd => a & b,
                        BinaryOp::LogicalOr => a | b,
                        _ => a ^ b,
                    }))
                }
                _ => Err(unsupported()),
            };
        }

        match op {
            BinaryOp::TrueDivide => {
                if rhs.is_zero() {
                    return Err(zero_division());
                }
                return Ok(match kind {
                    NumberKind::Complex => Number::Complex(self.as_complex() / rhs.as_complex()),
                    _ => {
                        let a = self.as_f64().ok_or_else(unsupported)?;
                        let b = rhs.as_f64().ok_or_else(unsupported)?;
                        Number::Float(a / b)
                    }
                });
            }
            BinaryOp::Matmul => return Err(unsupported()),
            _ => {}
        }

        match kind {
            NumberKind::Bool | NumberKind::Int => {
                let a = self.as_i64().ok_or_else(unsupported)?;
                let b = rhs.as_i64().ok_or_else(unsupported)?;
                int_binary(op, a, b)
            }
            NumberKind::Float => {
                let a = self.as_f64().ok_or_else(unsupported)?;
                let b = rhs.as_f64().ok_or_else(unsupported)?;
                Ok(match op {
                    BinaryOp::Add => Number::Float(a + b),
                    BinaryOp::Sub => Number::Float(a - b),
                    BinaryOp::Mul => Number::Float(a * b),
                    BinaryOp::FloorDivide if b == 0.0 => return Err(zero_division()),
                    BinaryOp::FloorDivide => Number::Float((a / b).floor()),
                    BinaryOp::Mod if b == 0.0 => return Err(zero_division()),
                    BinaryOp::Mod => Number::Float(float_mod(a, b)),
                    BinaryOp::Pow if a == 0.0 && b < 0.0 => return Err(zero_division()),
                    // A negative base with a fractional exponent leaves the reals.
                    BinaryOp::Pow if a < 0.0 && b.fract() != 0.0 => {
                        Number::Complex(Complex64::new(a, 0.0).powf(b))
                    }
                    BinaryOp::Pow => Number::Float(a.powf(b)),
                    _ => return Err(unsupported()),
                })
            }
            NumberKind::Complex => {
                let a = self.as_complex();
                let b = rhs.as_complex();
                Ok(match op {
                    BinaryOp::Add => Number::Complex(a + b),
                    BinaryOp::Sub => Number::Complex(a - b),
                    BinaryOp::Mul => Number::Complex(a * b),
                    BinaryOp::Pow if a.is_zero() && (b.re < 0.0 || b.im != 0.0) => {
                        return Err(zero_division());
                    }
                    BinaryOp::Pow if a.is_zero() && b.is_zero() => {
                        Number::Complex(Complex64::new(1.0, 0.0))
                    }
                    BinaryOp::Pow if a.is_zero() => Number::Complex(Complex64::zero()),
                    BinaryOp::Pow => Number::Complex(a.powc(b)),
                    _ => return Err(unsupported()),
                })
            }
        }
    }
}

fn int_binary(op: BinaryOp, a: i64, b: i64) -> Result<Number> {
    let name = op.name();
    let overflow = || ProxyError::Overflow { op: name };
    let zero_division = || ProxyError::ZeroDivision { op: name };
    Ok(Number::Int(match op {
        BinaryOp::Add => a.checked_add(b).ok_or_else(overflow)?,
        BinaryOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
        BinaryOp::Mul => a.checked_mul(b).ok_or_else(overflow)?,
        BinaryOp::FloorDivide | BinaryOp::Mod if b == 0 => return Err(zero_division()),
        BinaryOp::FloorDivide => {
            let q = a.checked_div(b).ok_or_else(overflow)?;
            // Round toward negative infinity.
            if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q }
        }
        BinaryOp::Mod => {
            let r = a.checked_rem(b).ok_or_else(overflow)?;
            if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }
        }
        BinaryOp::Pow if b < 0 => {
            if a == 0 {
                return Err(zero_division());
            }
            return Ok(Number::Float((a as f64).powf(b as f64)));
        }
        BinaryOp::Pow => match (a, u32::try_from(b)) {
            (_, Ok(exp)) => a.checked_pow(exp).ok_or_else(overflow)?,
            (0 | 1, Err(_)) => a,
            (-1, Err(_)) => if b % 2 == 0 { 1 } else { -1 },
            (_, Err(_)) => return Err(overflow()),
        },
        BinaryOp::Lshift | BinaryOp::Rshift if b < 0 => {
            return Err(ProxyError::InvalidOperand {
                op: name,
                found: "a negative shift count".into(),
            });
        }
        BinaryOp::Lshift => {
            if a == 0 {
                0
            } else if b >= 63 {
                return Err(overflow());
            } else {
                let shifted = a << b;
                if shifted >> b != a {
                    return Err(overflow());
                }
                shifted
            }
        }
        BinaryOp::Rshift => {
            if b >= 64 {
                if a < 0 { -1 } else { 0 }
            } else {
                a >> b
            }
        }
        _ => {
            return Err(ProxyError::UnsupportedOperation {
                op: name,
                operand: "int and int".into(),
            });
        }
    }))
}

fn float_to_int(f: f64, op: &'static str) -> Result<i64> {
    if f.is_nan() {
        return Err(ProxyError::InvalidOperand {
            op,
            found: "NaN".into(),
        });
    }
    f.to_i64().ok_or(ProxyError::Overflow { op })
}

/// Float remainder carrying the sign of the divisor.
fn float_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r == 0.0 {
        0.0_f64.copysign(b)
    } else if (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

fn compare(op: BinaryOp, a: Number, b: Number) -> Option<bool> {
    match op {
        BinaryOp::Eq => return Some(a == b),
        BinaryOp::Ne => return Some(a != b),
        _ => {}
    }
    let ord = a.partial_cmp(&b);
    Some(match op {
        BinaryOp::Lt => ord == Some(Ordering::Less),
        BinaryOp::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        BinaryOp::Gt => ord == Some(Ordering::Greater),
        BinaryOp::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        _ => return None,
    })
    .filter(|_| a.kind() != NumberKind::Complex && b.kind() != NumberKind::Complex)
}

/// Exact ordering of an integer against a float, without rounding the
/// integer through `f64`.
fn cmp_int_float(i: i64, f: f64) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    let floor = f.floor();
    Some(match floor.to_i64() {
        Some(j) if f == floor => i.cmp(&j),
        Some(j) if i <= j => Ordering::Less,
        Some(_) => Ordering::Greater,
        None if f > 0.0 => Ordering::Less,
        None => Ordering::Greater,
    })
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Number::Complex(a), Number::Complex(b)) => a == b,
            (Number::Complex(c), n) | (n, Number::Complex(c)) => {
                c.im == 0.0 && Number::Float(c.re) == n
            }
            (a, b) => a.partial_cmp(&b) == Some(Ordering::Equal),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (*self, *other) {
            (Number::Complex(_), _) | (_, Number::Complex(_)) => {
                (self == other).then_some(Ordering::Equal)
            }
            (Number::Float(a), Number::Float(b)) => a.partial_cmp(&b),
            (Number::Float(f), n) => cmp_int_float(n.as_i64()?, f).map(Ordering::reverse),
            (n, Number::Float(f)) => cmp_int_float(n.as_i64()?, f),
            (a, b) => Some(a.as_i64()?.cmp(&b.as_i64()?)),
        }
    }
}

/// Hashes agree with numeric equality, and an integral number hashes
/// exactly as the equivalent `i64`.
impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        fn hash_float<H: Hasher>(f: f64, state: &mut H) {
            match f.to_i64() {
                Some(i) if f.fract() == 0.0 => i.hash(state),
                _ => f.to_bits().hash(state),
            }
        }
        match *self {
            Number::Bool(b) => (b as i64).hash(state),
            Number::Int(i) => i.hash(state),
            Number::Float(f) => hash_float(f, state),
            Number::Complex(c) if c.im == 0.0 => hash_float(c.re, state),
            Number::Complex(c) => (c.re.to_bits(), c.im.to_bits()).hash(state),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Bool(b) => write!(f, "{b}"),
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{x:?}"),
            Number::Complex(c) => write!(f, "{c}"),
        }
    }
}

impl From<bool> for Number {
    fn from(b: bool) -> Self {
        Number::Bool(b)
    }
}

impl From<i32> for Number {
    fn from(i: i32) -> Self {
        Number::Int(i.into())
    }
}

impl From<i64> for Number {
    fn from(i: i64) -> Self {
        Number::Int(i)
    }
}

impl From<f64> for Number {
    fn from(f: f64) -> Self {
        Number::Float(f)
    }
}

impl From<Complex64> for Number {
    fn from(c: Complex64) -> Self {
        Number::Complex(c)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cmp::Ordering,
        hash::{DefaultHasher, Hash, Hasher},
    };

    use num_complex::Complex64;

    use crate::prelude::*;

    fn hash_of<T: Hash + ?Sized>(t: &T) -> u64 {
        let mut h = DefaultHasher::new();
        t.hash(&mut h);
        h.finish()
    }

    fn eval(a: impl Into<Number>, op: BinaryOp, b: impl Into<Number>) -> Result<Number> {
        match a.into().binary(op, b.into())? {
            Value::Number(n) => Ok(n),
            other => panic!("expected a number, got {other}"),
        }
    }

    #[test]
    fn floor_division_and_modulo_round_toward_negative_infinity() {
        assert_eq!(eval(-7, BinaryOp::FloorDivide, 2), Ok(Number::Int(-4)));
        assert_eq!(eval(-7, BinaryOp::Mod, 2), Ok(Number::Int(1)));
        assert_eq!(eval(7, BinaryOp::Mod, -2), Ok(Number::Int(-1)));
        assert_eq!(eval(-7.5, BinaryOp::Mod, 2.0), Ok(Number::Float(0.5)));
    }

    #[test]
    fn divmod_yields_a_pair() {
        let v = Number::Int(7).binary(BinaryOp::Divmod, Number::Int(3)).unwrap();
        let Value::Tuple(items) = v else {
            panic!("divmod should produce a tuple");
        };
        assert_eq!(items[0].as_number(), Some(Number::Int(2)));
        assert_eq!(items[1].as_number(), Some(Number::Int(1)));
    }

    #[test]
    fn true_division_promotes_to_float() {
        assert_eq!(eval(7, BinaryOp::TrueDivide, 2), Ok(Number::Float(3.5)));
        assert_eq!(
            eval(1, BinaryOp::TrueDivide, 0),
            Err(ProxyError::ZeroDivision { op: "true_divide" })
        );
    }

    #[test]
    fn integer_pow_with_negative_exponent_is_float() {
        assert_eq!(eval(2, BinaryOp::Pow, -1), Ok(Number::Float(0.5)));
        assert_eq!(eval(2, BinaryOp::Pow, 10), Ok(Number::Int(1024)));
        assert_eq!(
            eval(i64::MAX, BinaryOp::Add, 1),
            Err(ProxyError::Overflow { op: "add" })
        );
    }

    #[test]
    fn shifts_require_integers() {
        assert_eq!(eval(1, BinaryOp::Lshift, 4), Ok(Number::Int(16)));
        assert_eq!(eval(-16, BinaryOp::Rshift, 2), Ok(Number::Int(-4)));
        assert!(matches!(
            eval(1.0, BinaryOp::Lshift, 1),
            Err(ProxyError::UnsupportedOperation { op: "lshift", .. })
        ));
        assert!(matches!(
            eval(1, BinaryOp::Rshift, -1),
            Err(ProxyError::InvalidOperand { op: "rshift", .. })
        ));
    }

    #[test]
    fn bools_promote_to_int() {
        assert_eq!(eval(true, BinaryOp::Add, true), Ok(Number::Int(2)));
        assert_eq!(Number::Bool(true).unary(UnaryOp::Invert), Ok(Number::Int(-2)));
    }

    #[test]
    fn float_rounding_yields_integers() {
        assert_eq!(Number::Float(2.5).unary(UnaryOp::Round), Ok(Number::Int(2)));
        assert_eq!(Number::Float(-2.5).unary(UnaryOp::Ceil), Ok(Number::Int(-2)));
        assert_eq!(Number::Float(-2.5).unary(UnaryOp::Floor), Ok(Number::Int(-3)));
        assert_eq!(
            Number::Float(f64::INFINITY).unary(UnaryOp::Trunc),
            Err(ProxyError::Overflow { op: "trunc" })
        );
    }

    #[test]
    fn complex_rejects_integer_only_ops() {
        let c = Number::Complex(Complex64::new(3.0, 4.0));
        assert_eq!(c.unary(UnaryOp::Abs), Ok(Number::Float(5.0)));
        assert!(c.unary(UnaryOp::Floor).is_err());
        assert!(c.binary(BinaryOp::Mod, Number::Int(2)).is_err());
    }

    #[test]
    fn equality_and_hash_are_numeric() {
        assert_eq!(Number::Int(5), Number::Float(5.0));
        assert_eq!(Number::Bool(true), Number::Int(1));
        assert_eq!(hash_of(&Number::Int(5)), hash_of(&5i64));
        assert_eq!(hash_of(&Number::Float(5.0)), hash_of(&5i64));
        assert_eq!(
            hash_of(&Number::Complex(Complex64::new(2.0, 0.0))),
            hash_of(&Number::Int(2))
        );
        assert!(Number::Int(2) < Number::Float(2.5));
    }

    #[test]
    fn large_integers_compare_exactly_against_floats() {
        let big = Number::Int((1 << 53) + 1);
        let near = Number::Float((1u64 << 53) as f64);
        let near_complex = Number::Complex(Complex64::new((1u64 << 53) as f64, 0.0));
        assert_ne!(big, near);
        assert_ne!(big, near_complex);
        assert_eq!(big.partial_cmp(&near), Some(Ordering::Greater));
        assert_eq!(near.partial_cmp(&big), Some(Ordering::Less));
        assert!(Number::Int(i64::MAX) < Number::Float(1e19));
        assert!(Number::Int(i64::MIN) > Number::Float(f64::NEG_INFINITY));
        assert!(Number::Int(3) > Number::Float(2.5));
        assert!(Number::Int(-3) < Number::Float(-2.5));
        assert_eq!(Number::Int(1).partial_cmp(&Number::Float(f64::NAN)), None);
        assert_eq!(Number::Complex(Complex64::new(2.0, 0.0)), Number::Int(2));
        assert_ne!(Number::Complex(Complex64::new(2.0, 1.0)), Number::Int(2));
    }

    #[test]
    fn unit_bases_raise_to_huge_exponents() {
        let huge = 1i64 << 32;
        assert_eq!(eval(1, BinaryOp::Pow, huge), Ok(Number::Int(1)));
        assert_eq!(eval(0, BinaryOp::Pow, huge), Ok(Number::Int(0)));
        assert_eq!(eval(-1, BinaryOp::Pow, huge), Ok(Number::Int(1)));
        assert_eq!(eval(-1, BinaryOp::Pow, huge + 1), Ok(Number::Int(-1)));
        assert_eq!(eval(2, BinaryOp::Pow, huge), Err(ProxyError::Overflow { op: "pow" }));
    }

    #[test]
    fn coercion_only_widens() {
        assert_eq!(Number::Int(3).coerce(NumberKind::Float), Ok(Number::Float(3.0)));
        assert!(matches!(
            Number::Float(3.5).coerce(NumberKind::Int),
            Err(ProxyError::KindMismatch { .. })
        ));
    }
}
