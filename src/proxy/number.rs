use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};

use num_complex::Complex64;

use crate::{
    context::{get_langctx, invoke_binary, invoke_unary},
    error::{ProxyError, Result},
    identity::Name,
    number::{Number, NumberKind},
    ops::{BinaryOp, UnaryOp, binary_methods, unary_methods},
    proxy::{ProxyBase, ProxyInterface, check_owners},
    value::{Value, pyval},
};

/// A symbolic scalar of kind bool, int, float or complex.
///
/// The concrete value, when statically known, is kept alongside the kind.
/// With no active language context, operators evaluate that value natively;
/// with one, they hand the proxy itself to the context.
///
/// Equality, ordering and hashing compare known values, never names. Use
/// [`Variable`](crate::variable::Variable) to key containers by identity.
#[derive(Debug, Clone)]
pub struct NumberProxy {
    base: ProxyBase,
    value: Option<Number>,
    kind: NumberKind,
}

impl NumberProxy {
    /// Fails with [`ProxyError::KindMismatch`] before allocating a name when
    /// `value` is not representable as `kind`.
    pub fn new(name: Option<&str>, kind: NumberKind, value: Option<Number>) -> Result<Self> {
        let value = value.map(|v| v.coerce(kind)).transpose()?;
        Ok(NumberProxy {
            base: ProxyBase::new(name.map(Name::from))?,
            value,
            kind,
        })
    }

    pub fn integer(name: Option<&str>, value: Option<i64>) -> Result<Self> {
        Self::new(name, NumberKind::Int, value.map(Number::Int))
    }

    pub fn boolean(name: Option<&str>, value: Option<bool>) -> Result<Self> {
        Self::new(name, NumberKind::Bool, value.map(Number::Bool))
    }

    pub fn float(name: Option<&str>, value: Option<f64>) -> Result<Self> {
        Self::new(name, NumberKind::Float, value.map(Number::Float))
    }

    pub fn complex(name: Option<&str>, value: Option<Complex64>) -> Result<Self> {
        Self::new(name, NumberKind::Complex, value.map(Number::Complex))
    }

    pub fn value(&self) -> Option<Number> {
        self.value
    }

    pub fn is_known(&self) -> bool {
        self.value.is_some()
    }

    pub fn kind(&self) -> NumberKind {
        self.kind
    }

    pub fn unary(&self, op: UnaryOp) -> Result<Value> {
        match get_langctx() {
            Some(ctx) => {
                self.base.check_owner()?;
                invoke_unary(&*ctx, op, &Value::from(self))
            }
            None => {
                log::debug!("no language context, evaluating {} of {} natively", op.name(), self.base.name());
                let v = self.value.ok_or(ProxyError::NoActiveContext { op: op.name() })?;
                v.unary(op).map(Value::Number)
            }
        }
    }

    pub fn binary(&self, op: BinaryOp, other: &Value) -> Result<Value> {
        self.dispatch(op, &Value::from(self), other)
    }

    /// `other <op> self`, for a left operand that is not a proxy.
    pub fn rbinary(&self, op: BinaryOp, other: &Value) -> Result<Value> {
        self.dispatch(op, other, &Value::from(self))
    }

    fn dispatch(&self, op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
        if op == BinaryOp::Matmul {
            return Err(ProxyError::UnsupportedOperation {
                op: op.name(),
                operand: format!("number proxy {}", self.base.name()),
            });
        }
        if op.is_comparison() || op.is_logical() {
            return concrete(op, a, b);
        }
        match get_langctx() {
            Some(ctx) => {
                check_owners([a, b])?;
                invoke_binary(&*ctx, op, a, b)
            }
            None => {
                log::debug!("no language context, evaluating {} natively", op.name());
                pyval(a, op.name())?.binary(op, pyval(b, op.name())?)
            }
        }
    }

    /// Unary plus. Records nothing.
    pub fn pos(&self) -> NumberProxy {
        self.clone()
    }

    pub fn matmul(&self, other: impl Into<Value>) -> Result<Value> {
        self.binary(BinaryOp::Matmul, &other.into())
    }

    pub fn rmatmul(&self, other: impl Into<Value>) -> Result<Value> {
        self.rbinary(BinaryOp::Matmul, &other.into())
    }

    /// Succeeds only for int and bool proxies. Casts between kinds belong to
    /// the language context.
    pub fn to_int(&self) -> Result<NumberProxy> {
        self.convert(matches!(self.kind, NumberKind::Bool | NumberKind::Int), "int")
    }

    pub fn to_float(&self) -> Result<NumberProxy> {
        self.convert(self.kind == NumberKind::Float, "float")
    }

    pub fn to_complex(&self) -> Result<NumberProxy> {
        self.convert(self.kind == NumberKind::Complex, "complex")
    }

    fn convert(&self, ok: bool, to: &'static str) -> Result<NumberProxy> {
        if ok {
            Ok(self.clone())
        } else {
            Err(ProxyError::UnsupportedConversion {
                from: self.kind.as_str(),
                to,
            })
        }
    }

    unary_methods! {
        abs => Abs,
        ceil => Ceil,
        floor => Floor,
        invert => Invert,
        neg => Neg,
        round => Round,
        trunc => Trunc,
    }

    binary_methods! {
        add, radd => Add,
        sub, rsub => Sub,
        mul, rmul => Mul,
        true_divide, rtrue_divide => TrueDivide,
        floor_divide, rfloor_divide => FloorDivide,
        modulo, rmodulo => Mod,
        divmod, rdivmod => Divmod,
        pow, rpow => Pow,
        lshift, rlshift => Lshift,
        rshift, rrshift => Rshift,
    }
}

/// Comparisons and logical operators on numbers compare known values and
/// never reach the language context. A tensor operand takes over with its
/// own symbolic operator.
fn concrete(op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    if let Some(t) = b.as_tensor_proxy() {
        return t.rbinary(op, a);
    }
    if let Some(t) = a.as_tensor_proxy() {
        return t.binary(op, b);
    }
    let known = |v: &Value| match v.as_number_proxy() {
        Some(p) => p.value.ok_or_else(|| ProxyError::UnsupportedOperation {
            op: op.name(),
            operand: format!("number proxy {} of unknown value", p.base.name()),
        }),
        None => pyval(v, op.name()),
    };
    known(a)?.binary(op, known(b)?)
}

impl ProxyInterface for NumberProxy {
    fn base(&self) -> &ProxyBase {
        &self.base
    }

    fn type_string(&self) -> String {
        match self.value {
            Some(v) => format!("{} {v}", self.kind),
            None => format!("{} ?", self.kind),
        }
    }

    fn replace_name(&self, name: impl Into<Name>) -> Result<Self> {
        Ok(NumberProxy {
            base: ProxyBase::new(Some(name.into()))?,
            value: self.value,
            kind: self.kind,
        })
    }
}

impl PartialEq for NumberProxy {
    fn eq(&self, other: &Self) -> bool {
        matches!((self.value, other.value), (Some(a), Some(b)) if a == b)
    }
}

impl PartialEq<Number> for NumberProxy {
    fn eq(&self, other: &Number) -> bool {
        self.value.is_some_and(|v| v == *other)
    }
}

impl PartialOrd for NumberProxy {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value?.partial_cmp(&other.value?)
    }
}

/// Hashes as the known value, so a proxy for `5` and the integer `5` land
/// in the same bucket.
impl Hash for NumberProxy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.value {
            Some(v) => v.hash(state),
            None => ().hash(state),
        }
    }
}

macro_rules! native_conversions {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl TryFrom<&NumberProxy> for $ty {
                type Error = ProxyError;

                fn try_from(p: &NumberProxy) -> Result<$ty> {
                    let value = p.value.ok_or(ProxyError::NoActiveContext { op: "convert" })?;
                    match value.coerce(NumberKind::$kind)? {
                        Number::$kind(v) => Ok(v),
                        _ => Err(ProxyError::UnsupportedConversion {
                            from: p.kind.as_str(),
                            to: NumberKind::$kind.as_str(),
                        }),
                    }
                }
            }
        )*
    };
}

native_conversions! {
    bool => Bool,
    i64 => Int,
    f64 => Float,
    Complex64 => Complex,
}

#[cfg(test)]
mod tests {
    use std::{
        hash::{DefaultHasher, Hash, Hasher},
        rc::Rc,
    };

    use num_complex::Complex64;

    use crate::context::Method;
    use crate::prelude::*;

    fn hash_of<T: Hash>(t: &T) -> u64 {
        let mut h = DefaultHasher::new();
        t.hash(&mut h);
        h.finish()
    }

    /// Answers every binary operator with the constant 100.
    struct Constant;

    impl LanguageContext for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn elementwise_unary(&self, _op: UnaryOp, _a: &Value) -> Result<Value> {
            Ok(Value::from(-100))
        }

        fn elementwise_binary(&self, _op: BinaryOp, a: &Value, _b: &Value) -> Result<Value> {
            // Echo the left operand's name so reflected order is observable.
            Ok(match a.as_number_proxy() {
                Some(p) => Value::Tuple(vec![Value::from(100), Value::from(p)]),
                None => Value::from(100),
            })
        }

        fn get_item(&self, a: &Value, _key: &Value) -> Result<Value> {
            Ok(a.clone())
        }

        fn size(&self, _a: &Value) -> Result<Value> {
            Ok(Value::None)
        }

        fn method_lookup(&self, _name: &str) -> Option<Method> {
            None
        }
    }

    #[test]
    fn known_values_evaluate_natively_without_a_context() {
        let (_, (a, b)) = with_trace(|| {
            (
                NumberProxy::integer(None, Some(3)).unwrap(),
                NumberProxy::integer(None, Some(4)).unwrap(),
            )
        });
        let v = a.add(&b).unwrap();
        assert_eq!(v.as_number(), Some(Number::Int(7)));
        assert_eq!((&a * &b).unwrap().as_number(), Some(Number::Int(12)));
    }

    #[test]
    fn an_active_context_receives_the_proxies() {
        let (_, r) = with_trace(|| {
            let a = NumberProxy::integer(None, Some(3))?;
            let b = NumberProxy::integer(None, Some(4))?;
            with_langctx(Rc::new(Constant), || a.add(&b))
        });
        let Value::Tuple(items) = r.unwrap() else {
            panic!("the context's result is returned unchanged");
        };
        assert_eq!(items[0].as_number(), Some(Number::Int(100)));
    }

    #[test]
    fn reflected_operators_swap_operands() {
        let (_, r) = with_trace(|| {
            let a = NumberProxy::integer(Some("a"), None)?;
            with_langctx(Rc::new(Constant), || Ok::<_, ProxyError>((a.radd(2)?, a.add(2)?)))
        });
        let (reflected, plain) = r.unwrap();
        assert_eq!(reflected.as_number(), Some(Number::Int(100)));
        assert!(matches!(plain, Value::Tuple(_)));
    }

    #[test]
    fn unknown_value_without_context_fails() {
        let (_, p) = with_trace(|| NumberProxy::float(None, None).unwrap());
        assert_eq!(p.neg().unwrap_err(), ProxyError::NoActiveContext { op: "neg" });
        assert_eq!(p.sub(1).unwrap_err(), ProxyError::NoActiveContext { op: "sub" });
    }

    #[test]
    fn matmul_is_unsupported() {
        let (_, p) = with_trace(|| NumberProxy::integer(None, Some(2)).unwrap());
        assert!(matches!(
            p.matmul(2),
            Err(ProxyError::UnsupportedOperation { op: "matmul", .. })
        ));
        assert!(matches!(
            p.rmatmul(2),
            Err(ProxyError::UnsupportedOperation { op: "matmul", .. })
        ));
    }

    #[test]
    fn comparisons_and_logical_ops_evaluate_known_values() {
        let (_, r) = with_trace(|| {
            let n = Value::from(NumberProxy::integer(Some("n"), Some(5))?);
            // The context is never consulted for these.
            with_langctx(Rc::new(Constant), || {
                Ok::<_, ProxyError>([
                    ops::binary(BinaryOp::Lt, &n, &Value::from(3))?,
                    ops::binary(BinaryOp::Lt, &Value::from(3), &n)?,
                    ops::binary(BinaryOp::Eq, &n, &Value::from(5.0))?,
                    ops::binary(BinaryOp::LogicalAnd, &n, &Value::from(3))?,
                ])
            })
        });
        let results: Vec<_> = r.unwrap().iter().map(Value::as_number).collect();
        assert_eq!(
            results,
            [Number::Bool(false), Number::Bool(true), Number::Bool(true), Number::Int(1)].map(Some)
        );
    }

    #[test]
    fn comparisons_on_unknown_values_fail() {
        let (_, u) = with_trace(|| NumberProxy::integer(Some("u"), None).unwrap());
        assert!(matches!(
            ops::binary(BinaryOp::Ge, &Value::from(&u), &Value::from(1)),
            Err(ProxyError::UnsupportedOperation { op: "ge", .. })
        ));
    }

    #[test]
    fn a_tensor_operand_takes_over_comparisons() {
        let ctx = Rc::new(RecordingContext::new());
        let (_, r) = with_trace(|| {
            let n = Value::from(NumberProxy::integer(Some("n"), Some(5))?);
            let t = Value::from(
                TensorProxy::builder().name("t").shape([3]).device("cpu").dtype("float32").build()?,
            );
            with_langctx(ctx.clone(), || {
                Ok::<_, ProxyError>((ops::binary(BinaryOp::Lt, &n, &t)?, ops::binary(BinaryOp::Gt, &t, &n)?))
            })
        });
        let (reflected, plain) = r.unwrap();
        for v in [&reflected, &plain] {
            let t = v.as_tensor_proxy().unwrap();
            assert_eq!(t.shape(), &[3]);
            assert_eq!(t.dtype(), DType::BOOL8);
        }
        let graph = ctx.take_graph();
        assert_eq!(graph.nodes.iter().map(|n| n.op.as_str()).collect::<Vec<_>>(), ["lt", "gt"]);
        assert_eq!(graph.nodes[0].args, ["n", "t"]);
    }

    #[test]
    fn hash_matches_the_concrete_value() {
        let (_, p) = with_trace(|| NumberProxy::integer(Some("a"), Some(5)).unwrap());
        assert_eq!(hash_of(&p), hash_of(&5i64));
        let (_, f) = with_trace(|| NumberProxy::float(Some("a"), Some(5.0)).unwrap());
        assert_eq!(hash_of(&f), hash_of(&p));
    }

    #[test]
    fn comparisons_use_known_values() {
        let (_, (a, b, u)) = with_trace(|| {
            (
                NumberProxy::integer(None, Some(2)).unwrap(),
                NumberProxy::float(None, Some(2.0)).unwrap(),
                NumberProxy::integer(None, None).unwrap(),
            )
        });
        assert_eq!(a, b);
        assert_eq!(a, Number::Int(2));
        assert_ne!(u, u.clone());
        assert!(a.partial_cmp(&u).is_none());
    }

    #[test]
    fn conversions_succeed_only_for_the_matching_kind() {
        let (_, (i, f, c, flag)) = with_trace(|| {
            (
                NumberProxy::integer(None, Some(1)).unwrap(),
                NumberProxy::float(None, Some(1.5)).unwrap(),
                NumberProxy::complex(None, Some(Complex64::new(1.0, 2.0))).unwrap(),
                NumberProxy::boolean(None, Some(true)).unwrap(),
            )
        });
        assert!(i.to_int().is_ok());
        assert!(flag.to_int().is_ok());
        assert!(f.to_float().is_ok());
        assert!(c.to_complex().is_ok());
        assert_eq!(
            i.to_float().unwrap_err(),
            ProxyError::UnsupportedConversion { from: "int", to: "float" }
        );
        assert!(c.to_int().is_err());
        assert!(c.to_float().is_err());
        assert!(f.to_int().is_err());
        assert_eq!(i64::try_from(&i), Ok(1));
        assert_eq!(f64::try_from(&i), Ok(1.0));
        assert!(i64::try_from(&f).is_err());
    }

    #[test]
    fn replace_name_keeps_value_and_kind() {
        let (_, r) = with_trace(|| {
            let p = NumberProxy::float(Some("x"), Some(0.5))?;
            p.replace_name("y")
        });
        let q = r.unwrap();
        assert_eq!(q.name(), "y");
        assert_eq!(q.kind(), NumberKind::Float);
        assert_eq!(q.value(), Some(Number::Float(0.5)));
        assert_eq!(q.type_string(), "float 0.5");
    }

    #[test]
    fn values_must_fit_the_kind() {
        let (trace, r) = with_trace(|| NumberProxy::new(Some("z"), NumberKind::Int, Some(Number::Float(1.5))));
        assert!(matches!(r, Err(ProxyError::KindMismatch { kind: NumberKind::Int, .. })));
        assert!(!trace.has_name("z"));
    }

    #[test]
    fn unary_plus_is_identity() {
        let (trace, (p, q)) = with_trace(|| {
            let p = NumberProxy::integer(None, None).unwrap();
            let q = p.pos();
            (p, q)
        });
        assert_eq!(p.name(), q.name());
        assert_eq!(trace.names().count(), 1);
    }
}
