use std::fmt;

use itertools::Itertools;
use num_complex::Complex64;

use crate::{
    error::{ProxyError, Result},
    number::Number,
    proxy::{NumberProxy, Proxy, TensorProxy},
};

/// Concrete tensor representation recognized by the reference context.
pub type TensorData = ndarray::ArrayD<f64>;

/// Anything that can flow into or out of an operator: native values,
/// proxies, and the compound values some operators take or produce.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Number(Number),
    Proxy(Proxy),
    Tensor(TensorData),
    Tuple(Vec<Value>),
    Slice(Slice),
}

/// `start:stop:step` indexing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Slice {
        Slice { start, stop, step }
    }

    /// Number of elements selected from an axis of length `len`.
    pub fn len_for(&self, len: usize, op: &'static str) -> Result<usize> {
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(ProxyError::InvalidOperand {
                op,
                found: "a slice step of zero".into(),
            });
        }
        let clamp = |i: i64, lo: i64, hi: i64| {
            let i = if i < 0 { i.saturating_add(len) } else { i };
            i.clamp(lo, hi)
        };
        // Both ends are clamped into [-1, len], so the span cannot overflow.
        let (first, last) = if step > 0 {
            let start = self.start.map_or(0, |s| clamp(s, 0, len));
            let stop = self.stop.map_or(len, |s| clamp(s, 0, len));
            (start, stop)
        } else {
            let start = self.start.map_or(len - 1, |s| clamp(s, -1, len - 1));
            let stop = self.stop.map_or(-1, |s| clamp(s, -1, len - 1));
            (stop, start)
        };
        if last <= first {
            return Ok(0);
        }
        let span = (last - first - 1).unsigned_abs();
        Ok((span / step.unsigned_abs() + 1) as usize)
    }
}

impl Value {
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Value::Proxy(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_number_proxy(&self) -> Option<&NumberProxy> {
        match self {
            Value::Proxy(Proxy::Number(p)) => Some(p),
            _ => None,
        }
    }

    pub fn as_tensor_proxy(&self) -> Option<&TensorProxy> {
        match self {
            Value::Proxy(Proxy::Tensor(t)) => Some(t),
            _ => None,
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, Value::Proxy(_))
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::None => "None".into(),
            Value::Number(n) => format!("{} {n}", n.kind()),
            Value::Proxy(p) => format!("proxy {p}"),
            Value::Tensor(t) => format!("tensor {:?}", t.shape()),
            Value::Tuple(items) => format!("tuple of {}", items.len()),
            Value::Slice(s) => format!("slice {}", Value::Slice(*s)),
        }
    }
}

/// The concrete number behind `value`, for handing to code that needs a
/// real number rather than a proxy.
pub fn pyval(value: &Value, op: &'static str) -> Result<Number> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Proxy(Proxy::Number(p)) => p.value().ok_or(ProxyError::NoActiveContext { op }),
        other => Err(ProxyError::InvalidOperand {
            op,
            found: other.describe(),
        }),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Proxy(p) => write!(f, "{p}"),
            Value::Tensor(t) => write!(f, "tensor{:?}", t.shape()),
            Value::Tuple(items) => write!(f, "({})", items.iter().join(", ")),
            Value::Slice(s) => {
                let part = |p: Option<i64>| p.map(|i| i.to_string()).unwrap_or_default();
                write!(f, "{}:{}", part(s.start), part(s.stop))?;
                if let Some(step) = s.step {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::None
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Number(b.into())
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Number(i.into())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(i.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(f.into())
    }
}

impl From<Complex64> for Value {
    fn from(c: Complex64) -> Self {
        Value::Number(c.into())
    }
}

impl From<Proxy> for Value {
    fn from(p: Proxy) -> Self {
        Value::Proxy(p)
    }
}

impl From<NumberProxy> for Value {
    fn from(p: NumberProxy) -> Self {
        Value::Proxy(Proxy::Number(p))
    }
}

impl From<&NumberProxy> for Value {
    fn from(p: &NumberProxy) -> Self {
        Value::Proxy(Proxy::Number(p.clone()))
    }
}

impl From<TensorProxy> for Value {
    fn from(t: TensorProxy) -> Self {
        Value::Proxy(Proxy::Tensor(t))
    }
}

impl From<&TensorProxy> for Value {
    fn from(t: &TensorProxy) -> Self {
        Value::Proxy(Proxy::Tensor(t.clone()))
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl From<TensorData> for Value {
    fn from(t: TensorData) -> Self {
        Value::Tensor(t)
    }
}

impl From<Slice> for Value {
    fn from(s: Slice) -> Self {
        Value::Slice(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Tuple(items)
    }
}
