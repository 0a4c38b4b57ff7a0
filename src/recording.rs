//! A language context that records every call into a [`Graph`] and answers
//! with fresh proxies carrying the derived metadata.

use std::{cell::RefCell, rc::Rc};

use crate::{
    context::{LanguageContext, Method},
    device::Device,
    dtype::DType,
    error::{ProxyError, Result},
    graph::Graph,
    identity::Name,
    number::{Number, NumberKind},
    ops::{BinaryOp, UnaryOp},
    proxy::{NumberProxy, TensorProxy},
    value::{Value, pyval},
};

#[derive(Debug, Default)]
pub struct RecordingContext {
    graph: Rc<RefCell<Graph>>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of what has been recorded so far.
    pub fn graph(&self) -> Graph {
        self.graph.borrow().clone()
    }

    pub fn take_graph(&self) -> Graph {
        self.graph.take()
    }

    fn number_unary(&self, op: UnaryOp, p: &NumberProxy) -> Result<Value> {
        let unsupported = || ProxyError::UnsupportedOperation {
            op: op.name(),
            operand: p.kind().to_string(),
        };
        let kind = match (op, p.kind()) {
            (UnaryOp::Abs, NumberKind::Complex) => NumberKind::Float,
            (UnaryOp::Abs | UnaryOp::Neg, kind) => kind.promote(NumberKind::Int),
            (_, NumberKind::Complex) => return Err(unsupported()),
            (UnaryOp::Invert, NumberKind::Float) => return Err(unsupported()),
            _ => NumberKind::Int,
        };
        let out = Value::from(NumberProxy::new(None, kind, None)?);
        record(&self.graph, op.name(), &[&Value::from(p)], out)
    }

    fn number_binary(&self, op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
        let (ka, kb) = (number_kind(op.name(), a)?, number_kind(op.name(), b)?);
        let promoted = ka.promote(kb);
        let unsupported = || ProxyError::UnsupportedOperation {
            op: op.name(),
            operand: format!("{ka} and {kb}"),
        };
        let kind = match op {
            _ if op.is_comparison() => NumberKind::Bool,
            _ if op.is_logical() => match promoted {
                NumberKind::Bool | NumberKind::Int => promoted,
                _ => return Err(unsupported()),
            },
            BinaryOp::Matmul => return Err(unsupported()),
            BinaryOp::TrueDivide => promoted.promote(NumberKind::Float),
            BinaryOp::Lshift | BinaryOp::Rshift if promoted > NumberKind::Int => {
                return Err(unsupported());
            }
            BinaryOp::FloorDivide | BinaryOp::Mod | BinaryOp::Divmod
                if promoted == NumberKind::Complex =>
            {
                return Err(unsupported());
            }
            _ => promoted.promote(NumberKind::Int),
        };
        let out = if op == BinaryOp::Divmod {
            Value::Tuple(vec![
                NumberProxy::new(None, kind, None)?.into(),
                NumberProxy::new(None, kind, None)?.into(),
            ])
        } else {
            NumberProxy::new(None, kind, None)?.into()
        };
        record(&self.graph, op.name(), &[a, b], out)
    }

    fn tensor_binary(&self, op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
        let (lhs, rhs) = (a.as_tensor_proxy(), b.as_tensor_proxy());
        let t = lhs.or(rhs).ok_or_else(|| invalid(op.name(), a))?;
        for operand in [a, b] {
            if operand.as_tensor_proxy().is_none() {
                number_kind(op.name(), operand)?;
            }
        }

        let shape = match (op, lhs, rhs) {
            (BinaryOp::Matmul, Some(l), Some(r)) => matmul_shape(l.shape(), r.shape())?,
            (BinaryOp::Matmul, ..) => {
                return Err(ProxyError::UnsupportedOperation {
                    op: "matmul",
                    operand: "a scalar".into(),
                });
            }
            (_, Some(l), Some(r)) if l.shape() != r.shape() => {
                return Err(ProxyError::ShapeMismatch {
                    op: op.name(),
                    lhs: l.shape().to_vec(),
                    rhs: r.shape().to_vec(),
                });
            }
            _ => t.shape().to_vec(),
        };

        let dtype = t.true_dtype();
        let dtype = if op.is_comparison() || op.is_logical() {
            DType::BOOL8
        } else if op == BinaryOp::TrueDivide && !(dtype.is_float() || dtype.is_complex()) {
            DType::FLOAT32
        } else {
            dtype
        };

        let result = || -> Result<Value> {
            TensorProxy::builder()
                .like(t)
                .shape(shape.iter().map(|&d| d as i64))
                .dtype(dtype)
                .build()
                .map(Value::from)
        };
        let out = if op == BinaryOp::Divmod {
            Value::Tuple(vec![result()?, result()?])
        } else {
            result()?
        };
        record(&self.graph, op.name(), &[a, b], out)
    }
}

impl LanguageContext for RecordingContext {
    fn name(&self) -> &str {
        "recording"
    }

    fn elementwise_unary(&self, op: UnaryOp, a: &Value) -> Result<Value> {
        if let Value::Number(n) = a {
            return n.unary(op).map(Value::Number);
        }
        match (a.as_number_proxy(), a.as_tensor_proxy()) {
            (Some(p), _) => self.number_unary(op, p),
            (_, Some(t)) => {
                let out = TensorProxy::builder().like(t).build()?;
                record(&self.graph, op.name(), &[a], out.into())
            }
            _ => Err(invalid(op.name(), a)),
        }
    }

    fn elementwise_binary(&self, op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
        if a.as_tensor_proxy().is_some() || b.as_tensor_proxy().is_some() {
            self.tensor_binary(op, a, b)
        } else if a.as_number_proxy().is_some() || b.as_number_proxy().is_some() {
            self.number_binary(op, a, b)
        } else {
            pyval(a, op.name())?.binary(op, pyval(b, op.name())?)
        }
    }

    /// Supports integer, slice and `None` keys, or a tuple of them.
    fn get_item(&self, a: &Value, key: &Value) -> Result<Value> {
        let t = a.as_tensor_proxy().ok_or_else(|| ProxyError::UnsupportedOperation {
            op: "get_item",
            operand: a.describe(),
        })?;
        let keys = match key {
            Value::Tuple(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };

        let mut dims = t.shape().iter().copied();
        let mut shape = Vec::new();
        for k in keys {
            if matches!(k, Value::None) {
                shape.push(1);
                continue;
            }
            let len = dims.next().ok_or_else(|| ProxyError::InvalidOperand {
                op: "get_item",
                found: format!("too many indices for a tensor of rank {}", t.ndim()),
            })?;
            match k {
                Value::Slice(s) => shape.push(s.len_for(len, "get_item")?),
                Value::Number(_) => {
                    let i = int_value("get_item", k)?;
                    let len = len as i64;
                    if i < -len || i >= len {
                        return Err(ProxyError::InvalidOperand {
                            op: "get_item",
                            found: format!("index {i} for an axis of length {len}"),
                        });
                    }
                }
                _ if number_kind("get_item", k)? <= NumberKind::Int => {}
                _ => return Err(invalid("get_item", k)),
            }
        }
        shape.extend(dims);

        let out = tensor_like(t, &shape)?;
        record(&self.graph, "get_item", &[a, key], out)
    }

    fn size(&self, a: &Value) -> Result<Value> {
        let t = a.as_tensor_proxy().ok_or_else(|| ProxyError::UnsupportedOperation {
            op: "size",
            operand: a.describe(),
        })?;
        Ok(Value::Tuple(t.shape().iter().map(|&d| Value::from(d as i64)).collect()))
    }

    fn method_lookup(&self, name: &str) -> Option<Method> {
        let graph = self.graph.clone();
        let method: Method = match name {
            "exp" => Rc::new(move |args: &[Value]| elementwise(&graph, "exp", args)),
            "log" => Rc::new(move |args: &[Value]| elementwise(&graph, "log", args)),
            "relu" => Rc::new(move |args: &[Value]| elementwise(&graph, "relu", args)),
            "sum" => Rc::new(move |args: &[Value]| reduction(&graph, "sum", args)),
            "mean" => Rc::new(move |args: &[Value]| reduction(&graph, "mean", args)),
            "reshape" => Rc::new(move |args: &[Value]| reshape(&graph, args)),
            "t" => Rc::new(move |args: &[Value]| transpose(&graph, args)),
            _ => return None,
        };
        Some(method)
    }

    fn is_tensor(&self, value: &Value) -> bool {
        matches!(value, Value::Tensor(_))
    }

    fn tensorproxy(&self, name: Option<Name>, value: &Value) -> Result<TensorProxy> {
        let Value::Tensor(data) = value else {
            return Err(ProxyError::UnsupportedOperation {
                op: "tensorproxy",
                operand: value.describe(),
            });
        };
        let builder = TensorProxy::builder()
            .shape(data.shape().iter().map(|&d| d as i64))
            .device(Device::cpu())
            .dtype(DType::FLOAT64);
        match name {
            Some(name) => builder.name(name).build(),
            None => builder.build(),
        }
    }
}

fn record(graph: &RefCell<Graph>, op: &str, args: &[&Value], out: Value) -> Result<Value> {
    graph.borrow_mut().record(op, args, &out);
    Ok(out)
}

fn invalid(op: &'static str, found: &Value) -> ProxyError {
    ProxyError::InvalidOperand {
        op,
        found: found.describe(),
    }
}

fn number_kind(op: &'static str, v: &Value) -> Result<NumberKind> {
    match v {
        Value::Number(n) => Ok(n.kind()),
        _ => v.as_number_proxy().map(NumberProxy::kind).ok_or_else(|| invalid(op, v)),
    }
}

fn int_value(op: &'static str, v: &Value) -> Result<i64> {
    match pyval(v, op)? {
        Number::Bool(b) => Ok(b as i64),
        Number::Int(i) => Ok(i),
        _ => Err(invalid(op, v)),
    }
}

fn tensor_like(t: &TensorProxy, shape: &[usize]) -> Result<Value> {
    TensorProxy::builder()
        .like(t)
        .shape(shape.iter().map(|&d| d as i64))
        .build()
        .map(Value::from)
}

fn tensor_arg<'a>(op: &'static str, args: &'a [Value]) -> Result<&'a TensorProxy> {
    match args.first() {
        Some(first) => first.as_tensor_proxy().ok_or_else(|| invalid(op, first)),
        None => Err(ProxyError::InvalidOperand {
            op,
            found: "no receiver".into(),
        }),
    }
}

fn axis(op: &'static str, dim: i64, ndim: usize) -> Result<usize> {
    let n = ndim as i64;
    let d = if dim < 0 { dim + n } else { dim };
    if (0..n).contains(&d) {
        Ok(d as usize)
    } else {
        Err(ProxyError::InvalidOperand {
            op,
            found: format!("dimension {dim} for a tensor of rank {ndim}"),
        })
    }
}

/// `(n, k) @ (k, m)`, with rank-1 operands treated as vectors.
fn matmul_shape(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>> {
    let mismatch = || ProxyError::ShapeMismatch {
        op: "matmul",
        lhs: lhs.to_vec(),
        rhs: rhs.to_vec(),
    };
    let (rows, k1) = match lhs {
        [k] => (None, *k),
        [n, k] => (Some(*n), *k),
        _ => return Err(mismatch()),
    };
    let (k2, cols) = match rhs {
        [k] => (*k, None),
        [k, m] => (*k, Some(*m)),
        _ => return Err(mismatch()),
    };
    if k1 != k2 {
        return Err(mismatch());
    }
    Ok(rows.into_iter().chain(cols).collect())
}

fn elementwise(graph: &RefCell<Graph>, op: &'static str, args: &[Value]) -> Result<Value> {
    let t = tensor_arg(op, args)?;
    let dtype = if t.dtype().is_float() || t.dtype().is_complex() {
        t.true_dtype()
    } else {
        DType::FLOAT32
    };
    let out = TensorProxy::builder().like(t).dtype(dtype).build()?;
    record(graph, op, &args.iter().collect::<Vec<_>>(), out.into())
}

/// Reduces over the dimension given as the second argument, or over all
/// of them.
fn reduction(graph: &RefCell<Graph>, op: &'static str, args: &[Value]) -> Result<Value> {
    let t = tensor_arg(op, args)?;
    let shape = match args.get(1) {
        Some(dim) => {
            let dim = axis(op, int_value(op, dim)?, t.ndim())?;
            let mut shape = t.shape().to_vec();
            shape.remove(dim);
            shape
        }
        None => Vec::new(),
    };
    let out = tensor_like(t, &shape)?;
    record(graph, op, &args.iter().collect::<Vec<_>>(), out)
}

fn reshape(graph: &RefCell<Graph>, args: &[Value]) -> Result<Value> {
    let t = tensor_arg("reshape", args)?;
    let dims = match args.get(1..) {
        Some([Value::Tuple(items)]) => items.as_slice(),
        Some(rest) => rest,
        None => &[],
    };
    let shape = dims
        .iter()
        .map(|d| int_value("reshape", d))
        .collect::<Result<Vec<_>>>()?;
    let numel = shape
        .iter()
        .try_fold(1i64, |acc, &d| if d < 0 { None } else { acc.checked_mul(d) });
    if numel.and_then(|n| usize::try_from(n).ok()) != Some(t.numel()) {
        return Err(ProxyError::InvalidShape {
            shape,
            reason: format!("cannot reshape {} elements", t.numel()),
        });
    }
    let out = TensorProxy::builder().like(t).shape(shape).build()?;
    record(graph, "reshape", &args.iter().collect::<Vec<_>>(), out.into())
}

fn transpose(graph: &RefCell<Graph>, args: &[Value]) -> Result<Value> {
    let t = tensor_arg("t", args)?;
    if t.ndim() > 2 {
        return Err(ProxyError::UnsupportedOperation {
            op: "t",
            operand: format!("a tensor of rank {}", t.ndim()),
        });
    }
    let shape: Vec<usize> = t.shape().iter().rev().copied().collect();
    let out = tensor_like(t, &shape)?;
    record(graph, "t", &args.iter().collect::<Vec<_>>(), out)
}
