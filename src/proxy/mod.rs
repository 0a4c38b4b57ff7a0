//! Symbolic placeholders for numbers and tensors.
//!
//! Every proxy carries a [`ProxyBase`]: its name, unique within the trace
//! that allocated it, and the id of that trace.

mod number;
mod tensor;

use std::fmt;

pub use number::NumberProxy;
pub use tensor::{BoundMethod, TensorProxy, TensorProxyBuilder};

use crate::{
    error::{ProxyError, Result},
    identity::Name,
    ops::{BinaryOp, UnaryOp},
    tracing::{TraceId, current_trace_id, get_tracectx},
    value::Value,
};

/// Name and owning trace shared by all proxy variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyBase {
    name: Name,
    owner: TraceId,
}

impl ProxyBase {
    /// Allocates a fresh name from the active trace, or registers `name`.
    pub(crate) fn new(name: Option<Name>) -> Result<Self> {
        let trace = get_tracectx()?;
        let mut trace = trace.borrow_mut();
        let name = match name {
            Some(name) => {
                trace.add_name(name.clone())?;
                name
            }
            None => trace.make_name(),
        };
        Ok(ProxyBase {
            name,
            owner: trace.id(),
        })
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn owner(&self) -> TraceId {
        self.owner
    }

    /// Fails when a trace other than the owner is active.
    pub(crate) fn check_owner(&self) -> Result<()> {
        match current_trace_id() {
            Some(current) if current != self.owner => Err(ProxyError::StaleProxy {
                name: self.name.to_string(),
                owner: self.owner,
                current,
            }),
            _ => Ok(()),
        }
    }
}

/// Contract shared by every proxy variant.
pub trait ProxyInterface: Sized {
    fn base(&self) -> &ProxyBase;

    /// Human-readable type summary for diagnostics.
    fn type_string(&self) -> String;

    /// A copy of this proxy under `name`, registered in the active trace.
    fn replace_name(&self, name: impl Into<Name>) -> Result<Self>;

    fn name(&self) -> &Name {
        self.base().name()
    }

    fn owner(&self) -> TraceId {
        self.base().owner()
    }
}

/// A proxy with no type information.
#[derive(Debug, Clone)]
pub struct AnyProxy {
    base: ProxyBase,
}

impl AnyProxy {
    pub fn new(name: Option<&str>) -> Result<Self> {
        Ok(AnyProxy {
            base: ProxyBase::new(name.map(Name::from))?,
        })
    }
}

impl ProxyInterface for AnyProxy {
    fn base(&self) -> &ProxyBase {
        &self.base
    }

    fn type_string(&self) -> String {
        "Any".to_string()
    }

    fn replace_name(&self, name: impl Into<Name>) -> Result<Self> {
        Ok(AnyProxy {
            base: ProxyBase::new(Some(name.into()))?,
        })
    }
}

#[derive(Debug, Clone)]
pub enum Proxy {
    Any(AnyProxy),
    Number(NumberProxy),
    Tensor(TensorProxy),
}

impl Proxy {
    pub fn name(&self) -> &Name {
        self.base().name()
    }

    pub fn base(&self) -> &ProxyBase {
        match self {
            Proxy::Any(p) => p.base(),
            Proxy::Number(p) => p.base(),
            Proxy::Tensor(p) => p.base(),
        }
    }

    pub fn type_string(&self) -> String {
        match self {
            Proxy::Any(p) => p.type_string(),
            Proxy::Number(p) => p.type_string(),
            Proxy::Tensor(p) => p.type_string(),
        }
    }

    pub fn replace_name(&self, name: impl Into<Name>) -> Result<Proxy> {
        Ok(match self {
            Proxy::Any(p) => Proxy::Any(p.replace_name(name)?),
            Proxy::Number(p) => Proxy::Number(p.replace_name(name)?),
            Proxy::Tensor(p) => Proxy::Tensor(p.replace_name(name)?),
        })
    }

    pub fn unary(&self, op: UnaryOp) -> Result<Value> {
        match self {
            Proxy::Number(p) => p.unary(op),
            Proxy::Tensor(p) => p.unary(op),
            Proxy::Any(p) => Err(unsupported_on_any(op.name(), p)),
        }
    }

    pub fn binary(&self, op: BinaryOp, other: &Value) -> Result<Value> {
        match self {
            Proxy::Number(p) => p.binary(op, other),
            Proxy::Tensor(p) => p.binary(op, other),
            Proxy::Any(p) => Err(unsupported_on_any(op.name(), p)),
        }
    }

    pub fn rbinary(&self, op: BinaryOp, other: &Value) -> Result<Value> {
        match self {
            Proxy::Number(p) => p.rbinary(op, other),
            Proxy::Tensor(p) => p.rbinary(op, other),
            Proxy::Any(p) => Err(unsupported_on_any(op.name(), p)),
        }
    }
}

fn unsupported_on_any(op: &'static str, p: &AnyProxy) -> ProxyError {
    ProxyError::UnsupportedOperation {
        op,
        operand: format!("untyped proxy {}", p.name()),
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Checks that every proxy among `values` belongs to the active trace.
pub(crate) fn check_owners<'a>(values: impl IntoIterator<Item = &'a Value>) -> Result<()> {
    values
        .into_iter()
        .filter_map(Value::as_proxy)
        .try_for_each(|p| p.base().check_owner())
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn explicit_names_are_registered_once() {
        let (trace, r) = with_trace(|| {
            let a = AnyProxy::new(Some("a"))?;
            let dup = AnyProxy::new(Some("a"));
            Ok::<_, ProxyError>((a, dup))
        });
        let (a, dup) = r.unwrap();
        assert_eq!(a.name(), "a");
        assert_eq!(a.type_string(), "Any");
        assert_eq!(dup.unwrap_err(), ProxyError::DuplicateName("a".into()));
        assert!(trace.has_name("a"));
    }

    #[test]
    fn construction_requires_a_trace() {
        assert_eq!(AnyProxy::new(None).unwrap_err(), ProxyError::NoActiveTrace);
    }

    #[test]
    fn proxies_from_another_trace_are_rejected() {
        let (_, p) = with_trace(|| NumberProxy::integer(Some("x"), Some(1)).unwrap());
        let (_, r) = with_trace(|| with_langctx(std::rc::Rc::new(RecordingContext::new()), || p.add(1)));
        assert!(matches!(r, Err(ProxyError::StaleProxy { ref name, .. }) if name == "x"));
    }

    #[test]
    fn untyped_proxies_support_no_operators() {
        let (_, r) = with_trace(|| {
            let p = Value::from(Proxy::Any(AnyProxy::new(None)?));
            ops::binary(BinaryOp::Add, &p, &Value::from(1))
        });
        assert!(matches!(r, Err(ProxyError::UnsupportedOperation { op: "add", .. })));
    }
}
