//! Turning concrete values into proxies.

use crate::{
    context::get_langctx,
    error::Result,
    identity::Name,
    number::{Number, NumberKind},
    proxy::NumberProxy,
    value::Value,
};

/// Proxies `value` if it is a number or the active context's native
/// tensor; anything else is returned unchanged.
pub fn proxy(value: Value, name: Option<&str>) -> Result<Value> {
    if let Some(ctx) = get_langctx().filter(|ctx| ctx.is_tensor(&value)) {
        return ctx.tensorproxy(name.map(Name::from), &value).map(Value::from);
    }
    match value {
        Value::Number(n) => NumberProxy::new(name, n.kind(), Some(n)).map(Value::from),
        other => Ok(other),
    }
}

/// A number proxy of `kind`, skipping inspection of `value`.
pub fn numberproxy(kind: NumberKind, value: Option<Number>) -> Result<NumberProxy> {
    NumberProxy::new(None, kind, value)
}

/// Never fails, even when the active context has no tensor type.
pub fn is_proxyable(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        other => get_langctx().is_some_and(|ctx| ctx.is_tensor(other)),
    }
}
