//! Name-keyed identity for proxies.
//!
//! Number proxies compare and hash by value, so they cannot key a map by
//! identity. [`Variable`] compares and hashes by name only.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use crate::{proxy::Proxy, value::Value};

#[derive(Debug, Clone)]
pub struct Variable(Proxy);

impl Variable {
    pub fn new(proxy: Proxy) -> Variable {
        Variable(proxy)
    }

    pub fn proxy(&self) -> &Proxy {
        &self.0
    }

    pub fn into_proxy(self) -> Proxy {
        self.0
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.0.name() == other.0.name()
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name().hash(state)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value with any proxy swapped for its [`Variable`].
#[derive(Debug, Clone)]
pub enum Variableified {
    Variable(Variable),
    Value(Value),
}

pub fn variableify(value: Value) -> Variableified {
    match value {
        Value::Proxy(p) => Variableified::Variable(Variable(p)),
        other => Variableified::Value(other),
    }
}

/// The inverse of [`variableify`]; plain values pass through.
pub fn unvariableify(v: Variableified) -> Value {
    match v {
        Variableified::Variable(var) => Value::Proxy(var.into_proxy()),
        Variableified::Value(value) => value,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::prelude::*;

    #[test]
    fn same_name_wraps_equal_regardless_of_value() {
        let (_, a) = with_trace(|| NumberProxy::float(Some("x"), Some(1.0)).unwrap());
        let (_, b) = with_trace(|| NumberProxy::float(Some("x"), Some(2.0)).unwrap());
        assert_ne!(a, b);
        let (va, vb) = (Variable::new(Proxy::Number(a)), Variable::new(Proxy::Number(b)));
        assert_eq!(va, vb);
        let set: HashSet<Variable> = [va, vb].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn different_names_differ_even_with_equal_values() {
        let (_, (a, b)) = with_trace(|| {
            (
                NumberProxy::integer(None, Some(3)).unwrap(),
                NumberProxy::integer(None, Some(3)).unwrap(),
            )
        });
        assert_eq!(a, b);
        assert_ne!(Variable::new(Proxy::Number(a)), Variable::new(Proxy::Number(b)));
    }

    #[test]
    fn unvariableify_passes_plain_values_through() {
        let (_, p) = with_trace(|| NumberProxy::integer(Some("k"), None).unwrap());
        let v = unvariableify(variableify(Value::from(&p)));
        assert_eq!(v.as_number_proxy().map(|p| p.name().to_string()), Some("k".into()));
        assert!(matches!(variableify(Value::from(7)), Variableified::Value(_)));
        let v = unvariableify(variableify(Value::from(7)));
        assert_eq!(v.as_number(), Some(Number::Int(7)));
    }
}
