use thiserror::Error;

use crate::{number::NumberKind, tracing::TraceId};

/// Every failure this crate reports. All of them are usage errors surfaced
/// to the caller immediately; none are transient.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProxyError {
    #[error("no active trace")]
    NoActiveTrace,

    #[error("name '{0}' is already registered in the active trace")]
    DuplicateName(String),

    #[error("cannot evaluate '{op}': no active language context and no known value")]
    NoActiveContext { op: &'static str },

    #[error("invalid shape {shape:?}: {reason}")]
    InvalidShape { shape: Vec<i64>, reason: String },

    #[error("invalid device: {0}")]
    InvalidDevice(String),

    #[error("invalid dtype: {0}")]
    InvalidDType(String),

    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("cannot convert a {from} proxy to {to}")]
    UnsupportedConversion { from: &'static str, to: &'static str },

    #[error("'{op}' is not supported on {operand}")]
    UnsupportedOperation { op: &'static str, operand: String },

    #[error("proxy '{name}' belongs to trace {owner}, but trace {current} is active")]
    StaleProxy {
        name: String,
        owner: TraceId,
        current: TraceId,
    },

    #[error("'{op}' expected a number, found {found}")]
    InvalidOperand { op: &'static str, found: String },

    #[error("division by zero in '{op}'")]
    ZeroDivision { op: &'static str },

    #[error("integer overflow in '{op}'")]
    Overflow { op: &'static str },

    #[error("value {value} is not representable as {kind}")]
    KindMismatch { kind: NumberKind, value: String },

    #[error("shape mismatch in '{op}': {lhs:?} vs {rhs:?}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },
}

pub type Result<T, E = ProxyError> = std::result::Result<T, E>;
