//! Symbolic proxies for tracing tensor programs.
//!
//! A proxy stands in for a number or a tensor while a program runs under a
//! trace. Operators on proxies are handed to the active
//! [`LanguageContext`](context::LanguageContext), which records them and
//! answers with new proxies. With no context active, number proxies with a
//! known value evaluate natively.
//!
//! ```rust,ignore
//! use symtrace::prelude::*;
//! use ndarray::ArrayD;
//!
//! #[symbolic]
//! fn affine(x: Value, w: Value, b: Value) -> Result<Value> {
//!     Ok(x * w + b)
//! }
//!
//! fn main() -> Result<()> {
//!     // Plain numbers are computed.
//!     let v = affine(2.into(), 3.into(), 1.into())?;
//!     assert_eq!(v.as_number(), Some(Number::Int(7)));
//!
//!     // Under trace_fn the same function is recorded.
//!     let x = Value::from(ArrayD::<f64>::zeros(vec![3]));
//!     let traced = trace_fn(vec![x, 2.0.into(), 1.0.into()], |args| {
//!         affine(args[0].clone(), args[1].clone(), args[2].clone())
//!     })?;
//!     print!("{}", traced.graph);
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod device;
pub mod dtype;
pub mod error;
pub mod factory;
pub mod graph;
pub mod identity;
pub mod number;
pub mod ops;
pub mod proxy;
pub mod recording;
pub mod tracing;
pub mod value;
pub mod variable;

pub use symtrace_macros::symbolic;

pub mod prelude {
    pub use crate::{
        context::{LanguageContext, with_langctx},
        device::{Device, DeviceType},
        dtype::{DType, DTypeLike, ScalarType, numbertype_to_dtype},
        error::{ProxyError, Result},
        factory::{is_proxyable, numberproxy, proxy},
        graph::{Graph, Node},
        identity::{Name, NameGenerator, generators::Counter},
        number::{Number, NumberKind},
        ops::{self, BinaryOp, UnaryOp},
        proxy::{AnyProxy, BoundMethod, NumberProxy, Proxy, ProxyInterface, TensorProxy},
        recording::RecordingContext,
        symbolic,
        tracing::{TraceCtx, TracedFn, trace_fn, with_trace, with_trace_ctx},
        value::{Slice, TensorData, Value, pyval},
        variable::{Variable, Variableified, unvariableify, variableify},
    };
}
