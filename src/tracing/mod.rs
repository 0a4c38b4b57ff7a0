pub mod function;
pub mod trace;

pub use function::{TracedFn, trace_fn};
pub use trace::{
    TraceCtx, TraceGuard, TraceId, add_name, current_trace_id, get_tracectx, make_name, push_trace,
    with_trace, with_trace_ctx,
};
