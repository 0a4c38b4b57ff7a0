use std::rc::Rc;

use crate::{
    context::with_langctx,
    error::{ProxyError, Result},
    factory::proxy,
    graph::Graph,
    recording::RecordingContext,
    tracing::{TraceCtx, with_trace},
    value::Value,
};

/// What running a function under [`trace_fn`] produced.
#[derive(Debug)]
pub struct TracedFn {
    pub graph: Graph,
    pub inputs: Vec<Value>,
    pub output: Value,
    pub trace: TraceCtx,
}

/// Runs `f` on proxies of `args` inside a fresh trace, recording into a
/// new [`RecordingContext`]. Values the factory cannot proxy are passed
/// through unchanged.
pub fn trace_fn<F>(args: Vec<Value>, f: F) -> Result<TracedFn>
where
    F: FnOnce(&[Value]) -> Result<Value>,
{
    let ctx = Rc::new(RecordingContext::new());
    let (trace, result) = with_trace(|| {
        with_langctx(ctx.clone(), || {
            let inputs = args
                .into_iter()
                .map(|arg| proxy(arg, None))
                .collect::<Result<Vec<_>>>()?;
            let output = f(&inputs)?;
            Ok::<_, ProxyError>((inputs, output))
        })
    });
    let (inputs, output) = result?;
    log::debug!("traced {} names into {} nodes", trace.names().count(), ctx.graph().len());
    Ok(TracedFn {
        graph: ctx.take_graph(),
        inputs,
        output,
        trace,
    })
}
