//! The name context of a trace and the thread-local stack of active traces.
//!
//! Entering a trace pushes it; the returned [`TraceGuard`] pops it on drop,
//! so early returns, `?` and panics all restore the enclosing trace. Nested
//! traces shadow outer ones. Each thread owns an independent stack.

use std::{
    cell::RefCell,
    collections::HashSet,
    fmt,
    marker::PhantomData,
    rc::Rc,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::{
    error::{ProxyError, Result},
    identity::{Name, NameGenerator, generators::Counter},
};

static NEXT_TRACE_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static TRACE_STACK: RefCell<Vec<Rc<RefCell<TraceCtx>>>> = const { RefCell::new(Vec::new()) };
}

/// Process-unique identity of a trace, used to tag the proxies it owns.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TraceId(usize);

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registry of the names allocated in one trace.
pub struct TraceCtx {
    id: TraceId,
    names: HashSet<Name>,
    generator: Box<dyn NameGenerator>,
}

impl TraceCtx {
    pub fn new() -> Self {
        Self::with_generator(Counter::new())
    }

    pub fn with_generator(generator: impl NameGenerator + 'static) -> Self {
        Self {
            id: TraceId(NEXT_TRACE_ID.fetch_add(1, Ordering::Relaxed)),
            names: HashSet::new(),
            generator: Box::new(generator),
        }
    }

    pub fn id(&self) -> TraceId {
        self.id
    }

    /// Returns a name never before seen in this trace.
    pub fn make_name(&mut self) -> Name {
        loop {
            let candidate = self.generator.fresh();
            if self.names.insert(candidate.clone()) {
                log::trace!("trace {}: allocated name {candidate}", self.id);
                return candidate;
            }
        }
    }

    /// Registers a caller-chosen name.
    pub fn add_name(&mut self, name: Name) -> Result<()> {
        if self.names.contains(&name) {
            return Err(ProxyError::DuplicateName(name.to_string()));
        }
        log::trace!("trace {}: registered name {name}", self.id);
        self.names.insert(name);
        Ok(())
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.names.iter()
    }
}

impl Default for TraceCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TraceCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceCtx")
            .field("id", &self.id)
            .field("names", &self.names.len())
            .finish()
    }
}

/// Pops the trace it was created for when dropped.
pub struct TraceGuard {
    id: TraceId,
    _not_send: PhantomData<Rc<()>>,
}

impl Drop for TraceGuard {
    fn drop(&mut self) {
        TRACE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert!(
                popped
                    .as_ref()
                    .is_some_and(|t| t.try_borrow().map_or(true, |t| t.id == self.id)),
                "trace guards dropped out of order"
            );
        });
        log::trace!("left trace {}", self.id);
    }
}

/// Makes `trace` the innermost active trace until the guard is dropped.
pub fn push_trace(trace: TraceCtx) -> (Rc<RefCell<TraceCtx>>, TraceGuard) {
    let id = trace.id;
    let trace = Rc::new(RefCell::new(trace));
    TRACE_STACK.with(|stack| stack.borrow_mut().push(trace.clone()));
    log::trace!("entered trace {id}");
    (
        trace,
        TraceGuard {
            id,
            _not_send: PhantomData,
        },
    )
}

/// Runs `f` inside a fresh trace and hands the trace back with the result.
pub fn with_trace<R>(f: impl FnOnce() -> R) -> (TraceCtx, R) {
    with_trace_ctx(TraceCtx::new(), f)
}

pub fn with_trace_ctx<R>(trace: TraceCtx, f: impl FnOnce() -> R) -> (TraceCtx, R) {
    let (trace, guard) = push_trace(trace);
    let result = f();
    drop(guard);
    let trace = Rc::try_unwrap(trace)
        .map(RefCell::into_inner)
        .unwrap_or_else(|shared| shared.replace(TraceCtx::new()));
    (trace, result)
}

/// The innermost active trace.
pub fn get_tracectx() -> Result<Rc<RefCell<TraceCtx>>> {
    TRACE_STACK
        .with(|stack| stack.borrow().last().cloned())
        .ok_or(ProxyError::NoActiveTrace)
}

pub fn current_trace_id() -> Option<TraceId> {
    TRACE_STACK.with(|stack| stack.borrow().last().map(|t| t.borrow().id))
}

pub fn make_name() -> Result<Name> {
    Ok(get_tracectx()?.borrow_mut().make_name())
}

pub fn add_name(name: Name) -> Result<()> {
    get_tracectx()?.borrow_mut().add_name(name)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use crate::prelude::*;
    use crate::tracing::{add_name, current_trace_id, make_name};

    #[test]
    fn no_trace_no_names() {
        assert_eq!(make_name(), Err(ProxyError::NoActiveTrace));
        assert_eq!(add_name("x".into()), Err(ProxyError::NoActiveTrace));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let (_, r) = with_trace(|| {
            add_name("x".into())?;
            add_name("x".into())
        });
        assert_eq!(r, Err(ProxyError::DuplicateName("x".into())));
    }

    #[test]
    fn generated_names_skip_registered_ones() {
        let (trace, names) = with_trace(|| {
            add_name("t1".into()).unwrap();
            (make_name().unwrap(), make_name().unwrap())
        });
        assert_eq!(names.0, "t0");
        assert_eq!(names.1, "t2");
        assert!(trace.has_name("t1"));
    }

    #[test]
    fn nested_traces_shadow_and_restore() {
        assert_eq!(current_trace_id(), None);
        let (outer, (outer_id, inner_id, restored)) = with_trace(|| {
            let outer_id = current_trace_id();
            let (_, inner_id) = with_trace(current_trace_id);
            (outer_id, inner_id, current_trace_id())
        });
        assert_eq!(outer_id, Some(outer.id()));
        assert_ne!(inner_id, outer_id);
        assert_eq!(restored, outer_id);
        assert_eq!(current_trace_id(), None);
    }

    #[test]
    fn trace_is_popped_on_panic() {
        let r = std::panic::catch_unwind(|| {
            let _: (TraceCtx, ()) = with_trace(|| panic!("boom"));
        });
        assert!(r.is_err());
        assert_eq!(current_trace_id(), None);
    }

    proptest! {
        #[test]
        fn allocated_names_are_unique(n in 1usize..200) {
            let (_, names) = with_trace(|| {
                (0..n).map(|_| make_name().unwrap()).collect::<Vec<_>>()
            });
            let unique: HashSet<_> = names.iter().collect();
            prop_assert_eq!(unique.len(), n);
        }
    }
}
