//! Language contexts and the resolver that finds the active one.
//!
//! A language context decides what an operator on a proxy means: usually
//! it records a node and returns a fresh proxy. Proxies never hardcode that
//! behavior; they look the active context up with [`get_langctx`] and call
//! the method named after the operator.

use std::{cell::RefCell, fmt, marker::PhantomData, rc::Rc};

use crate::{
    error::{ProxyError, Result},
    identity::Name,
    ops::{BinaryOp, UnaryOp},
    proxy::TensorProxy,
    value::Value,
};

thread_local! {
    static LANGCTX_STACK: RefCell<Vec<Rc<dyn LanguageContext>>> = RefCell::new(Vec::new());
}

/// A language-specific function, called with the bound receiver first.
pub type Method = Rc<dyn Fn(&[Value]) -> Result<Value>>;

macro_rules! unary_hooks {
    ($($method:ident => $op:ident),* $(,)?) => {
        $(
            fn $method(&self, a: &Value) -> Result<Value> {
                self.elementwise_unary(UnaryOp::$op, a)
            }
        )*
    };
}

macro_rules! binary_hooks {
    ($($method:ident => $op:ident),* $(,)?) => {
        $(
            fn $method(&self, a: &Value, b: &Value) -> Result<Value> {
                self.elementwise_binary(BinaryOp::$op, a, b)
            }
        )*
    };
}

pub trait LanguageContext {
    fn name(&self) -> &str;

    fn elementwise_unary(&self, op: UnaryOp, a: &Value) -> Result<Value>;

    fn elementwise_binary(&self, op: BinaryOp, a: &Value, b: &Value) -> Result<Value>;

    fn get_item(&self, a: &Value, key: &Value) -> Result<Value>;

    fn size(&self, a: &Value) -> Result<Value>;

    /// Resolves a language-specific method applicable to tensor proxies.
    fn method_lookup(&self, name: &str) -> Option<Method>;

    /// Whether `value` is this context's native tensor. Contexts without
    /// tensor support keep the default.
    fn is_tensor(&self, _value: &Value) -> bool {
        false
    }

    fn tensorproxy(&self, _name: Option<Name>, value: &Value) -> Result<TensorProxy> {
        Err(ProxyError::UnsupportedOperation {
            op: "tensorproxy",
            operand: value.describe(),
        })
    }

    unary_hooks! {
        abs => Abs,
        ceil => Ceil,
        floor => Floor,
        invert => Invert,
        neg => Neg,
        round => Round,
        trunc => Trunc,
    }

    binary_hooks! {
        add => Add,
        sub => Sub,
        mul => Mul,
        true_divide => TrueDivide,
        floor_divide => FloorDivide,
        modulo => Mod,
        divmod => Divmod,
        pow => Pow,
        lshift => Lshift,
        rshift => Rshift,
        matmul => Matmul,
        eq => Eq,
        ne => Ne,
        lt => Lt,
        le => Le,
        gt => Gt,
        ge => Ge,
        logical_and => LogicalAnd,
        logical_or => LogicalOr,
        logical_xor => LogicalXor,
    }
}

/// Calls the method of `ctx` named after `op`.
pub fn invoke_unary(ctx: &dyn LanguageContext, op: UnaryOp, a: &Value) -> Result<Value> {
    match op {
        UnaryOp::Abs => ctx.abs(a),
        UnaryOp::Ceil => ctx.ceil(a),
        UnaryOp::Floor => ctx.floor(a),
        UnaryOp::Invert => ctx.invert(a),
        UnaryOp::Neg => ctx.neg(a),
        UnaryOp::Round => ctx.round(a),
        UnaryOp::Trunc => ctx.trunc(a),
    }
}

/// Calls the method of `ctx` named after `op`.
pub fn invoke_binary(ctx: &dyn LanguageContext, op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    match op {
        BinaryOp::Add => ctx.add(a, b),
        BinaryOp::Sub => ctx.sub(a, b),
        BinaryOp::Mul => ctx.mul(a, b),
        BinaryOp::TrueDivide => ctx.true_divide(a, b),
        BinaryOp::FloorDivide => ctx.floor_divide(a, b),
        BinaryOp::Mod => ctx.modulo(a, b),
        BinaryOp::Divmod => ctx.divmod(a, b),
        BinaryOp::Pow => ctx.pow(a, b),
        BinaryOp::Lshift => ctx.lshift(a, b),
        BinaryOp::Rshift => ctx.rshift(a, b),
        BinaryOp::Matmul => ctx.matmul(a, b),
        BinaryOp::Eq => ctx.eq(a, b),
        BinaryOp::Ne => ctx.ne(a, b),
        BinaryOp::Lt => ctx.lt(a, b),
        BinaryOp::Le => ctx.le(a, b),
        BinaryOp::Gt => ctx.gt(a, b),
        BinaryOp::Ge => ctx.ge(a, b),
        BinaryOp::LogicalAnd => ctx.logical_and(a, b),
        BinaryOp::LogicalOr => ctx.logical_or(a, b),
        BinaryOp::LogicalXor => ctx.logical_xor(a, b),
    }
}

/// Pops the language context it was created for when dropped.
pub struct LangCtxGuard {
    depth: usize,
    _not_send: PhantomData<Rc<()>>,
}

impl Drop for LangCtxGuard {
    fn drop(&mut self) {
        LANGCTX_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(stack.len(), self.depth, "language context guards dropped out of order");
            if let Some(ctx) = stack.pop() {
                log::debug!("deactivated language context '{}'", ctx.name());
            }
        });
    }
}

/// Makes `ctx` the active language context until the guard is dropped.
pub fn push_langctx(ctx: Rc<dyn LanguageContext>) -> LangCtxGuard {
    log::debug!("activated language context '{}'", ctx.name());
    let depth = LANGCTX_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        stack.push(ctx);
        stack.len()
    });
    LangCtxGuard {
        depth,
        _not_send: PhantomData,
    }
}

/// Runs `f` with `ctx` as the active language context.
pub fn with_langctx<R>(ctx: Rc<dyn LanguageContext>, f: impl FnOnce() -> R) -> R {
    let guard = push_langctx(ctx);
    let result = f();
    drop(guard);
    result
}

/// The active language context, if any. A pure lookup.
pub fn get_langctx() -> Option<Rc<dyn LanguageContext>> {
    LANGCTX_STACK.with(|stack| stack.borrow().last().cloned())
}

impl fmt::Debug for dyn LanguageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LanguageContext({})", self.name())
    }
}
