use std::fmt;

use crate::{
    context::{LanguageContext, Method, get_langctx, invoke_binary, invoke_unary},
    device::{Device, IntoDevice},
    dtype::{DType, IntoDType},
    error::{ProxyError, Result},
    identity::Name,
    ops::{BinaryOp, UnaryOp, binary_methods, comparison_methods, unary_methods},
    proxy::{ProxyBase, ProxyInterface, check_owners},
    value::Value,
};

/// A symbolic tensor.
///
/// `dtype` is always strong; `true_dtype` keeps the dtype as given, which
/// may be weak. `numel` and `ndim` are fixed at construction.
///
/// Every operator requires an active language context. There is no native
/// fallback for tensors.
#[derive(Debug, Clone)]
pub struct TensorProxy {
    base: ProxyBase,
    shape: Vec<usize>,
    device: Device,
    dtype: DType,
    true_dtype: DType,
    numel: usize,
    ndim: usize,
}

/// Collects the fields of a [`TensorProxy`]. Explicit fields override the
/// ones taken from [`like`](TensorProxyBuilder::like); nothing is
/// validated until [`build`](TensorProxyBuilder::build).
#[derive(Default)]
pub struct TensorProxyBuilder {
    name: Option<Name>,
    like: Option<TensorProxy>,
    shape: Option<Vec<i64>>,
    device: Option<Result<Device>>,
    dtype: Option<Result<DType>>,
}

impl TensorProxyBuilder {
    pub fn name(mut self, name: impl Into<Name>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn like(mut self, like: &TensorProxy) -> Self {
        self.like = Some(like.clone());
        self
    }

    pub fn shape(mut self, shape: impl IntoIterator<Item = i64>) -> Self {
        self.shape = Some(shape.into_iter().collect());
        self
    }

    pub fn device(mut self, device: impl IntoDevice) -> Self {
        self.device = Some(device.into_device());
        self
    }

    pub fn dtype(mut self, dtype: impl IntoDType) -> Self {
        self.dtype = Some(dtype.into_dtype());
        self
    }

    /// Validates every field, then registers the name. A failed build
    /// allocates nothing.
    pub fn build(self) -> Result<TensorProxy> {
        let like = self.like.as_ref();

        let shape = match (self.shape, like) {
            (Some(shape), _) => validate_shape(shape)?,
            (None, Some(like)) => like.shape.clone(),
            (None, None) => {
                return Err(ProxyError::InvalidShape {
                    shape: Vec::new(),
                    reason: "no shape given".into(),
                });
            }
        };
        let device = match (self.device, like) {
            (Some(device), _) => device?,
            (None, Some(like)) => like.device,
            (None, None) => return Err(ProxyError::InvalidDevice("no device given".into())),
        };
        let true_dtype = match (self.dtype, like) {
            (Some(dtype), _) => dtype?,
            (None, Some(like)) => like.true_dtype,
            (None, None) => return Err(ProxyError::InvalidDType("no dtype given".into())),
        };

        let numel = shape
            .iter()
            .try_fold(1usize, |acc, &extent| acc.checked_mul(extent))
            .ok_or_else(|| ProxyError::InvalidShape {
                shape: shape.iter().map(|&extent| extent as i64).collect(),
                reason: "numel overflows".into(),
            })?;
        let ndim = shape.len();
        Ok(TensorProxy {
            base: ProxyBase::new(self.name)?,
            shape,
            device,
            dtype: true_dtype.to_strong(),
            true_dtype,
            numel,
            ndim,
        })
    }
}

fn validate_shape(shape: Vec<i64>) -> Result<Vec<usize>> {
    let dims: Option<Vec<usize>> = shape.iter().map(|&extent| usize::try_from(extent).ok()).collect();
    dims.ok_or_else(|| ProxyError::InvalidShape {
        shape,
        reason: "extents must be non-negative".into(),
    })
}

impl TensorProxy {
    pub fn builder() -> TensorProxyBuilder {
        TensorProxyBuilder::default()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn true_dtype(&self) -> DType {
        self.true_dtype
    }

    pub fn numel(&self) -> usize {
        self.numel
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Backend-defined size, as reported by the active context.
    pub fn size(&self) -> Result<Value> {
        let ctx = self.langctx("size")?;
        ctx.size(&Value::from(self))
    }

    /// A language-specific method bound to this proxy.
    pub fn attr(&self, name: &str) -> Result<BoundMethod> {
        let ctx = self.langctx("attr")?;
        let method = ctx
            .method_lookup(name)
            .ok_or_else(|| ProxyError::UnknownAttribute(name.to_string()))?;
        Ok(BoundMethod {
            name: name.to_string(),
            receiver: Value::from(self),
            method,
        })
    }

    pub fn get_item(&self, key: impl Into<Value>) -> Result<Value> {
        let ctx = self.langctx("get_item")?;
        let key = key.into();
        check_owners([&key])?;
        ctx.get_item(&Value::from(self), &key)
    }

    pub fn unary(&self, op: UnaryOp) -> Result<Value> {
        let ctx = self.langctx(op.name())?;
        invoke_unary(&*ctx, op, &Value::from(self))
    }

    pub fn binary(&self, op: BinaryOp, other: &Value) -> Result<Value> {
        let ctx = self.langctx(op.name())?;
        check_owners([other])?;
        invoke_binary(&*ctx, op, &Value::from(self), other)
    }

    /// `other <op> self`, for a left operand that is not a proxy.
    pub fn rbinary(&self, op: BinaryOp, other: &Value) -> Result<Value> {
        let ctx = self.langctx(op.name())?;
        check_owners([other])?;
        invoke_binary(&*ctx, op, other, &Value::from(self))
    }

    /// The active context, after checking this proxy belongs to the active
    /// trace.
    fn langctx(&self, op: &'static str) -> Result<std::rc::Rc<dyn LanguageContext>> {
        let ctx = get_langctx().ok_or(ProxyError::NoActiveContext { op })?;
        self.base.check_owner()?;
        Ok(ctx)
    }

    /// Unary plus. Records nothing.
    pub fn pos(&self) -> TensorProxy {
        self.clone()
    }

    pub fn to_int(&self) -> Result<Value> {
        Err(self.unsupported_conversion("int"))
    }

    pub fn to_float(&self) -> Result<Value> {
        Err(self.unsupported_conversion("float"))
    }

    pub fn to_complex(&self) -> Result<Value> {
        Err(self.unsupported_conversion("complex"))
    }

    fn unsupported_conversion(&self, to: &'static str) -> ProxyError {
        ProxyError::UnsupportedConversion { from: "tensor", to }
    }

    unary_methods! {
        abs => Abs,
        ceil => Ceil,
        floor => Floor,
        invert => Invert,
        neg => Neg,
        round => Round,
        trunc => Trunc,
    }

    binary_methods! {
        add, radd => Add,
        sub, rsub => Sub,
        mul, rmul => Mul,
        true_divide, rtrue_divide => TrueDivide,
        floor_divide, rfloor_divide => FloorDivide,
        modulo, rmodulo => Mod,
        divmod, rdivmod => Divmod,
        pow, rpow => Pow,
        lshift, rlshift => Lshift,
        rshift, rrshift => Rshift,
        matmul, rmatmul => Matmul,
        logical_and, rlogical_and => LogicalAnd,
        logical_or, rlogical_or => LogicalOr,
        logical_xor, rlogical_xor => LogicalXor,
    }

    comparison_methods! {
        eq => Eq,
        ne => Ne,
        lt => Lt,
        le => Le,
        gt => Gt,
        ge => Ge,
    }
}

impl ProxyInterface for TensorProxy {
    fn base(&self) -> &ProxyBase {
        &self.base
    }

    fn type_string(&self) -> String {
        format!("{} {}{:?}", self.device, self.dtype.shortname(), self.shape)
    }

    fn replace_name(&self, name: impl Into<Name>) -> Result<Self> {
        TensorProxy::builder().name(name).like(self).build()
    }
}

/// A language-specific method with its receiver already bound as the first
/// argument.
#[derive(Clone)]
pub struct BoundMethod {
    name: String,
    receiver: Value,
    method: Method,
}

impl BoundMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: impl IntoIterator<Item = Value>) -> Result<Value> {
        let args: Vec<Value> = std::iter::once(self.receiver.clone()).chain(args).collect();
        (self.method)(&args)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundMethod({}.{})", self.receiver, self.name)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use proptest::prelude::*;

    use crate::dtype::ScalarType;
    use crate::prelude::*;

    fn tensor(shape: &[i64]) -> TensorProxy {
        TensorProxy::builder()
            .shape(shape.iter().copied())
            .device("cpu")
            .dtype(DType::FLOAT32)
            .build()
            .unwrap()
    }

    #[test]
    fn derived_fields_follow_the_shape() {
        let (_, (t, s)) = with_trace(|| (tensor(&[2, 3, 4]), tensor(&[])));
        assert_eq!((t.numel(), t.ndim()), (24, 3));
        assert_eq!((s.numel(), s.ndim()), (1, 0));
        assert_eq!(t.type_string(), "cpu f32[2, 3, 4]");
    }

    #[test]
    fn weak_dtypes_are_normalized() {
        let (_, t) = with_trace(|| {
            TensorProxy::builder()
                .shape([2])
                .device(Device::cpu())
                .dtype(DType::weak(ScalarType::Float32))
                .build()
                .unwrap()
        });
        assert_eq!(t.dtype(), DType::FLOAT32);
        assert_eq!(t.true_dtype(), DType::weak(ScalarType::Float32));
        assert!(t.true_dtype().is_weak());
        assert!(!t.dtype().is_weak());
    }

    #[test]
    fn replace_name_preserves_metadata() {
        let (_, r) = with_trace(|| {
            let t = TensorProxy::builder()
                .name("x")
                .shape([2, 3])
                .device("cuda:1")
                .dtype("int64")
                .build()?;
            Ok::<_, ProxyError>((t.clone(), t.replace_name("y")?))
        });
        let (x, y) = r.unwrap();
        assert_eq!(y.name(), "y");
        assert_eq!(y.shape(), x.shape());
        assert_eq!(y.device(), Device::cuda(1));
        assert_eq!(y.dtype(), x.dtype());
        assert_eq!(y.true_dtype(), x.true_dtype());
        assert_eq!((y.numel(), y.ndim()), (6, 2));
    }

    #[test]
    fn explicit_fields_override_like() {
        let (_, r) = with_trace(|| {
            let t = tensor(&[4]);
            TensorProxy::builder().like(&t).shape([1, 4]).dtype("bool8").build()
        });
        let u = r.unwrap();
        assert_eq!(u.shape(), &[1, 4]);
        assert_eq!(u.device(), Device::cpu());
        assert_eq!(u.dtype(), DType::BOOL8);
    }

    #[test]
    fn invalid_fields_construct_nothing() {
        let (trace, errors) = with_trace(|| {
            let base = || TensorProxy::builder().name("bad");
            [
                base().shape([2, -1]).device("cpu").dtype("float32").build(),
                base().shape([2]).device("tpu").dtype("float32").build(),
                base().shape([2]).device("cpu").dtype("float31").build(),
            ]
        });
        let [shape, device, dtype] = errors;
        assert!(matches!(shape, Err(ProxyError::InvalidShape { .. })));
        assert_eq!(device.unwrap_err(), ProxyError::InvalidDevice("tpu".into()));
        assert_eq!(dtype.unwrap_err(), ProxyError::InvalidDType("float31".into()));
        assert_eq!(trace.names().count(), 0);
    }

    #[test]
    fn overflowing_numel_is_rejected_before_naming() {
        let (trace, r) = with_trace(|| {
            TensorProxy::builder()
                .name("huge")
                .shape([1 << 32, 1 << 32, 1 << 32])
                .device("cpu")
                .dtype("float32")
                .build()
        });
        assert!(matches!(
            r,
            Err(ProxyError::InvalidShape { ref reason, .. }) if reason == "numel overflows"
        ));
        assert_eq!(trace.names().count(), 0);
    }

    #[test]
    fn operators_require_a_context() {
        let (_, t) = with_trace(|| tensor(&[2]));
        assert_eq!(t.neg().unwrap_err(), ProxyError::NoActiveContext { op: "neg" });
        assert_eq!(t.add(1).unwrap_err(), ProxyError::NoActiveContext { op: "add" });
        assert!(matches!(t.size(), Err(ProxyError::NoActiveContext { .. })));
        assert!(t.to_float().is_err());
    }

    #[test]
    fn attributes_resolve_through_the_context() {
        let (_, r) = with_trace(|| {
            with_langctx(Rc::new(RecordingContext::new()), || {
                let t = tensor(&[2, 3]);
                let missing = t.attr("frobnicate").unwrap_err();
                let exp = t.attr("exp")?.call([])?;
                Ok::<_, ProxyError>((missing, exp))
            })
        });
        let (missing, exp) = r.unwrap();
        assert_eq!(missing, ProxyError::UnknownAttribute("frobnicate".into()));
        assert_eq!(exp.as_tensor_proxy().map(|t| t.shape().to_vec()), Some(vec![2, 3]));
    }

    proptest! {
        #[test]
        fn numel_is_the_product_of_the_shape(shape in prop::collection::vec(0i64..6, 0..5)) {
            let (_, t) = with_trace(|| tensor(&shape));
            prop_assert_eq!(t.ndim(), shape.len());
            prop_assert_eq!(t.numel() as i64, shape.iter().product::<i64>());
        }
    }
}
