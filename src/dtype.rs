//! Element types for tensor proxies.
//!
//! Every dtype exists in a strong form and a weak form. A weak dtype comes
//! from an unannotated number literal and should not override a dtype
//! inferred elsewhere; [`DType::to_strong`] normalizes it.

use std::{fmt, str::FromStr};

use crate::{
    error::{ProxyError, Result},
    number::NumberKind,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool8,
    Uint8,
    Int8,
    Int16,
    Int32,
    Int64,
    BFloat16,
    Float16,
    Float32,
    Float64,
    Complex32,
    Complex64,
    Complex128,
}

impl ScalarType {
    pub const ALL: [ScalarType; 13] = [
        ScalarType::Bool8,
        ScalarType::Uint8,
        ScalarType::Int8,
        ScalarType::Int16,
        ScalarType::Int32,
        ScalarType::Int64,
        ScalarType::BFloat16,
        ScalarType::Float16,
        ScalarType::Float32,
        ScalarType::Float64,
        ScalarType::Complex32,
        ScalarType::Complex64,
        ScalarType::Complex128,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ScalarType::Bool8 => "bool8",
            ScalarType::Uint8 => "uint8",
            ScalarType::Int8 => "int8",
            ScalarType::Int16 => "int16",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::BFloat16 => "bfloat16",
            ScalarType::Float16 => "float16",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
            ScalarType::Complex32 => "complex32",
            ScalarType::Complex64 => "complex64",
            ScalarType::Complex128 => "complex128",
        }
    }

    pub const fn shortname(self) -> &'static str {
        match self {
            ScalarType::Bool8 => "b8",
            ScalarType::Uint8 => "u8",
            ScalarType::Int8 => "i8",
            ScalarType::Int16 => "i16",
            ScalarType::Int32 => "i32",
            ScalarType::Int64 => "i64",
            ScalarType::BFloat16 => "bf16",
            ScalarType::Float16 => "f16",
            ScalarType::Float32 => "f32",
            ScalarType::Float64 => "f64",
            ScalarType::Complex32 => "c32",
            ScalarType::Complex64 => "c64",
            ScalarType::Complex128 => "c128",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DType {
    scalar: ScalarType,
    weak: bool,
}

impl DType {
    pub const BOOL8: DType = DType::strong(ScalarType::Bool8);
    pub const UINT8: DType = DType::strong(ScalarType::Uint8);
    pub const INT8: DType = DType::strong(ScalarType::Int8);
    pub const INT16: DType = DType::strong(ScalarType::Int16);
    pub const INT32: DType = DType::strong(ScalarType::Int32);
    pub const INT64: DType = DType::strong(ScalarType::Int64);
    pub const BFLOAT16: DType = DType::strong(ScalarType::BFloat16);
    pub const FLOAT16: DType = DType::strong(ScalarType::Float16);
    pub const FLOAT32: DType = DType::strong(ScalarType::Float32);
    pub const FLOAT64: DType = DType::strong(ScalarType::Float64);
    pub const COMPLEX32: DType = DType::strong(ScalarType::Complex32);
    pub const COMPLEX64: DType = DType::strong(ScalarType::Complex64);
    pub const COMPLEX128: DType = DType::strong(ScalarType::Complex128);

    pub const fn strong(scalar: ScalarType) -> DType {
        DType {
            scalar,
            weak: false,
        }
    }

    pub const fn weak(scalar: ScalarType) -> DType {
        DType { scalar, weak: true }
    }

    pub const fn scalar(self) -> ScalarType {
        self.scalar
    }

    pub const fn is_weak(self) -> bool {
        self.weak
    }

    pub const fn to_strong(self) -> DType {
        DType::strong(self.scalar)
    }

    pub const fn to_weak(self) -> DType {
        DType::weak(self.scalar)
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self.scalar,
            ScalarType::Uint8
                | ScalarType::Int8
                | ScalarType::Int16
                | ScalarType::Int32
                | ScalarType::Int64
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(
            self.scalar,
            ScalarType::BFloat16 | ScalarType::Float16 | ScalarType::Float32 | ScalarType::Float64
        )
    }

    pub const fn is_complex(self) -> bool {
        matches!(
            self.scalar,
            ScalarType::Complex32 | ScalarType::Complex64 | ScalarType::Complex128
        )
    }

    pub fn shortname(self) -> String {
        let suffix = if self.weak { "_" } else { "" };
        format!("{}{suffix}", self.scalar.shortname())
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scalar.name())?;
        if self.weak {
            f.write_str("_")?;
        }
        Ok(())
    }
}

/// Accepts full names (`float32`) and short names (`f32`); a trailing `_`
/// selects the weak form.
impl FromStr for DType {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        let (base, weak) = match s.strip_suffix('_') {
            Some(base) => (base, true),
            None => (s, false),
        };
        let scalar = ScalarType::ALL
            .into_iter()
            .find(|t| t.name() == base || t.shortname() == base)
            .ok_or_else(|| ProxyError::InvalidDType(s.to_string()))?;
        Ok(DType { scalar, weak })
    }
}

/// The dtype a bare number of `kind` implies.
pub fn numbertype_to_dtype(kind: NumberKind) -> DType {
    match kind {
        NumberKind::Bool => DType::BOOL8,
        NumberKind::Int => DType::weak(ScalarType::Int64),
        NumberKind::Float => DType::weak(ScalarType::Float32),
        NumberKind::Complex => DType::weak(ScalarType::Complex64),
    }
}

/// Either a concrete dtype or a number type standing in for its weak dtype.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DTypeLike {
    DType(DType),
    NumberType(NumberKind),
}

impl DTypeLike {
    pub fn is_numbertype(self) -> bool {
        matches!(self, DTypeLike::NumberType(_))
    }

    pub fn resolve(self) -> DType {
        match self {
            DTypeLike::DType(d) => d,
            DTypeLike::NumberType(kind) => numbertype_to_dtype(kind),
        }
    }
}

pub trait IntoDType {
    fn into_dtype(self) -> Result<DType>;
}

impl IntoDType for DType {
    fn into_dtype(self) -> Result<DType> {
        Ok(self)
    }
}

impl IntoDType for NumberKind {
    fn into_dtype(self) -> Result<DType> {
        Ok(numbertype_to_dtype(self))
    }
}

impl IntoDType for DTypeLike {
    fn into_dtype(self) -> Result<DType> {
        Ok(self.resolve())
    }
}

impl IntoDType for &str {
    fn into_dtype(self) -> Result<DType> {
        self.parse()
    }
}

impl IntoDType for String {
    fn into_dtype(self) -> Result<DType> {
        self.parse()
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn parses_names_and_shortnames() {
        assert_eq!("float32".parse::<DType>(), Ok(DType::FLOAT32));
        assert_eq!("f32".parse::<DType>(), Ok(DType::FLOAT32));
        assert_eq!("i64_".parse::<DType>(), Ok(DType::INT64.to_weak()));
        assert_eq!(
            "float128".parse::<DType>(),
            Err(ProxyError::InvalidDType("float128".into()))
        );
    }

    #[test]
    fn categories_partition_the_scalar_types() {
        assert!(DType::INT32.is_integer() && !DType::INT32.is_float());
        assert!(DType::BFLOAT16.is_float());
        assert!(DType::COMPLEX64.is_complex() && !DType::COMPLEX64.is_float());
        assert!(!DType::BOOL8.is_integer());
        assert_eq!(DType::weak(ScalarType::Int8).scalar(), ScalarType::Int8);
    }

    #[test]
    fn number_types_map_to_weak_dtypes() {
        let d = numbertype_to_dtype(NumberKind::Float);
        assert!(d.is_weak());
        assert_eq!(d.to_strong(), DType::FLOAT32);
        assert_eq!(d.shortname(), "f32_");
        assert_eq!(numbertype_to_dtype(NumberKind::Bool), DType::BOOL8);
        assert!(DTypeLike::NumberType(NumberKind::Int).is_numbertype());
    }
}
