use bytemuck::{Pod, Zeroable};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NumError {
    #[error("scalar type error: {0} mismatches {1}")]
    Type(ScalarType, ScalarType),
    #[error("integer division by zero")]
    DivideByZero,
    #[error("operation not supported for {0}")]
    Unsupported(ScalarType),
}

/// The kind of a scalar value. Display renders the C-side type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ScalarType {
    #[display("char")]
    I8,
    #[display("short")]
    I16,
    #[display("int")]
    I32,
    #[display("long")]
    I64,
    #[display("uchar")]
    U8,
    #[display("ushort")]
    U16,
    #[display("uint")]
    U32,
    #[display("ulong")]
    U64,
    #[display("float")]
    F32,
    #[display("double")]
    F64,
    #[display("bool")]
    Bool,
}

impl ScalarType {
    /// Returns the size of the scalar in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 | Self::Bool => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::F32 | Self::F64 | Self::Bool)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::F32 | Self::F64
        )
    }
}

/// A runtime scalar value, one variant per [`ScalarType`].
#[derive(Debug, Clone, Copy, PartialEq, Display, Serialize, Deserialize)]
pub enum Scalar {
    #[display("{_0}")]
    I8(i8),
    #[display("{_0}")]
    I16(i16),
    #[display("{_0}")]
    I32(i32),
    #[display("{_0}")]
    I64(i64),
    #[display("{_0}")]
    U8(u8),
    #[display("{_0}")]
    U16(u16),
    #[display("{_0}")]
    U32(u32),
    #[display("{_0}")]
    U64(u64),
    #[display("{_0}")]
    F32(f32),
    #[display("{_0}")]
    F64(f64),
    #[display("{_0}")]
    Bool(bool),
}

macro_rules! impl_arith {
    ($name:ident, $int:ident, $op:tt) => {
        pub fn $name(self, rhs: Self) -> Result<Self, NumError> {
            use Scalar::*;
            match (self, rhs) {
                (I8(x), I8(y)) => Ok(I8(x.$int(y))),
                (I16(x), I16(y)) => Ok(I16(x.$int(y))),
                (I32(x), I32(y)) => Ok(I32(x.$int(y))),
                (I64(x), I64(y)) => Ok(I64(x.$int(y))),
                (U8(x), U8(y)) => Ok(U8(x.$int(y))),
                (U16(x), U16(y)) => Ok(U16(x.$int(y))),
                (U32(x), U32(y)) => Ok(U32(x.$int(y))),
                (U64(x), U64(y)) => Ok(U64(x.$int(y))),
                (F32(x), F32(y)) => Ok(F32(x $op y)),
                (F64(x), F64(y)) => Ok(F64(x $op y)),
                (Bool(_), Bool(_)) => Err(NumError::Unsupported(ScalarType::Bool)),
                (x, y) => Err(NumError::Type(x.scalar_type(), y.scalar_type())),
            }
        }
    };
}

macro_rules! quot {
    ($int:ident, $v:ident, $x:ident, $y:ident) => {
        match $y {
            0 => Err(NumError::DivideByZero),
            y => Ok($v($x.$int(y))),
        }
    };
}

macro_rules! impl_arith_div {
    ($name:ident, $int:ident, $op:tt) => {
        pub fn $name(self, rhs: Self) -> Result<Self, NumError> {
            use Scalar::*;
            match (self, rhs) {
                (I8(x), I8(y)) => quot!($int, I8, x, y),
                (I16(x), I16(y)) => quot!($int, I16, x, y),
                (I32(x), I32(y)) => quot!($int, I32, x, y),
                (I64(x), I64(y)) => quot!($int, I64, x, y),
                (U8(x), U8(y)) => quot!($int, U8, x, y),
                (U16(x), U16(y)) => quot!($int, U16, x, y),
                (U32(x), U32(y)) => quot!($int, U32, x, y),
                (U64(x), U64(y)) => quot!($int, U64, x, y),
                (F32(x), F32(y)) => Ok(F32(x $op y)),
                (F64(x), F64(y)) => Ok(F64(x $op y)),
                (Bool(_), Bool(_)) => Err(NumError::Unsupported(ScalarType::Bool)),
                (x, y) => Err(NumError::Type(x.scalar_type(), y.scalar_type())),
            }
        }
    };
}

macro_rules! impl_bit {
    ($name:ident, $op:tt) => {
        pub fn $name(self, rhs: Self) -> Result<Self, NumError> {
            use Scalar::*;
            match (self, rhs) {
                (I8(x), I8(y)) => Ok(I8(x $op y)),
                (I16(x), I16(y)) => Ok(I16(x $op y)),
                (I32(x), I32(y)) => Ok(I32(x $op y)),
                (I64(x), I64(y)) => Ok(I64(x $op y)),
                (U8(x), U8(y)) => Ok(U8(x $op y)),
                (U16(x), U16(y)) => Ok(U16(x $op y)),
                (U32(x), U32(y)) => Ok(U32(x $op y)),
                (U64(x), U64(y)) => Ok(U64(x $op y)),
                (Bool(x), Bool(y)) => Ok(Bool(x $op y)),
                (x @ (F32(_) | F64(_)), F32(_) | F64(_)) => {
                    Err(NumError::Unsupported(x.scalar_type()))
                }
                (x, y) => Err(NumError::Type(x.scalar_type(), y.scalar_type())),
            }
        }
    };
}

impl Scalar {
    pub const fn scalar_type(&self) -> ScalarType {
        match self {
            Self::I8(_) => ScalarType::I8,
            Self::I16(_) => ScalarType::I16,
            Self::I32(_) => ScalarType::I32,
            Self::I64(_) => ScalarType::I64,
            Self::U8(_) => ScalarType::U8,
            Self::U16(_) => ScalarType::U16,
            Self::U32(_) => ScalarType::U32,
            Self::U64(_) => ScalarType::U64,
            Self::F32(_) => ScalarType::F32,
            Self::F64(_) => ScalarType::F64,
            Self::Bool(_) => ScalarType::Bool,
        }
    }

    pub const fn zero(r#type: ScalarType) -> Self {
        match r#type {
            ScalarType::I8 => Self::I8(0),
            ScalarType::I16 => Self::I16(0),
            ScalarType::I32 => Self::I32(0),
            ScalarType::I64 => Self::I64(0),
            ScalarType::U8 => Self::U8(0),
            ScalarType::U16 => Self::U16(0),
            ScalarType::U32 => Self::U32(0),
            ScalarType::U64 => Self::U64(0),
            ScalarType::F32 => Self::F32(0.0),
            ScalarType::F64 => Self::F64(0.0),
            ScalarType::Bool => Self::Bool(false),
        }
    }

    pub fn is_nonzero(self) -> bool {
        match self {
            Self::I8(v) => v != 0,
            Self::I16(v) => v != 0,
            Self::I32(v) => v != 0,
            Self::I64(v) => v != 0,
            Self::U8(v) => v != 0,
            Self::U16(v) => v != 0,
            Self::U32(v) => v != 0,
            Self::U64(v) => v != 0,
            Self::F32(v) => v != 0.0,
            Self::F64(v) => v != 0.0,
            Self::Bool(v) => v,
        }
    }

    /// Converts the scalar to another kind following `as`-cast semantics:
    /// integer narrowing wraps, float to integer truncates toward zero,
    /// numeric to `bool` tests against zero.
    pub fn convert(self, r#type: ScalarType) -> Self {
        use Scalar::*;
        macro_rules! cast {
            ($t:ty) => {
                match self {
                    I8(v) => v as $t,
                    I16(v) => v as $t,
                    I32(v) => v as $t,
                    I64(v) => v as $t,
                    U8(v) => v as $t,
                    U16(v) => v as $t,
                    U32(v) => v as $t,
                    U64(v) => v as $t,
                    F32(v) => v as $t,
                    F64(v) => v as $t,
                    Bool(v) => v as u8 as $t,
                }
            };
        }
        match r#type {
            ScalarType::I8 => I8(cast!(i8)),
            ScalarType::I16 => I16(cast!(i16)),
            ScalarType::I32 => I32(cast!(i32)),
            ScalarType::I64 => I64(cast!(i64)),
            ScalarType::U8 => U8(cast!(u8)),
            ScalarType::U16 => U16(cast!(u16)),
            ScalarType::U32 => U32(cast!(u32)),
            ScalarType::U64 => U64(cast!(u64)),
            ScalarType::F32 => F32(cast!(f32)),
            ScalarType::F64 => F64(cast!(f64)),
            ScalarType::Bool => Bool(self.is_nonzero()),
        }
    }

    impl_arith!(try_add, wrapping_add, +);
    impl_arith!(try_sub, wrapping_sub, -);
    impl_arith!(try_mul, wrapping_mul, *);
    impl_arith_div!(try_div, wrapping_div, /);
    impl_arith_div!(try_rem, wrapping_rem, %);
    impl_bit!(try_and, &);
    impl_bit!(try_or, |);
    impl_bit!(try_xor, ^);

    pub fn try_neg(self) -> Result<Self, NumError> {
        use Scalar::*;
        match self {
            I8(v) => Ok(I8(v.wrapping_neg())),
            I16(v) => Ok(I16(v.wrapping_neg())),
            I32(v) => Ok(I32(v.wrapping_neg())),
            I64(v) => Ok(I64(v.wrapping_neg())),
            U8(v) => Ok(U8(v.wrapping_neg())),
            U16(v) => Ok(U16(v.wrapping_neg())),
            U32(v) => Ok(U32(v.wrapping_neg())),
            U64(v) => Ok(U64(v.wrapping_neg())),
            F32(v) => Ok(F32(-v)),
            F64(v) => Ok(F64(-v)),
            Bool(_) => Err(NumError::Unsupported(ScalarType::Bool)),
        }
    }

    pub fn try_not(self) -> Result<Self, NumError> {
        use Scalar::*;
        match self {
            I8(v) => Ok(I8(!v)),
            I16(v) => Ok(I16(!v)),
            I32(v) => Ok(I32(!v)),
            I64(v) => Ok(I64(!v)),
            U8(v) => Ok(U8(!v)),
            U16(v) => Ok(U16(!v)),
            U32(v) => Ok(U32(!v)),
            U64(v) => Ok(U64(!v)),
            Bool(v) => Ok(Bool(!v)),
            v @ (F32(_) | F64(_)) => Err(NumError::Unsupported(v.scalar_type())),
        }
    }
}

/// Scalars of differing kinds are unordered; so are NaN comparisons.
impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        use Scalar::*;
        match (self, other) {
            (I8(x), I8(y)) => x.partial_cmp(y),
            (I16(x), I16(y)) => x.partial_cmp(y),
            (I32(x), I32(y)) => x.partial_cmp(y),
            (I64(x), I64(y)) => x.partial_cmp(y),
            (U8(x), U8(y)) => x.partial_cmp(y),
            (U16(x), U16(y)) => x.partial_cmp(y),
            (U32(x), U32(y)) => x.partial_cmp(y),
            (U64(x), U64(y)) => x.partial_cmp(y),
            (F32(x), F32(y)) => x.partial_cmp(y),
            (F64(x), F64(y)) => x.partial_cmp(y),
            (Bool(x), Bool(y)) => x.partial_cmp(y),
            _ => None,
        }
    }
}

/// A host-side scalar that can cross the allocation boundary as plain bytes.
pub trait ScalarData: Sized + Zeroable + Pod + Send + Sync {
    const SCALAR_TYPE: ScalarType;

    fn to_scalar(self) -> Scalar;
    fn from_scalar(scalar: Scalar) -> Self;
}

macro_rules! impl_scalar_data {
    ($t:ty, $v:ident) => {
        impl ScalarData for $t {
            const SCALAR_TYPE: ScalarType = ScalarType::$v;

            #[inline]
            fn to_scalar(self) -> Scalar {
                Scalar::$v(self)
            }

            #[inline]
            fn from_scalar(scalar: Scalar) -> Self {
                match scalar.convert(Self::SCALAR_TYPE) {
                    Scalar::$v(value) => value,
                    _ => unreachable!(),
                }
            }
        }

        impl From<$t> for Scalar {
            #[inline]
            fn from(value: $t) -> Self {
                Self::$v(value)
            }
        }
    };
}

impl_scalar_data!(i8, I8);
impl_scalar_data!(i16, I16);
impl_scalar_data!(i32, I32);
impl_scalar_data!(i64, I64);
impl_scalar_data!(u8, U8);
impl_scalar_data!(u16, U16);
impl_scalar_data!(u32, U32);
impl_scalar_data!(u64, U64);
impl_scalar_data!(f32, F32);
impl_scalar_data!(f64, F64);

impl From<bool> for Scalar {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
