use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    num::{ScalarData, ScalarType},
    value::{ElementType, Value, ValueError},
};

#[derive(Debug, Error)]
pub enum AllocError {
    #[error("allocation length error: declared {0} elements, data has {1}")]
    InvalidLength(usize, usize),
    #[error("allocation index error: index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("allocation byte error: {0} bytes do not pack {1} elements")]
    Bytes(usize, ScalarType),
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Marker for allocation handles; the engine hands out `uid::Id<AllocationId>`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllocationId;

pub type AllocationHandle = uid::Id<AllocationId>;

/// A typed, fixed-length, index-addressable buffer of elements; the unit of
/// kernel input and output. Length is fixed at creation, elements are mutable
/// in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    r#type: ElementType,
    data: Vec<Value>,
}

impl Allocation {
    /// Creates a zero-filled allocation. Zero length is legal; a launch over
    /// it performs no work.
    pub fn new(r#type: ElementType, len: usize) -> Self {
        let data = vec![Value::zero(&r#type); len];
        Self { r#type, data }
    }

    /// Creates an allocation from initial values, converting each to the
    /// element type.
    pub fn with_data(
        r#type: ElementType,
        data: impl IntoIterator<Item = Value>,
    ) -> Result<Self, AllocError> {
        let data: Vec<Value> = data
            .into_iter()
            .map(|value| value.convert(&r#type))
            .try_collect()?;
        Ok(Self { r#type, data })
    }

    /// Creates a scalar allocation from a host slice.
    pub fn from_slice<T: ScalarData>(data: &[T]) -> Self {
        let r#type = ElementType::Scalar(T::SCALAR_TYPE);
        let data = data
            .iter()
            .map(|&value| Value::Scalar(value.to_scalar()))
            .collect();
        Self { r#type, data }
    }

    /// Creates a scalar allocation from raw host bytes in native byte order.
    pub fn from_bytes(r#type: ScalarType, bytes: &[u8]) -> Result<Self, AllocError> {
        macro_rules! cast {
            ($t:ty) => {
                bytemuck::try_cast_slice::<_, $t>(bytes)
                    .map(Self::from_slice)
                    .map_err(|_| AllocError::Bytes(bytes.len(), r#type))
            };
        }
        match r#type {
            ScalarType::I8 => cast!(i8),
            ScalarType::I16 => cast!(i16),
            ScalarType::I32 => cast!(i32),
            ScalarType::I64 => cast!(i64),
            ScalarType::U8 => cast!(u8),
            ScalarType::U16 => cast!(u16),
            ScalarType::U32 => cast!(u32),
            ScalarType::U64 => cast!(u64),
            ScalarType::F32 => cast!(f32),
            ScalarType::F64 => cast!(f64),
            ScalarType::Bool => Err(AllocError::Bytes(bytes.len(), r#type)),
        }
    }

    /// Reads the allocation back as a host vector, converting each element.
    /// Fails on non-scalar element types.
    pub fn to_vec<T: ScalarData>(&self) -> Result<Vec<T>, AllocError> {
        let r#type = ElementType::Scalar(T::SCALAR_TYPE);
        self.data
            .iter()
            .map(|value| {
                let scalar = value.convert(&r#type)?.try_into_scalar()?;
                Ok(T::from_scalar(scalar))
            })
            .try_collect()
    }

    #[inline]
    pub fn element_type(&self) -> &ElementType {
        &self.r#type
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.data
    }

    pub fn get(&self, index: usize) -> Result<Value, AllocError> {
        match self.data.get(index) {
            Some(value) => Ok(value.clone()),
            None => Err(AllocError::IndexOutOfRange {
                index,
                len: self.data.len(),
            }),
        }
    }

    /// Writes one element, converting the value to the element type. Mutates
    /// only this allocation.
    pub fn set(&mut self, index: usize, value: Value) -> Result<(), AllocError> {
        let len = self.data.len();
        let converted = value.convert(&self.r#type)?;
        match self.data.get_mut(index) {
            Some(slot) => {
                *slot = converted;
                Ok(())
            }
            None => Err(AllocError::IndexOutOfRange { index, len }),
        }
    }
}
