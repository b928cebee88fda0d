use std::fmt;

use derive_more::From;
use itertools::{Itertools, izip};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    num::{NumError, Scalar, ScalarData, ScalarType},
    swizzle::Swizzle,
};

#[derive(Debug, Error)]
pub enum ValueError {
    #[error("value type error: {0} is not convertible to {1}")]
    Type(ElementType, ElementType),
    #[error("value kind error: expect a {0}, got {1}")]
    Kind(&'static str, ElementType),
    #[error("vector lane error: lane {0} out of {1}")]
    Lane(usize, usize),
    #[error("struct field error: no field named {0}")]
    Field(String),
    #[error("swizzle error: {0} does not fit a {1}-lane vector")]
    Swizzle(Swizzle, usize),
    #[error("swizzle write error: {0} targets a lane twice")]
    SwizzleWrite(Swizzle),
    #[error("value length error: expect {0} lanes, got {1}")]
    Length(usize, usize),
    #[error("malformed type: {0}")]
    Malformed(String),
    #[error(transparent)]
    Num(#[from] NumError),
}

/// A fixed-width vector type: a scalar kind plus a lane count in 2..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorType {
    pub scalar: ScalarType,
    pub lanes: usize,
}

impl VectorType {
    pub const fn new(scalar: ScalarType, lanes: usize) -> Self {
        Self { scalar, lanes }
    }
}

impl fmt::Display for VectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.scalar, self.lanes)
    }
}

/// An ordered field list. Order is significant for boundary layout and for
/// positional conversion, not for field lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructType {
    pub fields: Vec<(String, ElementType)>,
}

impl StructType {
    pub fn new<N: Into<String>>(fields: impl IntoIterator<Item = (N, ElementType)>) -> Self {
        let fields = fields
            .into_iter()
            .map(|(name, r#type)| (name.into(), r#type))
            .collect();
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&ElementType> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, r#type)| r#type)
    }
}

impl fmt::Display for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "struct {{ {} }}",
            self.fields
                .iter()
                .format_with(", ", |(name, r#type), f| f(&format_args!(
                    "{name}: {}",
                    r#type
                )))
        )
    }
}

/// The type of one allocation element, or of a struct field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, From, Serialize, Deserialize)]
pub enum ElementType {
    Scalar(ScalarType),
    Vector(VectorType),
    Struct(StructType),
    Array(Box<ElementType>, usize),
}

impl ElementType {
    pub const fn vector(scalar: ScalarType, lanes: usize) -> Self {
        Self::Vector(VectorType::new(scalar, lanes))
    }

    pub fn array(element: ElementType, len: usize) -> Self {
        Self::Array(element.into(), len)
    }

    /// Packed size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Scalar(scalar) => scalar.size(),
            Self::Vector(vector) => vector.scalar.size() * vector.lanes,
            Self::Struct(r#struct) => r#struct.fields.iter().map(|(_, t)| t.size()).sum(),
            Self::Array(element, len) => element.size() * len,
        }
    }

    /// Whether a value of this type converts to `to`: any scalar to any
    /// scalar, vectors lane-wise at equal lane count, structs and arrays
    /// member-wise by position.
    pub fn convertible(&self, to: &Self) -> bool {
        match (self, to) {
            (Self::Scalar(_), Self::Scalar(_)) => true,
            (Self::Vector(x), Self::Vector(y)) => x.lanes == y.lanes,
            (Self::Struct(x), Self::Struct(y)) => {
                x.fields.len() == y.fields.len()
                    && izip!(&x.fields, &y.fields).all(|((_, x), (_, y))| x.convertible(y))
            }
            (Self::Array(x, n), Self::Array(y, m)) => n == m && x.convertible(y),
            _ => false,
        }
    }

    /// Checks descriptor well-formedness: lane counts, non-empty structs with
    /// unique field names, non-zero array lengths.
    pub fn validate(&self) -> Result<(), ValueError> {
        match self {
            Self::Scalar(_) => Ok(()),
            Self::Vector(vector) => match vector.lanes {
                2..=4 => Ok(()),
                lanes => Err(ValueError::Malformed(format!("vector of {lanes} lanes"))),
            },
            Self::Struct(r#struct) => {
                if r#struct.fields.is_empty() {
                    return Err(ValueError::Malformed("empty struct".into()));
                }
                if !r#struct.fields.iter().map(|(name, _)| name).all_unique() {
                    return Err(ValueError::Malformed("duplicate struct field".into()));
                }
                r#struct.fields.iter().try_for_each(|(_, t)| t.validate())
            }
            Self::Array(_, 0) => Err(ValueError::Malformed("zero-length array".into())),
            Self::Array(element, _) => element.validate(),
        }
    }

    /// Like [`validate`](Self::validate), additionally rejecting arrays at
    /// the allocation root; arrays live inside structs only.
    pub fn validate_element(&self) -> Result<(), ValueError> {
        if matches!(self, Self::Array(..)) {
            return Err(ValueError::Malformed("array at allocation root".into()));
        }
        self.validate()
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => scalar.fmt(f),
            Self::Vector(vector) => vector.fmt(f),
            Self::Struct(r#struct) => r#struct.fmt(f),
            Self::Array(element, len) => write!(f, "{element}[{len}]"),
        }
    }
}

/// A fixed-width vector value with uniform lane kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    scalar: ScalarType,
    lanes: Vec<Scalar>,
}

macro_rules! impl_lanewise {
    ($name:ident) => {
        pub fn $name(&self, rhs: &Self) -> Result<Self, ValueError> {
            if self.lane_count() != rhs.lane_count() {
                return Err(ValueError::Length(self.lane_count(), rhs.lane_count()));
            }
            let scalar = self.scalar;
            let lanes = izip!(&self.lanes, &rhs.lanes)
                .map(|(&x, &y)| x.$name(y))
                .try_collect()
                .map_err(ValueError::Num)?;
            Ok(Self { scalar, lanes })
        }
    };
}

impl Vector {
    /// Builds a vector, converting every lane to the given scalar kind.
    pub fn new(scalar: ScalarType, lanes: impl IntoIterator<Item = Scalar>) -> Self {
        let lanes = lanes.into_iter().map(|lane| lane.convert(scalar)).collect();
        Self { scalar, lanes }
    }

    pub fn splat(scalar: ScalarType, lanes: usize, value: Scalar) -> Self {
        Self::new(scalar, std::iter::repeat_n(value, lanes))
    }

    pub fn zero(r#type: VectorType) -> Self {
        Self::splat(r#type.scalar, r#type.lanes, Scalar::zero(r#type.scalar))
    }

    pub fn from_array<T: ScalarData, const N: usize>(values: [T; N]) -> Self {
        Self::new(T::SCALAR_TYPE, values.map(T::to_scalar))
    }

    #[inline]
    pub fn scalar_type(&self) -> ScalarType {
        self.scalar
    }

    #[inline]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    #[inline]
    pub fn vector_type(&self) -> VectorType {
        VectorType::new(self.scalar, self.lanes.len())
    }

    #[inline]
    pub fn lanes(&self) -> &[Scalar] {
        &self.lanes
    }

    pub fn lane(&self, index: usize) -> Result<Scalar, ValueError> {
        match self.lanes.get(index) {
            Some(&lane) => Ok(lane),
            None => Err(ValueError::Lane(index, self.lane_count())),
        }
    }

    /// Writes one lane, converting the value to the vector's scalar kind.
    pub fn set_lane(&mut self, index: usize, value: Scalar) -> Result<(), ValueError> {
        let len = self.lane_count();
        match self.lanes.get_mut(index) {
            Some(lane) => {
                *lane = value.convert(self.scalar);
                Ok(())
            }
            None => Err(ValueError::Lane(index, len)),
        }
    }

    /// Non-mutating swizzle read: selects and reorders lanes into a new
    /// vector, e.g. `wzyx` of a 4-vector yields the reversed vector.
    pub fn swizzle(&self, swizzle: &Swizzle) -> Result<Self, ValueError> {
        if swizzle.max_lane() >= self.lane_count() {
            return Err(ValueError::Swizzle(swizzle.clone(), self.lane_count()));
        }
        let scalar = self.scalar;
        let lanes = swizzle
            .iter()
            .map(|lane| self.lanes[lane.index()])
            .collect();
        Ok(Self { scalar, lanes })
    }

    /// Swizzle on the left of an assignment: writes back only the selected
    /// lanes, in swizzle order. Duplicate target lanes are rejected.
    pub fn swizzle_write(&mut self, swizzle: &Swizzle, value: &Vector) -> Result<(), ValueError> {
        if swizzle.max_lane() >= self.lane_count() {
            return Err(ValueError::Swizzle(swizzle.clone(), self.lane_count()));
        }
        if swizzle.has_duplicates() {
            return Err(ValueError::SwizzleWrite(swizzle.clone()));
        }
        if value.lane_count() != swizzle.len() {
            return Err(ValueError::Length(swizzle.len(), value.lane_count()));
        }
        for (lane, &v) in izip!(swizzle.iter(), &value.lanes) {
            self.lanes[lane.index()] = v.convert(self.scalar);
        }
        Ok(())
    }

    /// Converts lane-by-lane to another vector type of equal lane count.
    pub fn convert(&self, r#type: VectorType) -> Result<Self, ValueError> {
        if self.lane_count() != r#type.lanes {
            return Err(ValueError::Type(
                self.vector_type().into(),
                r#type.into(),
            ));
        }
        Ok(Self::new(r#type.scalar, self.lanes.iter().copied()))
    }

    /// Applies a fallible scalar function to every lane.
    pub fn map(&self, f: impl Fn(Scalar) -> Result<Scalar, NumError>) -> Result<Self, ValueError> {
        let scalar = self.scalar;
        let lanes = self
            .lanes
            .iter()
            .map(|&lane| f(lane))
            .try_collect()
            .map_err(ValueError::Num)?;
        Ok(Self { scalar, lanes })
    }

    impl_lanewise!(try_add);
    impl_lanewise!(try_sub);
    impl_lanewise!(try_mul);
    impl_lanewise!(try_div);
}

/// A struct value with ordered, independently mutable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructValue {
    fields: Vec<(String, Value)>,
}

impl StructValue {
    pub fn new<N: Into<String>>(fields: impl IntoIterator<Item = (N, Value)>) -> Self {
        let fields = fields
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        Self { fields }
    }

    pub fn zero(r#type: &StructType) -> Self {
        let fields = r#type
            .fields
            .iter()
            .map(|(name, r#type)| (name.clone(), Value::zero(r#type)))
            .collect();
        Self { fields }
    }

    pub fn struct_type(&self) -> StructType {
        StructType::new(
            self.fields
                .iter()
                .map(|(name, value)| (name.clone(), value.element_type())),
        )
    }

    #[inline]
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Result<&Value, ValueError> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
            .ok_or_else(|| ValueError::Field(name.into()))
    }

    /// Replaces one field, converting the value to the field's current type.
    /// Sibling fields are untouched.
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<(), ValueError> {
        let slot = self
            .fields
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
            .ok_or_else(|| ValueError::Field(name.into()))?;
        *slot = value.convert(&slot.element_type())?;
        Ok(())
    }
}

/// A runtime element value: scalar, vector, struct, or fixed-size array
/// (arrays appear as struct fields only).
#[derive(Debug, Clone, PartialEq, From, Serialize, Deserialize)]
pub enum Value {
    Scalar(Scalar),
    Vector(Vector),
    Struct(StructValue),
    Array(Vec<Value>),
}

impl Value {
    pub fn zero(r#type: &ElementType) -> Self {
        match r#type {
            ElementType::Scalar(scalar) => Self::Scalar(Scalar::zero(*scalar)),
            ElementType::Vector(vector) => Self::Vector(Vector::zero(*vector)),
            ElementType::Struct(r#struct) => Self::Struct(StructValue::zero(r#struct)),
            ElementType::Array(element, len) => {
                Self::Array(vec![Self::zero(element); *len])
            }
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Scalar(scalar) => ElementType::Scalar(scalar.scalar_type()),
            Self::Vector(vector) => ElementType::Vector(vector.vector_type()),
            Self::Struct(r#struct) => ElementType::Struct(r#struct.struct_type()),
            Self::Array(values) => {
                let element = values
                    .first()
                    .map(Self::element_type)
                    .unwrap_or(ElementType::Scalar(ScalarType::U8));
                ElementType::Array(element.into(), values.len())
            }
        }
    }

    /// Converts the value to another element type under the same rules as
    /// [`ElementType::convertible`]. Struct fields convert by position and
    /// take the target's field names.
    pub fn convert(&self, to: &ElementType) -> Result<Self, ValueError> {
        match (self, to) {
            (Self::Scalar(v), ElementType::Scalar(t)) => Ok(Self::Scalar(v.convert(*t))),
            (Self::Vector(v), ElementType::Vector(t)) => Ok(Self::Vector(v.convert(*t)?)),
            (Self::Struct(v), ElementType::Struct(t)) => {
                if v.fields.len() != t.fields.len() {
                    return Err(ValueError::Type(self.element_type(), to.clone()));
                }
                let fields = izip!(&v.fields, &t.fields)
                    .map(|((_, value), (name, r#type))| -> Result<_, ValueError> {
                        Ok((name.clone(), value.convert(r#type)?))
                    })
                    .try_collect()?;
                Ok(Self::Struct(StructValue { fields }))
            }
            (Self::Array(v), ElementType::Array(t, n)) => {
                if v.len() != *n {
                    return Err(ValueError::Type(self.element_type(), to.clone()));
                }
                let values = v.iter().map(|value| value.convert(t)).try_collect()?;
                Ok(Self::Array(values))
            }
            _ => Err(ValueError::Type(self.element_type(), to.clone())),
        }
    }

    pub fn try_into_scalar(self) -> Result<Scalar, ValueError> {
        match self {
            Self::Scalar(scalar) => Ok(scalar),
            value => Err(ValueError::Kind("scalar", value.element_type())),
        }
    }

    pub fn try_into_vector(self) -> Result<Vector, ValueError> {
        match self {
            Self::Vector(vector) => Ok(vector),
            value => Err(ValueError::Kind("vector", value.element_type())),
        }
    }

    pub fn try_into_struct(self) -> Result<StructValue, ValueError> {
        match self {
            Self::Struct(r#struct) => Ok(r#struct),
            value => Err(ValueError::Kind("struct", value.element_type())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{ElementType, StructType, StructValue, Value, Vector, VectorType};
    use crate::{
        num::{Scalar, ScalarType},
        swizzle::Swizzle,
    };

    #[test]
    fn test_swizzle_read_write() -> Result<(), Box<dyn Error>> {
        let v = Vector::from_array([10u8, 20, 30, 40]);
        let wzyx: Swizzle = "wzyx".parse()?;

        let reversed = v.swizzle(&wzyx)?;
        assert_eq!(reversed, Vector::from_array([40u8, 30, 20, 10]));

        // A full-lane swizzle applied twice restores the original.
        assert_eq!(reversed.swizzle(&wzyx)?, v);

        // Writing through a swizzle touches only the selected lanes.
        let mut v = Vector::from_array([1i32, 2, 3, 4]);
        v.swizzle_write(&"zx".parse()?, &Vector::from_array([30i32, 10]))?;
        assert_eq!(v, Vector::from_array([10i32, 2, 30, 4]));

        assert!(v.swizzle_write(&"xx".parse()?, &Vector::from_array([0i32, 0])).is_err());
        assert!(Vector::from_array([1u8, 2]).swizzle(&wzyx).is_err());
        Ok(())
    }

    #[test]
    fn test_struct_fields() -> Result<(), Box<dyn Error>> {
        let mut value = StructValue::new([
            ("i", Value::Scalar(Scalar::I32(3))),
            ("f", Value::Scalar(Scalar::F32(0.5))),
        ]);
        value.set_field("i", Scalar::I32(7).into())?;
        assert_eq!(*value.field("i")?, Value::Scalar(Scalar::I32(7)));
        // Sibling fields keep their previously computed values.
        assert_eq!(*value.field("f")?, Value::Scalar(Scalar::F32(0.5)));
        // The field's declared kind survives a write of another kind.
        value.set_field("f", Scalar::I32(2).into())?;
        assert_eq!(*value.field("f")?, Value::Scalar(Scalar::F32(2.0)));
        assert!(value.field("missing").is_err());
        Ok(())
    }

    #[test]
    fn test_convert() -> Result<(), Box<dyn Error>> {
        let v = Value::Vector(Vector::from_array([1.5f64, 2.5, -3.5]));
        let out = v.convert(&ElementType::vector(ScalarType::I32, 3))?;
        assert_eq!(out, Value::Vector(Vector::from_array([1i32, 2, -3])));
        assert!(v.convert(&ElementType::vector(ScalarType::I32, 4)).is_err());

        let from = StructValue::new([("a", Value::Scalar(Scalar::U16(300)))]);
        let to = StructType::new([("b", ElementType::Scalar(ScalarType::F32))]);
        let out = Value::Struct(from).convert(&ElementType::Struct(to))?;
        assert_eq!(
            out.try_into_struct()?.field("b")?,
            &Value::Scalar(Scalar::F32(300.0))
        );
        Ok(())
    }

    #[test]
    fn test_validate() {
        assert!(ElementType::vector(ScalarType::F32, 4).validate().is_ok());
        assert!(ElementType::vector(ScalarType::F32, 5).validate().is_err());
        assert!(ElementType::Struct(StructType::new::<String>([])).validate().is_err());
        assert!(
            ElementType::Struct(StructType::new([
                ("a", ElementType::Scalar(ScalarType::I32)),
                ("a", ElementType::Scalar(ScalarType::I32)),
            ]))
            .validate()
            .is_err()
        );
        let array = ElementType::array(ElementType::Scalar(ScalarType::F32), 2);
        assert!(array.validate().is_ok());
        assert!(array.validate_element().is_err());
        assert!(
            ElementType::Struct(StructType::new([("f", array)]))
                .validate_element()
                .is_ok()
        );
    }

    #[test]
    fn test_type_serde() -> Result<(), Box<dyn Error>> {
        let r#type = ElementType::Struct(StructType::new([
            (
                "s",
                ElementType::Struct(StructType::new([
                    ("i", ElementType::Scalar(ScalarType::I32)),
                    ("j", ElementType::Scalar(ScalarType::U32)),
                ])),
            ),
            ("c", ElementType::vector(ScalarType::U8, 4)),
            (
                "f",
                ElementType::array(ElementType::Scalar(ScalarType::F32), 2),
            ),
        ]));
        let json = serde_json::to_string(&r#type)?;
        assert_eq!(serde_json::from_str::<ElementType>(&json)?, r#type);
        assert_eq!(r#type.size(), 8 + 4 + 8);
        Ok(())
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ElementType::Vector(VectorType::new(ScalarType::U8, 4)).to_string(),
            "uchar4"
        );
        let r#type = ElementType::Struct(StructType::new([
            ("i", ElementType::Scalar(ScalarType::I32)),
            (
                "f",
                ElementType::array(ElementType::Scalar(ScalarType::F32), 2),
            ),
        ]));
        assert_eq!(r#type.to_string(), "struct { i: int, f: float[2] }");
    }
}
