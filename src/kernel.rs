use std::{fmt, sync::Arc};

use derive_more::From;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    alloc::{AllocError, AllocationHandle},
    engine::Engine,
    global::{GlobalError, GlobalScope},
    num::{NumError, Scalar},
    swizzle::SwizzleError,
    value::{ElementType, Value, ValueError},
};

/// An error raised inside a kernel or routine body, e.g. a failed
/// precondition in a helper function.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct KernelError(String);

impl KernelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

macro_rules! impl_kernel_error_from {
    ($($t:ty),+ $(,)?) => {
        $(impl From<$t> for KernelError {
            fn from(value: $t) -> Self {
                Self(value.to_string())
            }
        })+
    };
}

impl_kernel_error_from!(NumError, SwizzleError, ValueError, AllocError, GlobalError);

pub type KernelFn =
    Arc<dyn Fn(&GlobalScope, &[Value]) -> Result<Value, KernelError> + Send + Sync>;

/// A per-element mapping function: up to one buffer input, an optional index
/// coordinate, one output. The body sees its declared inputs plus the global
/// scope and returns the output element; it never touches other indices.
#[derive(Clone)]
pub struct Kernel {
    name: String,
    input: Option<ElementType>,
    coord: bool,
    output: ElementType,
    body: KernelFn,
}

impl Kernel {
    pub fn new(
        name: impl Into<String>,
        output: ElementType,
        body: impl Fn(&GlobalScope, &[Value]) -> Result<Value, KernelError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            input: None,
            coord: false,
            output,
            body: Arc::new(body),
        }
    }

    /// Declares the buffer input element type.
    pub fn with_input(mut self, input: ElementType) -> Self {
        self.input = Some(input);
        self
    }

    /// Declares a trailing `uint32` coordinate argument carrying the element
    /// index, supplied by the dispatcher.
    pub fn with_coord(mut self) -> Self {
        self.coord = true;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn input(&self) -> Option<&ElementType> {
        self.input.as_ref()
    }

    #[inline]
    pub fn coord(&self) -> bool {
        self.coord
    }

    #[inline]
    pub fn output(&self) -> &ElementType {
        &self.output
    }

    pub fn validate(&self) -> Result<(), ValueError> {
        if let Some(input) = &self.input {
            input.validate_element()?;
        }
        self.output.validate_element()
    }

    #[inline]
    pub(crate) fn run(&self, globals: &GlobalScope, args: &[Value]) -> Result<Value, KernelError> {
        (self.body)(globals, args)
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("coord", &self.coord)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// The declared type of one invokable routine parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamType {
    Value(ElementType),
    Allocation,
}

/// An argument the driver passes to [`Engine::invoke`]: a pass-by-value
/// scalar or vector, or an allocation handle (the `rs_allocation` pattern).
#[derive(Debug, Clone, From)]
pub enum InvokeArg {
    Value(Value),
    Allocation(AllocationHandle),
}

impl From<Scalar> for InvokeArg {
    #[inline]
    fn from(value: Scalar) -> Self {
        Self::Value(value.into())
    }
}

impl InvokeArg {
    pub fn try_into_value(self) -> Result<Value, KernelError> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Allocation(_) => Err(KernelError::new("expect a value, got an allocation")),
        }
    }

    pub fn try_into_allocation(self) -> Result<AllocationHandle, KernelError> {
        match self {
            Self::Allocation(handle) => Ok(handle),
            Self::Value(_) => Err(KernelError::new("expect an allocation, got a value")),
        }
    }
}

pub type InvokableFn =
    Arc<dyn Fn(&Engine, &[InvokeArg]) -> Result<Option<Value>, KernelError> + Send + Sync>;

/// An ordinary driver-callable routine. Runs synchronously on the calling
/// context; the body may launch kernels and read or write globals, and may
/// return a value.
#[derive(Clone)]
pub struct Invokable {
    name: String,
    params: Vec<ParamType>,
    body: InvokableFn,
}

impl Invokable {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&Engine, &[InvokeArg]) -> Result<Option<Value>, KernelError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            body: Arc::new(body),
        }
    }

    pub fn with_param(mut self, param: ParamType) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_value_param(self, r#type: ElementType) -> Self {
        self.with_param(ParamType::Value(r#type))
    }

    pub fn with_allocation_param(self) -> Self {
        self.with_param(ParamType::Allocation)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    pub fn validate(&self) -> Result<(), ValueError> {
        self.params.iter().try_for_each(|param| match param {
            ParamType::Value(r#type) => r#type.validate_element(),
            ParamType::Allocation => Ok(()),
        })
    }

    #[inline]
    pub(crate) fn run(
        &self,
        engine: &Engine,
        args: &[InvokeArg],
    ) -> Result<Option<Value>, KernelError> {
        (self.body)(engine, args)
    }
}

impl fmt::Debug for Invokable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invokable")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{Kernel, KernelError};
    use crate::{
        num::{NumError, Scalar, ScalarType},
        value::ElementType,
    };

    #[test]
    fn test_descriptor_validation() {
        let kernel = Kernel::new(
            "copy",
            ElementType::Scalar(ScalarType::I32),
            |_, args| Ok(args[0].clone()),
        )
        .with_input(ElementType::Scalar(ScalarType::I32));
        assert!(kernel.validate().is_ok());
        assert_eq!(kernel.name(), "copy");
        assert!(!kernel.coord());

        let kernel = Kernel::new("bad", ElementType::vector(ScalarType::F32, 5), |_, _| {
            Ok(Scalar::F32(0.0).into())
        });
        assert!(kernel.validate().is_err());
    }

    #[test]
    fn test_kernel_error_from() {
        let err: KernelError = NumError::DivideByZero.into();
        assert_eq!(err.to_string(), "integer division by zero");
    }
}
